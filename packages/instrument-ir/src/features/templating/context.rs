//! Binding compiled templates against call contexts
//!
//! Binding turns a compiled plan plus one concrete call site into emitted
//! instructions: each placeholder becomes a positional `%s` argument of the
//! builder's `format` idiom.

use crate::errors::{InstrumentError, Result};
use crate::features::building::InstructionSeq;
use crate::shared::models::Value;

use super::compiler::{CompiledTemplate, FormatKind, PlaceholderSource};

/// The values a template binds against at one call site or method entry
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Enclosing method's fully qualified signature
    pub method_signature: String,
    /// Call receiver, or the enclosing method's self-reference for
    /// entry-logging directives
    pub receiver: Option<Value>,
    /// Assignment target of the instrumented call, if any
    pub result: Option<Value>,
    /// Actual call arguments (or parameters, for entry logging)
    pub args: Vec<Value>,
}

impl CompiledTemplate {
    /// Emit the instructions producing this template's message text for one
    /// call context. Returns the message value (a string local, or constant
    /// text when the template has no placeholders).
    pub fn bind(&self, seq: &mut InstructionSeq<'_>, context: &CallContext) -> Result<Value> {
        if self.segments.is_empty() {
            return Ok(Value::str(self.trailer.clone()));
        }

        let mut format_string = String::new();
        let mut format_args = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            push_literal(&mut format_string, &segment.literal);
            let raw = match segment.source {
                PlaceholderSource::Method => Some(Value::str(context.method_signature.clone())),
                PlaceholderSource::This => Some(context.receiver.clone().ok_or_else(|| {
                    InstrumentError::config(
                        "template references {this} but the call has no receiver",
                    )
                })?),
                PlaceholderSource::Result => context.result.clone(),
                PlaceholderSource::Arg(index) => {
                    Some(context.args.get(index).cloned().ok_or_else(|| {
                        InstrumentError::config(format!(
                            "template references argument {} but the call has {}",
                            index,
                            context.args.len()
                        ))
                    })?)
                }
                PlaceholderSource::Args => Some(seq.concat_args(&context.args)?),
            };
            let bound = match (segment.format, raw) {
                // Absent reference yields the zero sentinel
                (FormatKind::Identity, None) => Value::Int(0),
                (FormatKind::Identity, Some(value)) => seq.identity(&value)?,
                // Absent result stringifies as "null"
                (FormatKind::Stringify, None) => Value::Null,
                (FormatKind::Stringify, Some(value)) => value,
            };
            format_string.push_str("%s");
            format_args.push(bound);
        }
        push_literal(&mut format_string, &self.trailer);

        let message = seq.format(&format_string, format_args)?;
        Ok(Value::Local(message))
    }
}

/// Literal text must survive `String.format` untouched.
fn push_literal(format_string: &mut String, literal: &str) {
    format_string.push_str(&literal.replace('%', "%%"));
}
