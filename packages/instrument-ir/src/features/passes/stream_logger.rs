//! Stream-wrapper logger
//!
//! For a call matching a method-table template whose result is declared as
//! one of the two recognized stream endpoint types, constructs the bundled
//! logging decorator around the result immediately after the call and
//! reassigns the result variable, so all later uses pass through it.

use rustc_hash::FxHashMap;

use crate::config::Config;
use crate::errors::{InstrumentError, Result};
use crate::features::building::{inspect, InstructionSeq};
use crate::features::injection::{inject_class, LOGGING_INPUT_STREAM, LOGGING_OUTPUT_STREAM};
use crate::features::matching::{Filter, MethodDirectives};
use crate::features::templating::{CallContext, CompiledTemplate};
use crate::shared::models::{Body, Program, Value};

use super::call_logger::compile_payloads;
use super::TransformPass;

const RESERVED: &[&str] = &["enabled", "tag", "filter"];

pub struct StreamLogger {
    filter: Option<Filter>,
    tag: String,
    directives: MethodDirectives,
    templates: FxHashMap<String, CompiledTemplate>,
}

impl StreamLogger {
    /// Injects both decorator classes into the program at construction.
    pub fn from_config(config: &Config, program: &mut Program) -> Result<Self> {
        let filter = config
            .get("StreamLogger.filter")
            .map(Filter::parse)
            .transpose()?;
        let tag = config.get_or("StreamLogger.tag", "StreamLogger").to_string();
        let directives = MethodDirectives::from_config(config, "StreamLogger.", RESERVED)?;
        let templates = compile_payloads(&directives)?;

        inject_class(program, LOGGING_INPUT_STREAM)?;
        inject_class(program, LOGGING_OUTPUT_STREAM)?;

        Ok(StreamLogger {
            filter,
            tag,
            directives,
            templates,
        })
    }
}

/// Decorator class for a stream endpoint type name, if recognized.
pub(crate) fn decorator_for(type_name: &str) -> Option<&'static str> {
    match type_name {
        "java.io.InputStream" => Some(LOGGING_INPUT_STREAM),
        "java.io.OutputStream" => Some(LOGGING_OUTPUT_STREAM),
        _ => None,
    }
}

impl TransformPass for StreamLogger {
    fn name(&self) -> &'static str {
        "StreamLogger"
    }

    fn process_body(&self, program: &Program, body: &mut Body) -> Result<()> {
        if let Some(filter) = &self.filter {
            if !filter.matches_body(body) {
                return Ok(());
            }
        }
        let sites: Vec<_> = body
            .instructions()
            .filter_map(|(id, instruction)| {
                let target = inspect::assignment_target(instruction)?;
                let invoke = inspect::invocation(instruction)?;
                let payload = self.directives.resolve(program, &invoke.callee)?;
                Some((id, payload, invoke.clone(), target))
            })
            .collect();

        for (anchor, payload, invoke, target) in sites {
            let result_type = body
                .local_type(target)
                .map(|ty| ty.name())
                .unwrap_or_default();
            let Some(decorator) = decorator_for(&result_type) else {
                return Err(InstrumentError::config(format!(
                    "call to {} in {} produced a result that is neither an input nor an output stream: {}",
                    invoke.callee.signature(),
                    body.method.signature(),
                    result_type
                )));
            };

            let template = &self.templates[payload];
            let context = CallContext {
                method_signature: body.method.signature(),
                receiver: invoke.receiver.clone(),
                result: Some(Value::Local(target)),
                args: invoke.args.clone(),
            };
            let mut seq = InstructionSeq::new(program, body);
            let prefix = template.bind(&mut seq, &context)?;
            let wrapped = seq.new_object(
                decorator,
                vec![Value::Local(target), Value::str(self.tag.clone()), prefix],
            )?;
            seq.assign(target, Value::Local(wrapped));
            seq.insert_after(anchor)?;
        }
        Ok(())
    }
}
