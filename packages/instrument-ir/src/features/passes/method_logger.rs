//! Method-entry logger
//!
//! For a matching body, inserts a logging sequence at the first non-setup
//! instruction, bound to the method signature and its parameters.

use tracing::debug;

use crate::config::Config;
use crate::errors::Result;
use crate::features::building::InstructionSeq;
use crate::features::matching::Filter;
use crate::shared::models::{Body, Program, Value};

use super::TransformPass;

pub struct MethodLogger {
    filter: Option<Filter>,
    tag: String,
}

impl MethodLogger {
    pub fn from_config(config: &Config) -> Result<Self> {
        let filter = config
            .get("MethodLogger.filter")
            .map(Filter::parse)
            .transpose()?;
        let tag = config.get_or("MethodLogger.tag", "MethodLogger").to_string();
        Ok(MethodLogger { filter, tag })
    }
}

impl TransformPass for MethodLogger {
    fn name(&self) -> &'static str {
        "MethodLogger"
    }

    fn process_body(&self, program: &Program, body: &mut Body) -> Result<()> {
        if let Some(filter) = &self.filter {
            if !filter.matches_body(body) {
                return Ok(());
            }
        }
        let Some(anchor) = body.first_non_setup() else {
            debug!(method = %body.method.signature(), "body has no insertion point");
            return Ok(());
        };
        let signature = body.method.signature();
        let parameters: Vec<Value> = body.param_locals().iter().copied().map(Value::Local).collect();

        let mut seq = InstructionSeq::new(program, body);
        let message = if parameters.is_empty() {
            Value::str(format!("Entered method {}", signature))
        } else {
            let builder = seq.new_object(
                "java.lang.StringBuilder",
                vec![Value::str(format!(
                    "Entered method {} with parameters: ",
                    signature
                ))],
            )?;
            let mut first = true;
            for parameter in &parameters {
                if !first {
                    seq.call_discard(
                        Some(Value::Local(builder)),
                        "java.lang.StringBuilder",
                        "append",
                        vec![Value::str(", ")],
                    )?;
                }
                first = false;
                let stringified = seq.stringify(parameter)?;
                seq.call_discard(
                    Some(Value::Local(builder)),
                    "java.lang.StringBuilder",
                    "append",
                    vec![Value::Local(stringified)],
                )?;
            }
            let text = seq.call(
                Some(Value::Local(builder)),
                "java.lang.StringBuilder",
                "toString",
                vec![],
            )?;
            Value::Local(text.expect("toString returns String"))
        };
        seq.log(&self.tag, message)?;
        seq.insert_before(anchor)
    }
}
