//! Per-call-site logger
//!
//! For every call matching a method-table template, inserts a logging
//! sequence immediately after the call, bound to the enclosing method, the
//! receiver, the actual arguments and the result if the call is assigned.

use rustc_hash::FxHashMap;

use crate::config::Config;
use crate::errors::Result;
use crate::features::building::{inspect, InstructionSeq};
use crate::features::matching::{Filter, MethodDirectives};
use crate::features::templating::{CallContext, CompiledTemplate};
use crate::shared::models::{Body, Program, Value};

use super::TransformPass;

const RESERVED: &[&str] = &["enabled", "tag", "filter"];

#[derive(Debug)]
pub struct CallLogger {
    filter: Option<Filter>,
    tag: String,
    directives: MethodDirectives,
    /// Template payload → compiled plan, populated eagerly so template
    /// errors surface at startup
    templates: FxHashMap<String, CompiledTemplate>,
}

impl CallLogger {
    pub fn from_config(config: &Config) -> Result<Self> {
        let filter = config
            .get("CallLogger.filter")
            .map(Filter::parse)
            .transpose()?;
        let tag = config.get_or("CallLogger.tag", "CallLogger").to_string();
        let directives = MethodDirectives::from_config(config, "CallLogger.", RESERVED)?;
        let templates = compile_payloads(&directives)?;
        Ok(CallLogger {
            filter,
            tag,
            directives,
            templates,
        })
    }
}

/// Compile every distinct payload of a directive table up front.
pub(crate) fn compile_payloads(
    directives: &MethodDirectives,
) -> Result<FxHashMap<String, CompiledTemplate>> {
    let mut templates = FxHashMap::default();
    for payload in directives.payloads() {
        if !templates.contains_key(payload) {
            templates.insert(payload.to_string(), CompiledTemplate::compile(payload)?);
        }
    }
    Ok(templates)
}

impl TransformPass for CallLogger {
    fn name(&self) -> &'static str {
        "CallLogger"
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
                let invoke = inspect::invocation(instruction)?;
                let payload = self.directives.resolve(program, &invoke.callee)?;
                Some((
                    id,
                    payload,
                    invoke.clone(),
                    inspect::assignment_target(instruction),
                ))
            })
            .collect();

        for (anchor, payload, invoke, target) in sites {
            let template = &self.templates[payload];
            let context = CallContext {
                method_signature: body.method.signature(),
                receiver: invoke.receiver.clone(),
                result: target.map(Value::Local),
                args: invoke.args.clone(),
            };
            let mut seq = InstructionSeq::new(program, body);
            let message = template.bind(&mut seq, &context)?;
            seq.log(&self.tag, message)?;
            seq.insert_after(anchor)?;
        }
        Ok(())
    }
}
