//! Networking-API logger
//!
//! Logs calls into the well-known networking entry points through a
//! built-in directive table — a hard-coded configuration instance of the
//! data-driven call logger. The two stream-obtaining entry points
//! additionally wrap their result in the logging decorator, gated
//! independently by the request-body and response flags.

use rustc_hash::FxHashMap;

use crate::config::Config;
use crate::errors::{InstrumentError, Result};
use crate::features::building::{inspect, InstructionSeq};
use crate::features::injection::{inject_class, LOGGING_INPUT_STREAM, LOGGING_OUTPUT_STREAM};
use crate::features::matching::{Filter, MethodDirectives};
use crate::features::templating::{CallContext, CompiledTemplate};
use crate::shared::models::{Body, Program, Value};

use super::call_logger::compile_payloads;
use super::stream_logger::decorator_for;
use super::TransformPass;

/// Built-in log directives, keyed by class and exact signature
const LOG_TABLE: &[(&str, &str)] = &[
    (
        "java.net.URL:openConnection()",
        "Method {method:%s} opened URLConnection {result:%x} to URL {this:%s}",
    ),
    (
        "java.net.URLConnection:addRequestProperty(java.lang.String,java.lang.String)",
        "Method {method:%s} added request property to URLConnection {this:%x}: {arg0:%s}={arg1:%s}",
    ),
    (
        "java.net.URLConnection:connect()",
        "Method {method:%s} called connect() on URLConnection {this:%x}",
    ),
    (
        "java.net.URLConnection:getContentLength()",
        "Method {method:%s} retrieved content length on URLConnection {this:%x} ({result:%i})",
    ),
    (
        "java.net.URLConnection:getContentType()",
        "Method {method:%s} retrieved content type on URLConnection {this:%x} ({result:%s})",
    ),
    (
        "java.net.URLConnection:getHeaderField(java.lang.String)",
        "Method {method:%s} retrieved header field {arg0:%s} on URLConnection {this:%x} ({result:%s})",
    ),
    (
        "java.net.HttpURLConnection:getResponseCode()",
        "Method {method:%s} retrieved response code on URLConnection {this:%x} ({result:%i})",
    ),
    (
        "java.net.HttpURLConnection:setRequestMethod(java.lang.String)",
        "Method {method:%s} set request method on URLConnection {this:%x} to {arg0:%s}",
    ),
];

/// Decorator-wrap directives for the stream entry points; each is active
/// only when its flag enables it
const RESPONSE_WRAP: (&str, &str) = (
    "java.net.URLConnection:getInputStream()",
    "Received data from URLConnection {this:%x}",
);
const REQUEST_WRAP: (&str, &str) = (
    "java.net.URLConnection:getOutputStream()",
    "Sent data to URLConnection {this:%x}",
);

pub struct DownloadLogger {
    filter: Option<Filter>,
    tag: String,
    log_table: MethodDirectives,
    wrap_table: MethodDirectives,
    templates: FxHashMap<String, CompiledTemplate>,
}

impl DownloadLogger {
    /// Reads `DownloadLogger.{filter,tag,requestBodies,responses}`; the
    /// stream flags inject the decorator classes they need.
    pub fn from_config(config: &Config, program: &mut Program) -> Result<Self> {
        let filter = config
            .get("DownloadLogger.filter")
            .map(Filter::parse)
            .transpose()?;
        let tag = config
            .get_or("DownloadLogger.tag", "DownloadLogger")
            .to_string();

        let mut log_table = MethodDirectives::new();
        for (token, template) in LOG_TABLE {
            log_table.add(token, template)?;
        }

        let mut wrap_table = MethodDirectives::new();
        if config.is_set("DownloadLogger.responses") {
            wrap_table.add(RESPONSE_WRAP.0, RESPONSE_WRAP.1)?;
            inject_class(program, LOGGING_INPUT_STREAM)?;
        }
        if config.is_set("DownloadLogger.requestBodies") {
            wrap_table.add(REQUEST_WRAP.0, REQUEST_WRAP.1)?;
            inject_class(program, LOGGING_OUTPUT_STREAM)?;
        }

        let mut templates = compile_payloads(&log_table)?;
        templates.extend(compile_payloads(&wrap_table)?);

        Ok(DownloadLogger {
            filter,
            tag,
            log_table,
            wrap_table,
            templates,
        })
    }
}

impl TransformPass for DownloadLogger {
    fn name(&self) -> &'static str {
        "DownloadLogger"
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
                // Instance entry points only
                invoke.receiver.as_ref()?;
                let target = inspect::assignment_target(instruction);
                if let Some(payload) = self.wrap_table.resolve(program, &invoke.callee) {
                    // Unassigned stream results have nothing to wrap.
                    let target = target?;
                    return Some((id, payload, invoke.clone(), Some(target), true));
                }
                let payload = self.log_table.resolve(program, &invoke.callee)?;
                Some((id, payload, invoke.clone(), target, false))
            })
            .collect();

        for (anchor, payload, invoke, target, wrap) in sites {
            let template = &self.templates[payload];
            let context = CallContext {
                method_signature: body.method.signature(),
                receiver: invoke.receiver.clone(),
                result: target.map(Value::Local),
                args: invoke.args.clone(),
            };
            let decorator = if wrap {
                let target = target.expect("wrap sites are assignments");
                let result_type = body
                    .local_type(target)
                    .map(|ty| ty.name())
                    .unwrap_or_default();
                Some(decorator_for(&result_type).ok_or_else(|| {
                    InstrumentError::config(format!(
                        "call to {} in {} produced a result that is neither an input nor an output stream: {}",
                        invoke.callee.signature(),
                        body.method.signature(),
                        result_type
                    ))
                })?)
            } else {
                None
            };
            let mut seq = InstructionSeq::new(program, body);
            match decorator {
                Some(decorator) => {
                    let target = target.expect("wrap sites are assignments");
                    let prefix = template.bind(&mut seq, &context)?;
                    let wrapped = seq.new_object(
                        decorator,
                        vec![Value::Local(target), Value::str(self.tag.clone()), prefix],
                    )?;
                    seq.assign(target, Value::Local(wrapped));
                }
                None => {
                    let message = template.bind(&mut seq, &context)?;
                    seq.log(&self.tag, message)?;
                }
            }
            seq.insert_after(anchor)?;
        }
        Ok(())
    }
}
