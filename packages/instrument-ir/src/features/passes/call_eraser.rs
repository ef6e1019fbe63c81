//! Call eraser
//!
//! Removes every call whose resolved callee matches a method-table entry.
//! Restricted to bodies passing the filter-mode matcher.

use tracing::debug;

use crate::config::Config;
use crate::errors::Result;
use crate::features::building::inspect;
use crate::features::matching::{Filter, MethodDirectives};
use crate::shared::models::{Body, Program};

use super::TransformPass;

pub struct CallEraser {
    filter: Option<Filter>,
    directives: MethodDirectives,
}

impl CallEraser {
    /// Reads `CallEraser.methods` (required method-table spec) and
    /// `CallEraser.filter`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let spec = config.require("CallEraser.methods")?;
        let directives = MethodDirectives::from_spec(spec, "")?;
        let filter = config
            .get("CallEraser.filter")
            .map(Filter::parse)
            .transpose()?;
        Ok(CallEraser { filter, directives })
    }
}

impl TransformPass for CallEraser {
    fn name(&self) -> &'static str {
        "CallEraser"
    }

    fn process_body(&self, program: &Program, body: &mut Body) -> Result<()> {
        if let Some(filter) = &self.filter {
            if !filter.matches_body(body) {
                return Ok(());
            }
        }
        let doomed: Vec<_> = body
            .instructions()
            .filter(|(_, instruction)| {
                inspect::invocation_callee(instruction)
                    .is_some_and(|callee| self.directives.resolve(program, callee).is_some())
            })
            .map(|(id, _)| id)
            .collect();
        if doomed.is_empty() {
            return Ok(());
        }
        for id in &doomed {
            body.remove(*id);
        }
        debug!(
            method = %body.method.signature(),
            removed = doomed.len(),
            "erased calls"
        );
        body.validate(program)
    }
}
