//! Assignment-type eraser
//!
//! Removes every assignment whose target's declared type equals the
//! configured type name. Restricted to bodies passing the filter-mode
//! matcher.

use tracing::debug;

use crate::config::Config;
use crate::errors::Result;
use crate::features::building::inspect;
use crate::features::matching::Filter;
use crate::shared::models::{Body, Program};

use super::TransformPass;

#[derive(Debug)]
pub struct AssignmentEraser {
    filter: Option<Filter>,
    type_name: String,
}

impl AssignmentEraser {
    /// Reads `AssignmentEraser.type` (required) and `AssignmentEraser.filter`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let type_name = config.require("AssignmentEraser.type")?.to_string();
        let filter = config
            .get("AssignmentEraser.filter")
            .map(Filter::parse)
            .transpose()?;
        Ok(AssignmentEraser { filter, type_name })
    }
}

impl TransformPass for AssignmentEraser {
    fn name(&self) -> &'static str {
        "AssignmentEraser"
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
                inspect::assignment_target(instruction)
                    .and_then(|target| body.local_type(target))
                    .is_some_and(|ty| ty.name() == self.type_name)
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
            "erased assignments"
        );
        body.validate(program)
    }
}
