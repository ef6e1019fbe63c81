//! Pass orchestration
//!
//! Builds the enabled passes from configuration and applies them to every
//! method body in the program, strictly sequentially. Pass order is fixed
//! at registration and is a real correctness dependency when pass targets
//! overlap.

use tracing::{debug, info};

use crate::config::Config;
use crate::errors::{InstrumentError, Result};
use crate::features::passes::{
    AssignmentEraser, CallEraser, CallLogger, DownloadLogger, MethodLogger, StreamLogger,
    TransformPass,
};
use crate::shared::models::Program;

/// The per-body driver over the enabled passes
pub struct Instrumenter {
    passes: Vec<Box<dyn TransformPass>>,
}

impl std::fmt::Debug for Instrumenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instrumenter")
            .field(
                "passes",
                &self.passes.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Instrumenter {
    /// Build every pass whose `enabled` option is present, in registration
    /// order. A configuration enabling no pass is fatal.
    pub fn from_config(config: &Config, program: &mut Program) -> Result<Self> {
        let mut passes: Vec<Box<dyn TransformPass>> = Vec::new();
        if config.is_set("MethodLogger.enabled") {
            passes.push(Box::new(MethodLogger::from_config(config)?));
        }
        if config.is_set("AssignmentEraser.enabled") {
            passes.push(Box::new(AssignmentEraser::from_config(config)?));
        }
        if config.is_set("CallEraser.enabled") {
            passes.push(Box::new(CallEraser::from_config(config)?));
        }
        if config.is_set("CallLogger.enabled") {
            passes.push(Box::new(CallLogger::from_config(config)?));
        }
        if config.is_set("StreamLogger.enabled") {
            passes.push(Box::new(StreamLogger::from_config(config, program)?));
        }
        if config.is_set("DownloadLogger.enabled") {
            passes.push(Box::new(DownloadLogger::from_config(config, program)?));
        }
        if passes.is_empty() {
            return Err(InstrumentError::config(
                "no transform pass is enabled in the configuration",
            ));
        }
        Ok(Instrumenter { passes })
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }

    /// Visit every method body once; each enabled pass runs against it in
    /// order. Aborts on the first fault, leaving no partial-success mode.
    pub fn run(&self, program: &mut Program) -> Result<()> {
        let targets = program.body_targets();
        info!(bodies = targets.len(), passes = self.passes.len(), "instrumentation run");
        for (class, method_index) in targets {
            let Some(mut body) = program.take_body(&class, method_index) else {
                continue;
            };
            let mut outcome = Ok(());
            for pass in &self.passes {
                outcome = pass.process_body(program, &mut body);
                if outcome.is_err() {
                    break;
                }
            }
            debug!(method = %body.method.signature(), "visited body");
            program.put_body(&class, method_index, body);
            outcome?;
        }
        Ok(())
    }
}
