//! Transform passes
//!
//! One pass per instrumentation kind. Each reads its own flat, prefixed
//! configuration namespace and exposes one operation: process one method
//! body against an explicit program handle. A non-matching body is left
//! untouched; an edit that fails re-validation aborts the run.

pub mod assignment_eraser;
pub mod call_eraser;
pub mod call_logger;
pub mod download_logger;
pub mod method_logger;
pub mod stream_logger;

pub use assignment_eraser::AssignmentEraser;
pub use call_eraser::CallEraser;
pub use call_logger::CallLogger;
pub use download_logger::DownloadLogger;
pub use method_logger::MethodLogger;
pub use stream_logger::StreamLogger;

use crate::errors::Result;
use crate::shared::models::{Body, Program};

/// A directive-driven point edit over one method body
pub trait TransformPass {
    fn name(&self) -> &'static str;

    fn process_body(&self, program: &Program, body: &mut Body) -> Result<()>;
}
