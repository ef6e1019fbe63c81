//! Message templates
//!
//! Compilation of the `{source:format}` template language and binding of
//! compiled plans against concrete call contexts.

pub mod compiler;
pub mod context;

pub use compiler::{CompiledTemplate, FormatKind, PlaceholderSource, Segment};
pub use context::CallContext;
