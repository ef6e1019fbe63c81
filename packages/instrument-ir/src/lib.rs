//! instrument-ir - Declarative instruction-level instrumentation engine
//!
//! Patches a compiled program's instruction-level representation to add
//! diagnostic logging, strip selected instructions, or splice in helper
//! classes, driven entirely by a declarative, text-based directive set.
//!
//! Feature-first layout:
//! - shared/   : program representation (classes, bodies, instructions)
//! - features/ : vertical slices (matching, templating, building,
//!   injection, passes)
//! - pipeline/ : pass orchestration
//! - runtime/  : reentrant-safe stream logging decorators
//!
//! The engine mutates the program representation in place; decoding and
//! re-encoding the binary container are the caller's concern.

/// Shared models
pub mod shared;

/// Feature modules
pub mod features;

/// Pipeline orchestration
pub mod pipeline;

/// Configuration system
pub mod config;

/// Runtime decorators
pub mod runtime;

/// Error types
pub mod errors;

// Re-exports for the public API
pub use config::Config;
pub use errors::{InstrumentError, Result};
pub use pipeline::Instrumenter;
pub use shared::models::Program;
