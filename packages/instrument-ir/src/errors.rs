//! Error types for instrument-ir
//!
//! Provides unified error handling across the crate.

use thiserror::Error;

/// Main error type for instrumentation operations
#[derive(Debug, Error)]
pub enum InstrumentError {
    /// Bad configuration: missing required option, unparseable matcher or
    /// template syntax, no pass enabled. Fatal at startup; no body is
    /// processed.
    #[error("configuration error: {0}")]
    Config(String),

    /// An edit produced a structurally invalid method body. Signals an
    /// internal bug in the instrumentation logic; aborts the run.
    #[error("structural fault: {0}")]
    Structural(String),

    /// Configuration names a class, method or constructor that does not
    /// exist in the program.
    #[error("unresolved reference: {0}")]
    Lookup(String),

    /// IO error while reading a configuration file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl InstrumentError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        InstrumentError::Config(msg.into())
    }

    /// Create a structural fault
    pub fn structural(msg: impl Into<String>) -> Self {
        InstrumentError::Structural(msg.into())
    }

    /// Create an unresolved-reference error
    pub fn lookup(msg: impl Into<String>) -> Self {
        InstrumentError::Lookup(msg.into())
    }
}

/// Result type alias for instrumentation operations
pub type Result<T> = std::result::Result<T, InstrumentError>;
