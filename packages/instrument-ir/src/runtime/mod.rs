//! Runtime logging decorators
//!
//! The behavioral counterparts of the injected helper classes: reentrant-
//! safe logging wrappers over byte-stream endpoints, plus byte rendering
//! and the chunked log sink they emit through.

pub mod byte_render;
pub mod logging_reader;
pub mod logging_writer;
pub mod sink;

pub use byte_render::render_bytes;
pub use logging_reader::LoggingReader;
pub use logging_writer::LoggingWriter;
pub use sink::{LogSink, TracingSink, MESSAGE_LIMIT};
