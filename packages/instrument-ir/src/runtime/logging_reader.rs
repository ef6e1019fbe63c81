//! Logging decorator over a readable byte stream
//!
//! Forwards every read to the wrapped endpoint and emits one formatted log
//! line per outer call. Handles are cheap clones over a shared
//! single-threaded core, so a sink holding a handle to the same instance
//! can re-enter it; the instance-local reentrance flag then forwards
//! without logging, guaranteeing termination when logging itself triggers
//! further instrumented I/O. Deliberately not thread-safe: the flag guards
//! same-thread recursion only.

use std::cell::{Cell, RefCell};
use std::io::{self, Read};
use std::rc::Rc;

use super::byte_render::render_bytes;
use super::sink::{emit_chunked, LogSink, TracingSink};

struct ReaderCore<R> {
    inner: RefCell<R>,
    tag: String,
    prefix: String,
    sink: Rc<dyn LogSink>,
    reentrance: Cell<bool>,
}

impl<R> ReaderCore<R> {
    fn log(&self, data: &[u8]) {
        let message = format!("{}: received data \"{}\"", self.prefix, render_bytes(data));
        emit_chunked(self.sink.as_ref(), &self.tag, &message);
    }
}

/// Reentrant-safe logging wrapper around a `Read` endpoint
pub struct LoggingReader<R> {
    core: Rc<ReaderCore<R>>,
}

impl<R> Clone for LoggingReader<R> {
    fn clone(&self) -> Self {
        LoggingReader {
            core: Rc::clone(&self.core),
        }
    }
}

impl<R: Read> LoggingReader<R> {
    pub fn new(
        inner: R,
        tag: impl Into<String>,
        prefix: impl Into<String>,
        sink: Rc<dyn LogSink>,
    ) -> Self {
        LoggingReader {
            core: Rc::new(ReaderCore {
                inner: RefCell::new(inner),
                tag: tag.into(),
                prefix: prefix.into(),
                sink,
                reentrance: Cell::new(false),
            }),
        }
    }

    /// Wrapper logging through the default `tracing` sink
    pub fn with_tracing(inner: R, tag: impl Into<String>, prefix: impl Into<String>) -> Self {
        LoggingReader::new(inner, tag, prefix, Rc::new(TracingSink))
    }
}

impl<R: Read> Read for LoggingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.core.reentrance.get() {
            return self.core.inner.borrow_mut().read(buf);
        }
        self.core.reentrance.set(true);
        // The inner borrow must end before logging: the sink may hold a
        // clone of this handle.
        let result = self.core.inner.borrow_mut().read(buf);
        if let Ok(count) = &result {
            if *count > 0 {
                self.core.log(&buf[..*count]);
            }
        }
        self.core.reentrance.set(false);
        result
    }
}
