//! Logging decorator over a writable byte stream
//!
//! The mirror image of the reading decorator: forwards every write, logs
//! the bytes actually written, skips logging on reentrant calls.

use std::cell::{Cell, RefCell};
use std::io::{self, Write};
use std::rc::Rc;

use super::byte_render::render_bytes;
use super::sink::{emit_chunked, LogSink, TracingSink};

struct WriterCore<W> {
    inner: RefCell<W>,
    tag: String,
    prefix: String,
    sink: Rc<dyn LogSink>,
    reentrance: Cell<bool>,
}

impl<W> WriterCore<W> {
    fn log(&self, data: &[u8]) {
        let message = format!("{}: sent data \"{}\"", self.prefix, render_bytes(data));
        emit_chunked(self.sink.as_ref(), &self.tag, &message);
    }
}

/// Reentrant-safe logging wrapper around a `Write` endpoint
pub struct LoggingWriter<W> {
    core: Rc<WriterCore<W>>,
}

impl<W> Clone for LoggingWriter<W> {
    fn clone(&self) -> Self {
        LoggingWriter {
            core: Rc::clone(&self.core),
        }
    }
}

impl<W: Write> LoggingWriter<W> {
    pub fn new(
        inner: W,
        tag: impl Into<String>,
        prefix: impl Into<String>,
        sink: Rc<dyn LogSink>,
    ) -> Self {
        LoggingWriter {
            core: Rc::new(WriterCore {
                inner: RefCell::new(inner),
                tag: tag.into(),
                prefix: prefix.into(),
                sink,
                reentrance: Cell::new(false),
            }),
        }
    }

    /// Wrapper logging through the default `tracing` sink
    pub fn with_tracing(inner: W, tag: impl Into<String>, prefix: impl Into<String>) -> Self {
        LoggingWriter::new(inner, tag, prefix, Rc::new(TracingSink))
    }
}

impl<W: Write> Write for LoggingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.core.reentrance.get() {
            return self.core.inner.borrow_mut().write(buf);
        }
        self.core.reentrance.set(true);
        let result = self.core.inner.borrow_mut().write(buf);
        if let Ok(count) = &result {
            if *count > 0 {
                self.core.log(&buf[..*count]);
            }
        }
        self.core.reentrance.set(false);
        result
    }

    fn flush(&mut self) -> io::Result<()> {
        self.core.inner.borrow_mut().flush()
    }
}
