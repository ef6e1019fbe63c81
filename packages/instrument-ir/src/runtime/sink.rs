//! Log sinks for the runtime decorators
//!
//! The platform log call caps message length, so one logical message is
//! emitted as consecutive, order-preserving chunks.

use tracing::info;

/// Platform message-length ceiling, in characters
pub const MESSAGE_LIMIT: usize = 4000;

/// Destination of decorator log lines
pub trait LogSink {
    fn log(&self, tag: &str, message: &str);
}

/// Default sink routing to `tracing`
#[derive(Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, tag: &str, message: &str) {
        info!(tag, "{}", message);
    }
}

/// Emit one logical message as limit-sized chunks, in order.
pub(crate) fn emit_chunked(sink: &dyn LogSink, tag: &str, message: &str) {
    let mut rest = message;
    loop {
        let split = rest
            .char_indices()
            .nth(MESSAGE_LIMIT)
            .map(|(index, _)| index);
        match split {
            Some(index) => {
                let (chunk, tail) = rest.split_at(index);
                sink.log(tag, chunk);
                rest = tail;
            }
            None => {
                sink.log(tag, rest);
                return;
            }
        }
    }
}
