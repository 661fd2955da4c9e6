//! Observability sink for translation failures.
//!
//! A failed translation never reaches the published result (the previous
//! value stays on screen); it is reported here instead.

use crate::pipeline::state::Lane;
use crate::translate::TranslateError;

/// Receives errors that a lane absorbed.
pub trait ErrorSink: Send + Sync {
    fn report(&self, lane: Lane, error: &TranslateError);
}

/// Default sink: one `warn` line per failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ErrorSink for LogSink {
    fn report(&self, lane: Lane, error: &TranslateError) {
        log::warn!("pipeline: {lane} lane translation failed: {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_sink_does_not_panic() {
        LogSink.report(Lane::Text, &TranslateError::Timeout);
    }

    #[test]
    fn sink_is_object_safe() {
        let _: Box<dyn ErrorSink> = Box::new(LogSink);
    }
}
