//! Latest-value result slot observed by the presentation layer.
//!
//! Backed by a `tokio::sync::watch` channel: [`publish`](ResultPublisher::publish)
//! swaps the whole value in one step, [`current`](ResultPublisher::current)
//! reads it without waiting, and [`subscribe`](ResultPublisher::subscribe)
//! hands out receivers that wake on every change.  No history is kept.

use tokio::sync::watch;

use crate::pipeline::result::PipelineResult;

/// Holds at most one [`PipelineResult`].
#[derive(Debug)]
pub struct ResultPublisher {
    tx: watch::Sender<Option<PipelineResult>>,
}

impl ResultPublisher {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Replace the held value.
    pub fn publish(&self, result: PipelineResult) {
        self.tx.send_replace(Some(result));
    }

    /// The most recently published value, if any.
    pub fn current(&self) -> Option<PipelineResult> {
        self.tx.borrow().clone()
    }

    /// A receiver that observes every subsequent change.
    pub fn subscribe(&self) -> watch::Receiver<Option<PipelineResult>> {
        self.tx.subscribe()
    }
}

impl Default for ResultPublisher {
    fn default() -> Self {
        Self::new()
    }
}
