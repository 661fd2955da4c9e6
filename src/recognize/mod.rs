//! On-device recognition behind one adapter.
//!
//! # Architecture
//!
//! ```text
//! Frame ──▶ RecognitionAdapter ──spawn_blocking──▶ TextRecognizer  ──▶ Option<RecognizedText>
//!                              └─spawn_blocking──▶ ObjectDetector  ──▶ Vec<Detection>
//! ```
//!
//! The model traits are synchronous and may be slow; the adapter moves each
//! call onto tokio's blocking pool and absorbs model failures, so callers
//! only ever see "something" or "nothing".

pub mod adapter;
pub mod types;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use adapter::{ObjectDetector, RecognitionAdapter, RecognitionError, TextRecognizer};
pub use types::{Detection, Frame, FrameImage, RecognizedText, Region};

// test-only re-export so the pipeline tests can build adapters without
// reaching into `recognize::adapter`.
#[cfg(test)]
pub use adapter::{MockObjectDetector, MockTextRecognizer};
