//! Pipeline: frame sampling, per-lane state machine and result publishing.
//!
//! This module wires recognition to translation and exposes the latest
//! result of each lane to whatever presents it.
//!
//! # Architecture
//!
//! ```text
//! Frame (submit / mpsc)
//!        │
//!        ▼
//! PipelineCoordinator::submit()  ← non-blocking, called by the producer
//!        │
//!        ├─ text lane   : FrameSampler → spawn(recognize_text → translate)
//!        │
//!        └─ object lane : FrameSampler → spawn(detect_objects → top label → translate)
//!                                                  │
//!                                                  ▼
//!                               ResultPublisher (watch) ← read by the presentation layer
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use scan_translate::config::AppConfig;
//! use scan_translate::pipeline::{Lane, PipelineCoordinator};
//! use scan_translate::recognize::{Frame, FrameImage, RecognitionAdapter};
//! use scan_translate::translate::{HttpTranslator, TranslationService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load()?;
//!     let translator = Arc::new(HttpTranslator::from_config(&config.translation)?);
//!     let service = Arc::new(TranslationService::new(translator, config.cache.policy()));
//!
//!     // (models are registered on the adapter)
//!     let coordinator =
//!         PipelineCoordinator::builder(&config, RecognitionAdapter::new(), service).build();
//!
//!     let frame = Frame::new(FrameImage::new(1, 1, vec![0u8]), Duration::ZERO);
//!     coordinator.submit(frame);
//!
//!     let mut results = coordinator.subscribe(Lane::Text);
//!     results.changed().await?;
//!     Ok(())
//! }
//! ```

pub mod coordinator;
pub mod language;
pub mod publisher;
pub mod result;
pub mod sampler;
pub mod sink;
pub mod state;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use coordinator::{select_top_detection, Admission, PipelineBuilder, PipelineCoordinator};
pub use language::TargetLanguage;
pub use publisher::ResultPublisher;
pub use result::PipelineResult;
pub use sampler::FrameSampler;
pub use sink::{ErrorSink, LogSink};
pub use state::{Lane, LaneState, LaneStatus};
