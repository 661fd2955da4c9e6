//! Perception-to-translation pipeline for camera / AR frame streams.
//!
//! ```text
//! frames ──▶ FrameSampler ──▶ RecognitionAdapter ──▶ TranslationService ──▶ ResultPublisher
//!               ▲                 (spawn_blocking)       (cache + single-flight)     │
//!               └──────────── in-flight flag (per lane) ◀─────────────────────────────┘
//! ```
//!
//! * [`config`]    — `settings.toml` persistence and defaults.
//! * [`recognize`] — text recognition / object detection behind one adapter.
//! * [`translate`] — HTTP translation client, LRU cache, single-flight service.
//! * [`pipeline`]  — sampler, per-lane state machine, coordinator, publisher.

pub mod config;
pub mod pipeline;
pub mod recognize;
pub mod translate;
