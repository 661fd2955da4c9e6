//! Translation module.
//!
//! * [`Translator`] — async trait for a remote translation backend.
//! * [`HttpTranslator`] — Google Cloud Translation v2 REST client.
//! * [`TranslationCache`] / [`CachePolicy`] — keyed result cache, unbounded
//!   or LRU.
//! * [`TranslationService`] — cache + single-flight front for a
//!   [`Translator`]; the one component shared by every pipeline lane.
//! * [`TranslateError`] / [`ConfigError`] — error variants.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use scan_translate::config::AppConfig;
//! use scan_translate::translate::{HttpTranslator, TranslationRequest, TranslationService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load()?;
//!     let client = HttpTranslator::from_config(&config.translation)?;
//!     let service = TranslationService::new(Arc::new(client), config.cache.policy());
//!
//!     let request = TranslationRequest::new("Hello", "en", "es");
//!     let result = service.translate(&request).await?;
//!     println!("{}", result.translated_text);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod client;
pub mod error;
pub mod request;
pub mod service;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use cache::{CachePolicy, CacheStats, TranslationCache};
pub use client::{HttpTranslator, Translator};
pub use error::{ConfigError, TranslateError};
pub use request::{TranslationRequest, TranslationResult};
pub use service::TranslationService;
