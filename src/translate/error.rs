//! Errors raised by the translation subsystem.

use thiserror::Error;

use crate::config::API_KEY_ENV;

/// Failure of one translation or language-detection call.
///
/// `Clone` so a single outcome can be handed to every caller waiting on the
/// same in-flight request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TranslateError {
    /// Transport failure: DNS, connection refused, reset, TLS.
    #[error("network error: {0}")]
    Network(String),

    /// The request did not complete within the configured timeout.
    /// Counted as a network failure.
    #[error("translation request timed out")]
    Timeout,

    /// The endpoint answered with a non-success status or an error payload.
    #[error("translation service error (HTTP {status}): {message}")]
    Service { status: u16, message: String },

    /// The response body was not the JSON shape we expect.
    #[error("malformed translation response: {0}")]
    Decode(String),
}

impl TranslateError {
    /// `true` for transport-level failures (including timeouts).
    pub fn is_network(&self) -> bool {
        matches!(self, TranslateError::Network(_) | TranslateError::Timeout)
    }
}

impl From<reqwest::Error> for TranslateError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TranslateError::Timeout
        } else if e.is_decode() {
            TranslateError::Decode(e.to_string())
        } else {
            TranslateError::Network(e.to_string())
        }
    }
}

/// Problems detected while building a translation client.  These fail fast
/// at construction time instead of on every request.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no translation API key configured (set translation.api_key or {})", API_KEY_ENV)]
    MissingApiKey,

    #[error("invalid translation endpoint {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}
