//! Core `Translator` trait and the `HttpTranslator` implementation.
//!
//! `HttpTranslator` speaks the Google Cloud Translation v2 REST shape:
//!
//! ```text
//! POST {base_url}?key=…&q=…&source=…&target=…&format=text
//!   → { "data": { "translations": [ { "translatedText": "…" } ] } }
//!
//! POST {base_url}/detect?key=…&q=…
//!   → { "data": { "detections": [ [ { "language": "…", "confidence": 0.9 } ] ] } }
//! ```
//!
//! Errors come back as a non-2xx status, usually with a body of the form
//! `{ "error": { "code": 403, "message": "…" } }`.

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::TranslationConfig;
use crate::translate::error::{ConfigError, TranslateError};
use crate::translate::request::TranslationRequest;

// ---------------------------------------------------------------------------
// Translator trait
// ---------------------------------------------------------------------------

/// Async trait for a remote translation backend.
///
/// Implementors must be `Send + Sync` so they can be shared across tasks
/// behind an `Arc<dyn Translator>`.  Implementations perform exactly one
/// round trip per call: no caching, no retries.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `request.source_text()` and return the translated text.
    async fn translate(&self, request: &TranslationRequest) -> Result<String, TranslateError>;

    /// Return the most likely ISO-639-1 language code of `text`.
    async fn detect_language(&self, text: &str) -> Result<String, TranslateError>;
}

// ---------------------------------------------------------------------------
// Wire models
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct TranslateData {
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
}

#[derive(Debug, Deserialize)]
struct DetectData {
    detections: Vec<Vec<LanguageDetection>>,
}

#[derive(Debug, Deserialize)]
struct LanguageDetection {
    language: String,
    #[allow(dead_code)]
    confidence: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<u16>,
    message: String,
}

// ---------------------------------------------------------------------------
// HttpTranslator
// ---------------------------------------------------------------------------

/// REST client for the translation endpoint.
///
/// All connection details come from [`TranslationConfig`]; a missing API key
/// or unparseable URL is reported by the constructor, never per call.
#[derive(Debug, Clone)]
pub struct HttpTranslator {
    client: reqwest::Client,
    translate_url: Url,
    detect_url: Url,
    api_key: String,
}

impl HttpTranslator {
    /// Build a client from application config.
    ///
    /// The API key is taken from `config.api_key` or the environment (see
    /// [`TranslationConfig::resolved_api_key`]).
    pub fn from_config(config: &TranslationConfig) -> Result<Self, ConfigError> {
        Self::new(&config.base_url, config.resolved_api_key(), config.timeout())
    }

    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: std::time::Duration,
    ) -> Result<Self, ConfigError> {
        let api_key = api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let invalid = |reason: String| ConfigError::InvalidUrl {
            url: base_url.to_string(),
            reason,
        };

        let translate_url = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if translate_url.cannot_be_a_base() {
            return Err(invalid("not a hierarchical URL".into()));
        }
        let detect_url = Url::parse(&format!("{}/detect", base_url.trim_end_matches('/')))
            .map_err(|e| invalid(e.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            translate_url,
            detect_url,
            api_key,
        })
    }

    /// POST `params` to `url` and decode a `{ "data": T }` body.
    async fn post<T: DeserializeOwned>(
        &self,
        url: &Url,
        params: &[(&str, &str)],
    ) -> Result<T, TranslateError> {
        let response = self
            .client
            .post(url.clone())
            .query(&[("key", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(TranslateError::Service {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        // Some proxies answer 200 with an error payload.
        if let Ok(err) = serde_json::from_slice::<ErrorEnvelope>(&body) {
            return Err(TranslateError::Service {
                status: err.error.code.unwrap_or(status.as_u16()),
                message: err.error.message,
            });
        }

        let envelope: Envelope<T> =
            serde_json::from_slice(&body).map_err(|e| TranslateError::Decode(e.to_string()))?;
        Ok(envelope.data)
    }
}

/// Best-effort message for a non-2xx body.
fn error_message(body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(err) => err.error.message,
        Err(_) => String::from_utf8_lossy(body).trim().to_string(),
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(&self, request: &TranslationRequest) -> Result<String, TranslateError> {
        let data: TranslateData = self
            .post(
                &self.translate_url,
                &[
                    ("q", request.source_text()),
                    ("source", request.source_lang()),
                    ("target", request.target_lang()),
                    ("format", "text"),
                ],
            )
            .await?;

        data.translations
            .into_iter()
            .next()
            .map(|t| t.translated_text)
            .ok_or_else(|| TranslateError::Decode("response contained no translations".into()))
    }

    async fn detect_language(&self, text: &str) -> Result<String, TranslateError> {
        let data: DetectData = self.post(&self.detect_url, &[("q", text)]).await?;

        data.detections
            .into_iter()
            .next()
            .and_then(|group| group.into_iter().next())
            .map(|d| d.language)
            .ok_or_else(|| TranslateError::Decode("response contained no detections".into()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
