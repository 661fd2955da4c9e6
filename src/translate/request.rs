//! Translation request / result value types.

use std::time::SystemTime;

/// One text to translate between a language pair.
///
/// Doubles as the cache and single-flight key: two requests are the same
/// when their trimmed text and both language codes match exactly.  Leading
/// and trailing whitespace is removed on construction; nothing else is
/// normalised.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TranslationRequest {
    source_text: String,
    source_lang: String,
    target_lang: String,
}

impl TranslationRequest {
    pub fn new(
        source_text: impl Into<String>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
    ) -> Self {
        let source_text: String = source_text.into();
        Self {
            source_text: source_text.trim().to_string(),
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
        }
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn source_lang(&self) -> &str {
        &self.source_lang
    }

    pub fn target_lang(&self) -> &str {
        &self.target_lang
    }
}

/// A completed translation.  Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationResult {
    pub request: TranslationRequest,
    pub translated_text: String,
    /// When the endpoint answered (not when the value was read from cache).
    pub fetched_at: SystemTime,
}

impl TranslationResult {
    pub fn new(request: TranslationRequest, translated_text: impl Into<String>) -> Self {
        Self {
            request,
            translated_text: translated_text.into(),
            fetched_at: SystemTime::now(),
        }
    }
}
