//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::translate::CachePolicy;

/// Environment variable consulted when `translation.api_key` is unset.
pub const API_KEY_ENV: &str = "SCAN_TRANSLATE_API_KEY";

// ---------------------------------------------------------------------------
// TranslationConfig
// ---------------------------------------------------------------------------

/// Settings for the remote translation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// Translate endpoint URL; language detection posts to `{base_url}/detect`.
    pub base_url: String,
    /// API key sent as the `key` query parameter.
    ///
    /// `None` falls back to [`API_KEY_ENV`].  A key is required: the client
    /// refuses to build without one.
    pub api_key: Option<String>,
    /// Language of recognized text (ISO-639-1).
    pub source_language: String,
    /// Initial target language; can be changed at runtime through
    /// [`TargetLanguage`](crate::pipeline::TargetLanguage).
    pub target_language: String,
    /// Maximum seconds to wait for one HTTP round trip.
    pub timeout_secs: u64,
    /// Detect the source language of recognized text before translating it.
    pub detect_source_language: bool,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://translation.googleapis.com/language/translate/v2".into(),
            api_key: None,
            source_language: "en".into(),
            target_language: "es".into(),
            timeout_secs: 10,
            detect_source_language: false,
        }
    }
}

impl TranslationConfig {
    /// The configured API key, or the value of [`API_KEY_ENV`].
    ///
    /// Empty strings count as missing.
    pub fn resolved_api_key(&self) -> Option<String> {
        let usable = |key: &String| !key.trim().is_empty();
        self.api_key
            .clone()
            .filter(usable)
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(usable))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// CacheConfig
// ---------------------------------------------------------------------------

/// Translation cache sizing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached translations.  `None` keeps every entry for
    /// the lifetime of the process.
    pub capacity: Option<usize>,
}

impl CacheConfig {
    /// Eviction policy derived from `capacity`.
    ///
    /// A capacity of `0` is treated as unbounded.
    pub fn policy(&self) -> CachePolicy {
        match self.capacity {
            Some(capacity) if capacity > 0 => CachePolicy::Lru { capacity },
            _ => CachePolicy::Unbounded,
        }
    }
}

// ---------------------------------------------------------------------------
// SamplerConfig
// ---------------------------------------------------------------------------

/// Frame admission throttling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Minimum milliseconds between two admitted frames of the same lane.
    /// The default (330 ms) admits roughly three frames per second.
    pub interval_ms: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self { interval_ms: 330 }
    }
}

impl SamplerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// Coordinator policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Run the text-recognition lane.
    pub text_lane: bool,
    /// Run the object-detection lane.
    pub object_lane: bool,
    /// Detections below this confidence are ignored when picking the label
    /// to translate.  `0.0` disables filtering.
    pub min_confidence: f32,
    /// Language the object detector emits its labels in.
    pub label_language: String,
    /// Upper bound on one translation call made by a lane, in milliseconds.
    pub translation_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            text_lane: true,
            object_lane: true,
            min_confidence: 0.0,
            label_language: "en".into(),
            translation_timeout_ms: 10_000,
        }
    }
}

impl PipelineConfig {
    pub fn translation_timeout(&self) -> Duration {
        Duration::from_millis(self.translation_timeout_ms)
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level configuration, serialised as `settings.toml`.
///
/// Sections missing from the file take their defaults.
///
/// ```rust,no_run
/// use scan_translate::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// println!("translating into {}", config.translation.target_language);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Remote endpoint settings.
    pub translation: TranslationConfig,
    /// Translation cache settings.
    pub cache: CacheConfig,
    /// Frame sampler settings.
    pub sampler: SamplerConfig,
    /// Coordinator settings.
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(original.translation.base_url, loaded.translation.base_url);
        assert_eq!(original.translation.api_key, loaded.translation.api_key);
        assert_eq!(
            original.translation.target_language,
            loaded.translation.target_language
        );
        assert_eq!(original.cache.capacity, loaded.cache.capacity);
        assert_eq!(original.sampler.interval_ms, loaded.sampler.interval_ms);
        assert_eq!(original.pipeline.min_confidence, loaded.pipeline.min_confidence);
        assert_eq!(original.pipeline.text_lane, loaded.pipeline.text_lane);
    }

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");

        assert_eq!(config.sampler.interval_ms, 330);
        assert_eq!(config.translation.source_language, "en");
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(
            cfg.translation.base_url,
            "https://translation.googleapis.com/language/translate/v2"
        );
        assert!(cfg.translation.api_key.is_none());
        assert_eq!(cfg.translation.target_language, "es");
        assert_eq!(cfg.translation.timeout_secs, 10);
        assert!(!cfg.translation.detect_source_language);
        assert_eq!(cfg.cache.policy(), CachePolicy::Unbounded);
        assert_eq!(cfg.sampler.interval(), Duration::from_millis(330));
        assert_eq!(cfg.pipeline.label_language, "en");
        assert_eq!(cfg.pipeline.translation_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.translation.api_key = Some("test-key".into());
        cfg.translation.target_language = "fr".into();
        cfg.cache.capacity = Some(256);
        cfg.sampler.interval_ms = 500;
        cfg.pipeline.object_lane = false;
        cfg.pipeline.min_confidence = 0.5;

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.translation.api_key.as_deref(), Some("test-key"));
        assert_eq!(loaded.translation.target_language, "fr");
        assert_eq!(loaded.cache.policy(), CachePolicy::Lru { capacity: 256 });
        assert_eq!(loaded.sampler.interval_ms, 500);
        assert!(!loaded.pipeline.object_lane);
        assert_eq!(loaded.pipeline.min_confidence, 0.5);
    }

    #[test]
    fn partial_file_fills_missing_sections() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[sampler]\ninterval_ms = 1000\n").expect("write");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.sampler.interval_ms, 1000);
        assert_eq!(loaded.translation.target_language, "es");
        assert!(loaded.pipeline.text_lane);
    }

    #[test]
    fn zero_capacity_means_unbounded() {
        let cfg = CacheConfig { capacity: Some(0) };
        assert_eq!(cfg.policy(), CachePolicy::Unbounded);
    }

    #[test]
    fn explicit_api_key_wins() {
        let cfg = TranslationConfig {
            api_key: Some("from-file".into()),
            ..TranslationConfig::default()
        };
        assert_eq!(cfg.resolved_api_key().as_deref(), Some("from-file"));
    }

    #[test]
    fn partial_section_keeps_field_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial-section.toml");
        std::fs::write(
            &path,
            "[translation]\napi_key = \"k\"\n\n[pipeline]\nobject_lane = false\n",
        )
        .expect("write");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.translation.api_key.as_deref(), Some("k"));
        assert_eq!(
            loaded.translation.base_url,
            TranslationConfig::default().base_url
        );
        assert_eq!(loaded.translation.target_language, "es");
        assert!(!loaded.pipeline.object_lane);
        assert!(loaded.pipeline.text_lane);
        assert_eq!(loaded.pipeline.translation_timeout_ms, 10_000);
    }

    // Only test touching API_KEY_ENV, so the env mutation cannot race.
    #[test]
    fn blank_file_key_falls_back_to_env() {
        let cfg = TranslationConfig {
            api_key: Some("   ".into()),
            ..TranslationConfig::default()
        };

        std::env::set_var(API_KEY_ENV, "from-env");
        assert_eq!(cfg.resolved_api_key().as_deref(), Some("from-env"));

        std::env::set_var(API_KEY_ENV, " ");
        assert!(cfg.resolved_api_key().is_none());

        std::env::remove_var(API_KEY_ENV);
        assert!(cfg.resolved_api_key().is_none());
    }
}
