//! Runtime-selectable target language.

use std::sync::{Arc, PoisonError, RwLock};

/// Shared handle to the language results are translated into.
///
/// Cheap to clone; every clone sees the same value.  Changing it affects the
/// next translation each lane starts.  Cached translations stay valid
/// because the cache key includes the target language.
#[derive(Debug, Clone)]
pub struct TargetLanguage(Arc<RwLock<String>>);

impl TargetLanguage {
    pub fn new(code: impl Into<String>) -> Self {
        Self(Arc::new(RwLock::new(code.into())))
    }

    pub fn get(&self) -> String {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set(&self, code: impl Into<String>) {
        let code = code.into();
        log::info!("pipeline: target language set to {code}");
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = code;
    }
}
