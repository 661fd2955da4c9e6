//! The value a lane publishes.

use crate::pipeline::state::Lane;

/// Latest completed translation of one lane.
///
/// Always replaced as a whole; observers never see a half-updated value.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineResult {
    /// Object lane: the top detection's label and its translation.
    Object {
        label: String,
        translation: String,
        confidence: f32,
    },
    /// Text lane: the recognized text and its translation.
    Text {
        original_text: String,
        translation: String,
    },
}

impl PipelineResult {
    /// The translated text, whichever lane produced it.
    pub fn translation(&self) -> &str {
        match self {
            PipelineResult::Object { translation, .. } | PipelineResult::Text { translation, .. } => {
                translation
            }
        }
    }

    /// The untranslated input: a detection label or the recognized text.
    pub fn source(&self) -> &str {
        match self {
            PipelineResult::Object { label, .. } => label,
            PipelineResult::Text { original_text, .. } => original_text,
        }
    }

    pub fn lane(&self) -> Lane {
        match self {
            PipelineResult::Object { .. } => Lane::Object,
            PipelineResult::Text { .. } => Lane::Text,
        }
    }
}
