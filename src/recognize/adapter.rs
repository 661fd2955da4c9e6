//! Recognition model traits and the [`RecognitionAdapter`].
//!
//! [`TextRecognizer`] and [`ObjectDetector`] are the seams to the on-device
//! models.  They are object-safe and `Send + Sync` so they can be held
//! behind `Arc<dyn …>` and called from the blocking pool.
//!
//! [`RecognitionAdapter`] is what the pipeline calls.  It never fails: a
//! model error, a missing model or a panicked inference task all come back as
//! "nothing recognized".

use std::sync::Arc;

use thiserror::Error;

use crate::recognize::types::{Detection, Frame, FrameImage, RecognizedText};

// ---------------------------------------------------------------------------
// RecognitionError
// ---------------------------------------------------------------------------

/// Errors a model implementation may report.  The adapter logs and absorbs
/// them.
#[derive(Debug, Clone, Error)]
pub enum RecognitionError {
    /// The model could not be loaded or is not available on this device.
    #[error("recognition model unavailable: {0}")]
    ModelUnavailable(String),

    /// The inference pass failed.
    #[error("inference failed: {0}")]
    Inference(String),
}

// ---------------------------------------------------------------------------
// Model traits
// ---------------------------------------------------------------------------

/// Text recognition model.
pub trait TextRecognizer: Send + Sync {
    /// Return the best candidate string for every text region found in
    /// `image`, in reading order.
    fn recognize(&self, image: &FrameImage) -> Result<Vec<String>, RecognitionError>;
}

/// Object detection model.
pub trait ObjectDetector: Send + Sync {
    /// Return every labelled object found in `image`.  Order is the model's.
    fn detect(&self, image: &FrameImage) -> Result<Vec<Detection>, RecognitionError>;
}

// Compile-time assertion: both traits must be usable as trait objects.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn TextRecognizer>, _: Box<dyn ObjectDetector>) {}
};

// ---------------------------------------------------------------------------
// RecognitionAdapter
// ---------------------------------------------------------------------------

/// Uniform, infallible front for the two recognition capabilities.
///
/// Holds no per-frame state: each call takes the [`Frame`] by value, hands
/// it to the blocking pool and drops it as soon as the model returns.
#[derive(Clone, Default)]
pub struct RecognitionAdapter {
    text: Option<Arc<dyn TextRecognizer>>,
    objects: Option<Arc<dyn ObjectDetector>>,
}

impl RecognitionAdapter {
    /// An adapter with no models; every call recognizes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text_recognizer(mut self, recognizer: Arc<dyn TextRecognizer>) -> Self {
        self.text = Some(recognizer);
        self
    }

    pub fn with_object_detector(mut self, detector: Arc<dyn ObjectDetector>) -> Self {
        self.objects = Some(detector);
        self
    }

    pub fn has_text_recognizer(&self) -> bool {
        self.text.is_some()
    }

    pub fn has_object_detector(&self) -> bool {
        self.objects.is_some()
    }

    /// Read the text in `frame`.
    ///
    /// Region strings are trimmed and joined with a single space.  Returns
    /// `None` when the model finds no text, fails, or is not configured.
    pub async fn recognize_text(&self, frame: Frame) -> Option<RecognizedText> {
        let recognizer = Arc::clone(self.text.as_ref()?);

        let joined = tokio::task::spawn_blocking(move || recognizer.recognize(&frame.image)).await;

        match joined {
            Ok(Ok(regions)) => join_regions(regions),
            Ok(Err(e)) => {
                log::debug!("recognize: text recognition failed: {e}");
                None
            }
            Err(e) => {
                log::warn!("recognize: text recognition task failed: {e}");
                None
            }
        }
    }

    /// Detect objects in `frame`.
    ///
    /// Detections are returned unfiltered and in model order.  Returns an
    /// empty list when the model fails or is not configured.
    pub async fn detect_objects(&self, frame: Frame) -> Vec<Detection> {
        let Some(detector) = self.objects.as_ref().map(Arc::clone) else {
            return Vec::new();
        };

        let joined = tokio::task::spawn_blocking(move || detector.detect(&frame.image)).await;

        match joined {
            Ok(Ok(detections)) => detections,
            Ok(Err(e)) => {
                log::debug!("recognize: object detection failed: {e}");
                Vec::new()
            }
            Err(e) => {
                log::warn!("recognize: object detection task failed: {e}");
                Vec::new()
            }
        }
    }
}

fn join_regions(regions: Vec<String>) -> Option<RecognizedText> {
    let text = regions
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if text.is_empty() {
        None
    } else {
        Some(RecognizedText { text })
    }
}

// ---------------------------------------------------------------------------
// Test doubles  (test-only)
// ---------------------------------------------------------------------------

/// Text recognizer that returns a pre-configured response.
#[cfg(test)]
pub struct MockTextRecognizer {
    response: Result<Vec<String>, RecognitionError>,
}

#[cfg(test)]
impl MockTextRecognizer {
    pub fn ok(regions: &[&str]) -> Self {
        Self {
            response: Ok(regions.iter().map(|r| r.to_string()).collect()),
        }
    }

    pub fn failing() -> Self {
        Self {
            response: Err(RecognitionError::Inference("mock failure".into())),
        }
    }
}

#[cfg(test)]
impl TextRecognizer for MockTextRecognizer {
    fn recognize(&self, _image: &FrameImage) -> Result<Vec<String>, RecognitionError> {
        self.response.clone()
    }
}

/// Object detector that returns a pre-configured response.
#[cfg(test)]
pub struct MockObjectDetector {
    response: Result<Vec<Detection>, RecognitionError>,
}

#[cfg(test)]
impl MockObjectDetector {
    pub fn ok(detections: Vec<Detection>) -> Self {
        Self {
            response: Ok(detections),
        }
    }

    pub fn failing() -> Self {
        Self {
            response: Err(RecognitionError::ModelUnavailable("mock".into())),
        }
    }
}

#[cfg(test)]
impl ObjectDetector for MockObjectDetector {
    fn detect(&self, _image: &FrameImage) -> Result<Vec<Detection>, RecognitionError> {
        self.response.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognize::types::Region;
    use std::time::Duration;

    fn frame() -> Frame {
        Frame::new(FrameImage::new(2, 2, vec![0u8; 4]), Duration::ZERO)
    }

    #[tokio::test]
    async fn text_regions_are_joined_with_spaces() {
        let adapter = RecognitionAdapter::new()
            .with_text_recognizer(Arc::new(MockTextRecognizer::ok(&[" EXIT ", "", "Only"])));

        let text = adapter.recognize_text(frame()).await;

        assert_eq!(
            text,
            Some(RecognizedText {
                text: "EXIT Only".into()
            })
        );
    }

    #[tokio::test]
    async fn blank_regions_mean_no_text() {
        let adapter = RecognitionAdapter::new()
            .with_text_recognizer(Arc::new(MockTextRecognizer::ok(&["  ", "\n"])));

        assert!(adapter.recognize_text(frame()).await.is_none());
    }

    #[tokio::test]
    async fn text_model_failure_is_absorbed() {
        let adapter =
            RecognitionAdapter::new().with_text_recognizer(Arc::new(MockTextRecognizer::failing()));

        assert!(adapter.recognize_text(frame()).await.is_none());
    }

    #[tokio::test]
    async fn detections_are_not_filtered() {
        let detections = vec![
            Detection::new("cup", 0.05, Region::default()),
            Detection::new("cat", 0.92, Region::default()),
        ];
        let adapter = RecognitionAdapter::new()
            .with_object_detector(Arc::new(MockObjectDetector::ok(detections.clone())));

        assert_eq!(adapter.detect_objects(frame()).await, detections);
    }

    #[tokio::test]
    async fn detector_failure_is_absorbed() {
        let adapter =
            RecognitionAdapter::new().with_object_detector(Arc::new(MockObjectDetector::failing()));

        assert!(adapter.detect_objects(frame()).await.is_empty());
    }

    #[tokio::test]
    async fn missing_models_recognize_nothing() {
        let adapter = RecognitionAdapter::new();

        assert!(!adapter.has_text_recognizer());
        assert!(!adapter.has_object_detector());
        assert!(adapter.recognize_text(frame()).await.is_none());
        assert!(adapter.detect_objects(frame()).await.is_empty());
    }

    #[tokio::test]
    async fn panicking_model_is_absorbed() {
        struct Panics;
        impl TextRecognizer for Panics {
            fn recognize(&self, _image: &FrameImage) -> Result<Vec<String>, RecognitionError> {
                panic!("model crashed");
            }
        }

        let adapter = RecognitionAdapter::new().with_text_recognizer(Arc::new(Panics));
        assert!(adapter.recognize_text(frame()).await.is_none());
    }
}
