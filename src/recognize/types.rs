//! Frame and recognition value types.

use std::sync::Arc;
use std::time::Duration;

/// Decoded image pixels.  Opaque to the pipeline; only recognizers look
/// inside.  Cloning shares the pixel buffer.
#[derive(Debug, Clone)]
pub struct FrameImage {
    pub width: u32,
    pub height: u32,
    /// Row-major pixel data in whatever layout the capture source and the
    /// recognizers agree on.
    pub pixels: Arc<[u8]>,
}

impl FrameImage {
    pub fn new(width: u32, height: u32, pixels: impl Into<Arc<[u8]>>) -> Self {
        Self {
            width,
            height,
            pixels: pixels.into(),
        }
    }
}

/// One captured frame.
///
/// `timestamp` is the capture time relative to the start of the capture
/// session and must not decrease between frames.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: FrameImage,
    pub timestamp: Duration,
}

impl Frame {
    pub fn new(image: FrameImage, timestamp: Duration) -> Self {
        Self { image, timestamp }
    }
}

/// Axis-aligned rectangle in normalized image coordinates (`0.0..=1.0`).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Region {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One labelled object found by the detector.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub label: String,
    /// Model confidence in `0.0..=1.0`.
    pub confidence: f32,
    pub region: Region,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32, region: Region) -> Self {
        Self {
            label: label.into(),
            confidence,
            region,
        }
    }
}

/// Text read from one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizedText {
    pub text: String,
}
