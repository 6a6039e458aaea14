//! Shared types for the video detection pipeline
//!
//! This crate defines the frame and detection types that flow between the
//! decoder, the detector, the annotator, and the encoder, plus the error
//! type shared across all processing crates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while processing a video
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No video stream found in input")]
    NoVideoStream,

    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    #[error("Decode failed at frame {frame}: {reason}")]
    Decode { frame: u64, reason: String },

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Detector error: {0}")]
    Detector(String),

    #[error("Detector returned {got} result lists for a batch of {expected} frames")]
    BatchMismatch { expected: usize, got: usize },

    #[error("Frame result out of order: expected index {expected}, got {got}")]
    OutOfOrder { expected: u64, got: u64 },

    #[error("Annotation error: {0}")]
    Annotation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid frame data: {0}")]
    InvalidFrame(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using `PipelineError`
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Frame rate as an exact rational, carried through from the source stream
/// so the encoded output matches the input timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRate {
    /// Numerator (frames)
    pub num: i32,
    /// Denominator (seconds)
    pub den: i32,
}

impl FrameRate {
    /// Create a new frame rate; a zero denominator is normalized to 1
    #[must_use]
    pub fn new(num: i32, den: i32) -> Self {
        Self {
            num,
            den: if den == 0 { 1 } else { den },
        }
    }

    /// Frame rate as frames per second
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        if self.den == 0 {
            0.0
        } else {
            f64::from(self.num) / f64::from(self.den)
        }
    }
}

/// Stream metadata extracted when a video is opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Source frame rate
    pub frame_rate: FrameRate,
    /// Total frame count if the container reports one
    pub frame_count: Option<u64>,
}

/// Decoded video frame in RGB24 (row-major, 3 bytes per pixel)
#[derive(Debug, Clone)]
pub struct Frame {
    /// Zero-based index within the video's decoded stream
    pub frame_number: u64,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Raw RGB24 pixel data
    pub data: Vec<u8>,
}

impl Frame {
    /// Expected length of `data` for this frame's dimensions
    #[must_use]
    pub fn expected_data_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// Bounding box in pixel coordinates of the source frame
///
/// Coordinates are stored exactly as the detector produced them; callers that
/// draw or crop are responsible for clamping to the frame bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// X coordinate of the first corner
    pub x1: f32,
    /// Y coordinate of the first corner
    pub y1: f32,
    /// X coordinate of the second corner
    pub x2: f32,
    /// Y coordinate of the second corner
    pub y2: f32,
}

impl BoundingBox {
    /// Create a new bounding box
    #[must_use]
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Box width (zero if the corners are inverted)
    #[must_use]
    #[inline]
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    /// Box height (zero if the corners are inverted)
    #[must_use]
    #[inline]
    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    /// Get area of bounding box
    #[must_use]
    #[inline]
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Calculate Intersection over Union (`IoU`) with another box
    #[must_use]
    #[inline]
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        let intersection_width = (x2 - x1).max(0.0);
        let intersection_height = (y2 - y1).max(0.0);
        let intersection_area = intersection_width * intersection_height;

        let union_area = self.area() + other.area() - intersection_area;

        if union_area > 0.0 {
            intersection_area / union_area
        } else {
            0.0
        }
    }
}

/// A single detected object within one frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    /// Model class ID (COCO 0-79 for the bundled YOLO models)
    pub class_id: u32,
    /// Human-readable class name, used for annotation labels
    pub class_name: String,
    /// Confidence score (0-1)
    pub confidence: f32,
    /// Bounding box in source-frame pixel coordinates
    pub bbox: BoundingBox,
}
