//! Object detection using `YOLOv8` via ONNX Runtime.
//!
//! Runs a `YOLOv8` model exported to ONNX over decoded RGB frames and
//! returns detections in source-frame pixel coordinates. Supports the
//! 80 COCO object classes with configurable confidence and `IoU`
//! thresholds, class filtering, and non-maximum suppression (NMS).
//!
//! [`YoloDetector`] implements the pipeline's [`Detector`] trait, so a
//! loaded model can be dropped straight into a run.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use image::{ImageBuffer, Rgb};
use ndarray::Array;
use ort::{session::Session, value::TensorRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use video_detect_common::{BoundingBox, Detection, Frame, PipelineError};
use video_detect_core::Detector;

/// Configuration for the `YOLOv8` detector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoloConfig {
    /// Path to the ONNX model file
    pub model_path: PathBuf,
    /// Minimum confidence threshold for detections (0.0-1.0)
    pub confidence_threshold: f32,
    /// `IoU` threshold for non-maximum suppression (0.0-1.0)
    pub iou_threshold: f32,
    /// Filter detections to specific COCO class IDs (None = all classes)
    pub classes: Option<Vec<u32>>,
    /// Maximum number of detections to return per frame
    pub max_detections: usize,
    /// Model input size (`YOLOv8` default is 640x640)
    pub input_size: u32,
}

impl Default for YoloConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("yolov8n.onnx"),
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
            classes: None,
            max_detections: 300,
            input_size: 640,
        }
    }
}

impl YoloConfig {
    /// Config pointing at a specific model file, defaults otherwise
    #[must_use]
    pub fn with_model<P: AsRef<Path>>(model_path: P) -> Self {
        Self {
            model_path: model_path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }
}

/// Error types for object detection
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("ONNX Runtime error: {0}")]
    OnnxRuntime(#[from] ort::Error),
}

impl From<DetectError> for PipelineError {
    fn from(err: DetectError) -> Self {
        PipelineError::Detector(err.to_string())
    }
}

/// `YOLOv8` object detector over an ONNX Runtime session.
///
/// The session is behind a mutex because ONNX Runtime requires `&mut`
/// for inference; batches lock it once and run their frames in order.
pub struct YoloDetector {
    session: Mutex<Session>,
    config: YoloConfig,
}

impl YoloDetector {
    /// Load the ONNX model named by the config.
    pub fn new(config: YoloConfig) -> Result<Self, DetectError> {
        info!("Loading YOLOv8 model from {:?}", config.model_path);

        let session = Session::builder()
            .map_err(|e| DetectError::ModelLoad(e.to_string()))?
            .commit_from_file(&config.model_path)
            .map_err(|e| DetectError::ModelLoad(e.to_string()))?;

        info!("YOLOv8 model loaded successfully");

        Ok(Self {
            session: Mutex::new(session),
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &YoloConfig {
        &self.config
    }
}

impl Detector for YoloDetector {
    fn detect_batch(&self, frames: &[Frame]) -> video_detect_common::Result<Vec<Vec<Detection>>> {
        let mut session = self
            .session
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let mut results = Vec::with_capacity(frames.len());
        for frame in frames {
            let detections = detect_frame(&mut session, frame, &self.config)?;
            debug!(
                "Frame {}: {} detections",
                frame.frame_number,
                detections.len()
            );
            results.push(detections);
        }
        Ok(results)
    }
}

/// Run one frame through the model.
fn detect_frame(
    session: &mut Session,
    frame: &Frame,
    config: &YoloConfig,
) -> Result<Vec<Detection>, DetectError> {
    let image: ImageBuffer<Rgb<u8>, &[u8]> =
        ImageBuffer::from_raw(frame.width, frame.height, frame.data.as_slice()).ok_or_else(
            || {
                DetectError::ImageProcessing(format!(
                    "Frame {} data does not match its dimensions",
                    frame.frame_number
                ))
            },
        )?;

    let input = preprocess(&image, config.input_size);

    // Zero-copy tensor: use view instead of clone
    let input_tensor = TensorRef::from_array_view(input.view())
        .map_err(|e| DetectError::Inference(e.to_string()))?;
    let outputs = session
        .run(ort::inputs![input_tensor])
        .map_err(|e| DetectError::Inference(e.to_string()))?;

    let output = &outputs[0];
    let (shape, data) = output
        .try_extract_tensor::<f32>()
        .map_err(|e| DetectError::Inference(format!("Failed to extract tensor: {e}")))?;

    postprocess(shape.as_ref(), data, config, frame.width, frame.height)
}

/// Preprocess a frame to `YOLOv8` input format (1, 3, H, W) normalized to [0, 1]
fn preprocess<C>(
    image: &ImageBuffer<Rgb<u8>, C>,
    input_size: u32,
) -> Array<f32, ndarray::Dim<[usize; 4]>>
where
    C: std::ops::Deref<Target = [u8]>,
{
    let resized = image::imageops::resize(
        image,
        input_size,
        input_size,
        image::imageops::FilterType::Triangle,
    );

    // Convert to CHW format and normalize to [0, 1]
    let mut input_array = Array::zeros((1, 3, input_size as usize, input_size as usize));

    for y in 0..input_size as usize {
        for x in 0..input_size as usize {
            let pixel = resized.get_pixel(x as u32, y as u32);
            input_array[[0, 0, y, x]] = f32::from(pixel[0]) / 255.0;
            input_array[[0, 1, y, x]] = f32::from(pixel[1]) / 255.0;
            input_array[[0, 2, y, x]] = f32::from(pixel[2]) / 255.0;
        }
    }

    input_array
}

/// Post-process raw model output into pixel-space detections.
///
/// `YOLOv8` output shape is (1, 4 + classes, anchors): features 0-3 are
/// the box center/size in model input pixels, the rest are per-class
/// probabilities. Boxes are converted to corner format and scaled back
/// to the source frame's resolution.
fn postprocess(
    dims: &[i64],
    data: &[f32],
    config: &YoloConfig,
    frame_width: u32,
    frame_height: u32,
) -> Result<Vec<Detection>, DetectError> {
    if dims.len() != 3 {
        return Err(DetectError::Inference(format!(
            "Expected 3D output tensor, got {}D",
            dims.len()
        )));
    }

    let num_features = dims[1] as usize;
    let num_anchors = dims[2] as usize;
    if num_features < 5 {
        return Err(DetectError::Inference(format!(
            "Output tensor has {num_features} features per anchor, need at least 5"
        )));
    }
    let num_classes = num_features - 4;

    let x_scale = frame_width as f32 / config.input_size as f32;
    let y_scale = frame_height as f32 / config.input_size as f32;

    // Pre-allocate for ~10% of anchors passing the confidence threshold
    let mut raw_detections = Vec::with_capacity(num_anchors / 10);

    for anchor_idx in 0..num_anchors {
        // Data layout is [batch, features, anchors], so anchor i's value
        // for feature f sits at data[f * num_anchors + i]
        let get_feature = |feature_idx: usize| data[feature_idx * num_anchors + anchor_idx];

        let x_center = get_feature(0);
        let y_center = get_feature(1);
        let width = get_feature(2);
        let height = get_feature(3);

        // Find class with highest probability
        let mut max_prob = 0.0f32;
        let mut max_class_id = 0usize;
        for class_id in 0..num_classes {
            let prob = get_feature(4 + class_id);
            if prob > max_prob {
                max_prob = prob;
                max_class_id = class_id;
            }
        }

        let confidence = max_prob;
        if confidence < config.confidence_threshold {
            continue;
        }

        let class_id = max_class_id as u32;
        if let Some(ref classes) = config.classes {
            if !classes.contains(&class_id) {
                continue;
            }
        }

        // Center format in model input pixels -> corner format in
        // source frame pixels
        let bbox = BoundingBox::new(
            (x_center - width / 2.0) * x_scale,
            (y_center - height / 2.0) * y_scale,
            (x_center + width / 2.0) * x_scale,
            (y_center + height / 2.0) * y_scale,
        );

        raw_detections.push(Detection {
            class_id,
            class_name: coco_class_name(class_id).to_string(),
            confidence,
            bbox,
        });
    }

    debug!("Raw detections before NMS: {}", raw_detections.len());

    let detections = apply_nms(raw_detections, config);
    Ok(detections
        .into_iter()
        .take(config.max_detections)
        .collect())
}

/// Apply non-maximum suppression to remove duplicate detections
fn apply_nms(mut detections: Vec<Detection>, config: &YoloConfig) -> Vec<Detection> {
    // Sort by confidence (highest first)
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::with_capacity(detections.len());

    while !detections.is_empty() {
        // swap_remove(0) is O(1); order no longer matters once the best
        // detection has been taken
        let current = detections.swap_remove(0);

        detections.retain(|det| {
            det.class_id != current.class_id || det.bbox.iou(&current.bbox) < config.iou_threshold
        });

        keep.push(current);
    }

    debug!("Detections after NMS: {}", keep.len());
    keep
}

/// Get COCO class name from class ID (0-79)
#[must_use]
pub fn coco_class_name(class_id: u32) -> &'static str {
    COCO_CLASSES.get(class_id as usize).unwrap_or(&"unknown")
}

/// 80 COCO object classes (in order)
pub const COCO_CLASSES: &[&str] = &[
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];
