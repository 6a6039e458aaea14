//! Production pipeline assembly shared by `run` and `serve`.
//!
//! Builds the full capability stack from CLI flags and the environment:
//! S3/MinIO storage, the FFmpeg decoder and encoder, the YOLOv8 detector
//! and the overlay annotator, wired into a [`RunController`]. Detector
//! and storage construction failures surface here, at startup, rather
//! than mid-run.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Args;
use tracing::info;

use video_detect_annotation::{AnnotationStyle, Annotator};
use video_detect_api_server::ApiState;
use video_detect_core::{
    config::{DEFAULT_BATCH_SIZE, DEFAULT_VISUAL_PREFIX},
    DetectionPipeline, PipelineConfig, RunController,
};
use video_detect_decoder::FfmpegFrameSource;
use video_detect_encoder::Mp4FrameSink;
use video_detect_inference::{YoloConfig, YoloDetector};
use video_detect_storage::{S3Config, S3ObjectStore, StorageLocations};

/// Pipeline and detector flags shared by `run` and `serve`.
///
/// Storage connection settings stay environment-driven (see `--help` on
/// the top-level command); these flags override the processing defaults.
#[derive(Args, Debug)]
pub struct PipelineArgs {
    /// Frames per detector batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Key prefix for annotated output videos
    #[arg(long, default_value = DEFAULT_VISUAL_PREFIX)]
    pub visual_prefix: String,

    /// Path to the YOLOv8 ONNX model
    #[arg(long, default_value = "yolov8n.onnx", value_name = "FILE")]
    pub model: PathBuf,

    /// Minimum detection confidence (0.0-1.0)
    #[arg(long, default_value_t = 0.25)]
    pub confidence: f32,

    /// IoU threshold for non-maximum suppression (0.0-1.0)
    #[arg(long, default_value_t = 0.45)]
    pub iou: f32,

    /// Maximum detections kept per frame
    #[arg(long, default_value_t = 300)]
    pub max_detections: usize,

    /// Model input size in pixels (square)
    #[arg(long, default_value_t = 640)]
    pub input_size: u32,

    /// Only keep these COCO class IDs, e.g. `--classes 0,2,7`
    #[arg(long, value_delimiter = ',', value_name = "ID")]
    pub classes: Option<Vec<u32>>,
}

impl PipelineArgs {
    fn yolo_config(&self) -> YoloConfig {
        YoloConfig {
            model_path: self.model.clone(),
            confidence_threshold: self.confidence,
            iou_threshold: self.iou,
            classes: self.classes.clone(),
            max_detections: self.max_detections,
            input_size: self.input_size,
        }
    }

    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            batch_size: self.batch_size,
            visual_prefix: self.visual_prefix.clone(),
        }
    }
}

/// Builds the run controller over the production adapters.
pub fn build_controller(args: &PipelineArgs) -> Result<RunController> {
    let store = S3ObjectStore::new(S3Config::default())
        .context("Failed to create the object storage client")?;
    let locations = StorageLocations::default();
    info!(
        "Storage locations: input={}, results={}, annotated={}",
        locations.input, locations.results, locations.annotated
    );

    let detector = YoloDetector::new(args.yolo_config()).with_context(|| {
        format!(
            "Failed to load detection model from {}",
            args.model.display()
        )
    })?;

    let pipeline = DetectionPipeline::new(
        Arc::new(store),
        locations,
        Arc::new(FfmpegFrameSource),
        Arc::new(detector),
        Arc::new(Mp4FrameSink::default()),
        Annotator::new(AnnotationStyle::default()),
        args.pipeline_config(),
    );
    Ok(RunController::new(Arc::new(pipeline)))
}

/// Builds the HTTP server state over the production adapters.
pub fn build_api_state(args: &PipelineArgs) -> Result<ApiState> {
    Ok(ApiState::new(build_controller(args)?))
}
