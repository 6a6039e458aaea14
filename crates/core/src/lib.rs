//! Batch video object-detection pipeline.
//!
//! The pipeline watches an input storage location for uploaded videos,
//! runs object detection over their frames in batches, and commits two
//! artifacts per video: a JSON detection document (one array of records
//! per frame) and an annotated copy of the video with boxes and labels
//! drawn in. The detection document doubles as the completion marker,
//! so re-running the pipeline only processes uploads that have not been
//! committed yet.
//!
//! Media decode/encode and model inference are behind the capability
//! traits in [`capabilities`]; production adapters live in the decoder,
//! encoder and inference crates, and tests drive the pipeline with
//! scripted implementations.

pub mod batch;
pub mod capabilities;
pub mod config;
pub mod controller;
pub mod discovery;
pub mod document;
pub mod pipeline;

pub use batch::{FrameBatch, FrameBatcher};
pub use capabilities::{Detector, FrameSink, FrameSource, FrameStream, FrameStreamIter, FrameWriter};
pub use config::PipelineConfig;
pub use controller::{ControllerStatus, RunController, RunInProgress};
pub use discovery::{base_name, detection_key, pending_items, visual_key};
pub use document::{DetectionRecord, FrameResult, ResultAccumulator, VideoResultDocument};
pub use pipeline::{
    DetectionPipeline, FailedItem, ItemPhase, RunPhase, RunSummary, DETECTION_CONTENT_TYPE,
    VISUAL_CONTENT_TYPE,
};
