//! The detection run state machine.
//!
//! A run walks Idle -> EnsuringLocations -> Discovering ->
//! ProcessingItems -> Done, with Failed reserved for errors that abort
//! the whole run (storage setup and listing). Each discovered item then
//! moves through Fetching -> Detecting -> Committing on its own; an
//! item failure is recorded in the summary and the run moves on to the
//! next item.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error, info};
use uuid::Uuid;

use video_detect_annotation::Annotator;
use video_detect_common::PipelineError;
use video_detect_storage::{ObjectStore, StorageLocations};

use crate::batch::FrameBatcher;
use crate::capabilities::{Detector, FrameSink, FrameSource, FrameStreamIter};
use crate::config::PipelineConfig;
use crate::discovery;
use crate::document::ResultAccumulator;

/// Content type of committed detection documents.
pub const DETECTION_CONTENT_TYPE: &str = "application/json";

/// Content type of committed annotated videos.
pub const VISUAL_CONTENT_TYPE: &str = "video/mp4";

/// Run-level phase, visible through the status API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    EnsuringLocations,
    Discovering,
    ProcessingItems,
    Done,
    Failed,
}

/// Phase an individual item was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemPhase {
    Fetching,
    Detecting,
    Committing,
}

/// A per-item failure, kept in the run summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedItem {
    pub key: String,
    pub phase: ItemPhase,
    pub error: String,
}

/// Outcome of a completed (or aborted) run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Input keys fully committed during this run.
    pub succeeded: Vec<String>,
    /// Input keys that failed, with the phase and error.
    pub failed: Vec<FailedItem>,
    /// Input keys whose detection document already existed.
    pub skipped: Vec<String>,
    /// Set only when the run itself aborted before processing items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunSummary {
    /// True when the run aborted without reaching item processing.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.error.is_some()
    }
}

/// Batch object-detection pipeline over three storage locations.
///
/// All media and inference work goes through the injected capability
/// traits; the pipeline itself only sequences them and talks to storage.
pub struct DetectionPipeline {
    store: Arc<dyn ObjectStore>,
    locations: StorageLocations,
    source: Arc<dyn FrameSource>,
    detector: Arc<dyn Detector>,
    sink: Arc<dyn FrameSink>,
    annotator: Annotator,
    config: PipelineConfig,
    phase: RwLock<RunPhase>,
}

impl DetectionPipeline {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        locations: StorageLocations,
        source: Arc<dyn FrameSource>,
        detector: Arc<dyn Detector>,
        sink: Arc<dyn FrameSink>,
        annotator: Annotator,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            locations,
            source,
            detector,
            sink,
            annotator,
            config,
            phase: RwLock::new(RunPhase::Idle),
        }
    }

    pub async fn current_phase(&self) -> RunPhase {
        *self.phase.read().await
    }

    async fn set_phase(&self, phase: RunPhase) {
        *self.phase.write().await = phase;
    }

    /// Executes one full run. Item failures are captured in the summary;
    /// only storage setup and listing abort the run as a whole.
    pub async fn run(&self, run_id: Uuid) -> RunSummary {
        let started_at = Utc::now();
        info!("Run {run_id} started");

        self.set_phase(RunPhase::EnsuringLocations).await;
        if let Err(error) = self.locations.ensure_all(self.store.as_ref()).await {
            return self.fail_run(run_id, started_at, error.into()).await;
        }

        self.set_phase(RunPhase::Discovering).await;
        let input_keys = match self.store.list_keys(&self.locations.input).await {
            Ok(keys) => keys,
            Err(error) => return self.fail_run(run_id, started_at, error.into()).await,
        };
        let result_keys = match self.store.list_keys(&self.locations.results).await {
            Ok(keys) => keys,
            Err(error) => return self.fail_run(run_id, started_at, error.into()).await,
        };

        let pending = discovery::pending_items(&input_keys, &result_keys);
        let mut skipped: Vec<String> = input_keys
            .iter()
            .filter(|key| !pending.contains(key))
            .cloned()
            .collect();
        skipped.sort();
        info!(
            "Discovered {} uploads: {} to process, {} already done",
            input_keys.len(),
            pending.len(),
            skipped.len()
        );

        self.set_phase(RunPhase::ProcessingItems).await;
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        for key in pending {
            match self.process_item(&key).await {
                Ok(()) => succeeded.push(key),
                Err((phase, error)) => {
                    error!("Item {key} failed while {phase:?}: {error}");
                    failed.push(FailedItem {
                        key,
                        phase,
                        error: error.to_string(),
                    });
                }
            }
        }

        self.set_phase(RunPhase::Done).await;
        let summary = RunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            succeeded,
            failed,
            skipped,
            error: None,
        };
        info!(
            "Run {run_id} finished: {} succeeded, {} failed, {} skipped",
            summary.succeeded.len(),
            summary.failed.len(),
            summary.skipped.len()
        );
        summary
    }

    async fn fail_run(
        &self,
        run_id: Uuid,
        started_at: DateTime<Utc>,
        error: PipelineError,
    ) -> RunSummary {
        self.set_phase(RunPhase::Failed).await;
        error!("Run {run_id} aborted: {error}");
        RunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            succeeded: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    /// Processes one uploaded video end to end.
    ///
    /// Commit order is fixed: the annotated video is uploaded first and
    /// the detection document last, because the document is the
    /// completion marker discovery diffs against.
    async fn process_item(&self, key: &str) -> Result<(), (ItemPhase, PipelineError)> {
        debug!("Item {key}: fetching");
        let scratch = tempfile::tempdir().map_err(|e| (ItemPhase::Fetching, e.into()))?;
        let bytes = self
            .store
            .get_object(&self.locations.input, key)
            .await
            .map_err(|e| (ItemPhase::Fetching, e.into()))?;
        let input_path = scratch.path().join(item_file_name(key));
        tokio::fs::write(&input_path, &bytes)
            .await
            .map_err(|e| (ItemPhase::Fetching, e.into()))?;

        debug!("Item {key}: decoding and detecting");
        let stream = self
            .source
            .open(&input_path)
            .map_err(|e| (ItemPhase::Detecting, e))?;
        let metadata = stream.metadata().clone();
        let output_path = scratch.path().join("annotated.mp4");
        let mut writer = self
            .sink
            .create(&output_path, &metadata)
            .map_err(|e| (ItemPhase::Detecting, e))?;

        let mut accumulator = ResultAccumulator::new();
        let batcher = FrameBatcher::new(FrameStreamIter::new(stream), self.config.batch_size);
        for batch in batcher {
            let batch = batch.map_err(|e| (ItemPhase::Detecting, e))?;
            debug!(
                "Item {key}: batch at frame {} ({} frames)",
                batch.start_index,
                batch.len()
            );

            let detections = self
                .detector
                .detect_batch(&batch.frames)
                .map_err(|e| (ItemPhase::Detecting, e))?;
            if detections.len() != batch.frames.len() {
                return Err((
                    ItemPhase::Detecting,
                    PipelineError::BatchMismatch {
                        expected: batch.frames.len(),
                        got: detections.len(),
                    },
                ));
            }

            // Document entries are recorded before drawing mutates the frames.
            for (frame, frame_detections) in batch.frames.iter().zip(&detections) {
                accumulator
                    .push_frame(frame.frame_number, frame_detections)
                    .map_err(|e| (ItemPhase::Detecting, e))?;
            }

            let mut frames = batch.frames;
            for (frame, frame_detections) in frames.iter_mut().zip(&detections) {
                self.annotator
                    .annotate(frame, frame_detections)
                    .map_err(|e| (ItemPhase::Detecting, e.into()))?;
                writer
                    .write_frame(frame)
                    .map_err(|e| (ItemPhase::Detecting, e))?;
            }
        }

        debug!("Item {key}: committing");
        writer.finish().map_err(|e| (ItemPhase::Committing, e))?;
        drop(writer);

        let annotated = tokio::fs::read(&output_path)
            .await
            .map_err(|e| (ItemPhase::Committing, e.into()))?;
        let visual_key = discovery::visual_key(&self.config.visual_prefix, key);
        self.store
            .put_object(
                &self.locations.annotated,
                &visual_key,
                &annotated,
                VISUAL_CONTENT_TYPE,
            )
            .await
            .map_err(|e| (ItemPhase::Committing, e.into()))?;

        let document = accumulator.into_document();
        let body = document
            .to_json_bytes()
            .map_err(|e| (ItemPhase::Committing, e))?;
        let detection_key = discovery::detection_key(key);
        self.store
            .put_object(
                &self.locations.results,
                &detection_key,
                &body,
                DETECTION_CONTENT_TYPE,
            )
            .await
            .map_err(|e| (ItemPhase::Committing, e.into()))?;

        info!(
            "Item {key} committed: {} frames, document at {detection_key}",
            document.frame_count()
        );
        Ok(())
    }
}

/// File name used for the fetched copy inside the scratch directory.
/// Keeping the original name preserves the container extension hint.
fn item_file_name(key: &str) -> &str {
    Path::new(key)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("input.bin")
}
