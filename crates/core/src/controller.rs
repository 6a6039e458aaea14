//! Single-flight run control.
//!
//! Triggers are fire-and-forget: [`RunController::try_start`] either
//! spawns a background run and returns its id immediately, or rejects
//! because a run is already in flight. At most one run executes at a
//! time per controller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::pipeline::{DetectionPipeline, RunPhase, RunSummary};

/// Returned when a trigger arrives while a run is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("a detection run is already in progress")]
pub struct RunInProgress;

/// Snapshot of the controller for the status API.
#[derive(Debug, Clone, Serialize)]
pub struct ControllerStatus {
    pub running: bool,
    pub phase: RunPhase,
    pub last_run: Option<RunSummary>,
}

#[derive(Default)]
struct RunState {
    running: AtomicBool,
    last_run: RwLock<Option<RunSummary>>,
}

impl RunState {
    fn acquire(&self) -> Result<(), RunInProgress> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|_| RunInProgress)
    }

    async fn release(&self, summary: RunSummary) {
        *self.last_run.write().await = Some(summary);
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Cheaply cloneable handle; clones share the same in-flight flag.
#[derive(Clone)]
pub struct RunController {
    pipeline: Arc<DetectionPipeline>,
    state: Arc<RunState>,
}

impl RunController {
    pub fn new(pipeline: Arc<DetectionPipeline>) -> Self {
        Self {
            pipeline,
            state: Arc::new(RunState::default()),
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    /// Starts a run on a background task and returns its id without
    /// waiting for completion.
    pub fn try_start(&self) -> Result<Uuid, RunInProgress> {
        self.state.acquire()?;

        let run_id = Uuid::new_v4();
        let pipeline = Arc::clone(&self.pipeline);
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let summary = pipeline.run(run_id).await;
            state.release(summary).await;
        });
        info!("Run {run_id} accepted");
        Ok(run_id)
    }

    /// Runs to completion on the current task. Used by the CLI, guarded
    /// by the same in-flight flag as [`Self::try_start`].
    pub async fn run_blocking(&self) -> Result<RunSummary, RunInProgress> {
        self.state.acquire()?;

        let summary = self.pipeline.run(Uuid::new_v4()).await;
        self.state.release(summary.clone()).await;
        Ok(summary)
    }

    pub async fn status(&self) -> ControllerStatus {
        ControllerStatus {
            running: self.is_running(),
            phase: self.pipeline.current_phase().await,
            last_run: self.state.last_run.read().await.clone(),
        }
    }
}
