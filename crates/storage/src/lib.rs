//! Storage layer for the video detection pipeline
//!
//! The pipeline works against three named locations (buckets):
//! - **input**: uploaded videos waiting to be processed
//! - **results**: per-video detection documents; the presence of a document
//!   is what marks an input as already processed
//! - **annotated**: visually annotated copies of the input videos
//!
//! All access goes through the [`ObjectStore`] trait so the pipeline can run
//! against S3/MinIO in production and an in-memory store in tests.
//!
//! # Example
//!
//! ```rust,no_run
//! use video_detect_storage::{ObjectStore, S3Config, S3ObjectStore, StorageLocations};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = S3ObjectStore::new(S3Config::default())?;
//!     let locations = StorageLocations::default();
//!     locations.ensure_all(&store).await?;
//!
//!     let keys = store.list_keys(&locations.input).await?;
//!     println!("{} videos waiting", keys.len());
//!     Ok(())
//! }
//! ```

use thiserror::Error;
use video_detect_common::PipelineError;

pub mod memory;
pub mod object_store;

pub use memory::MemoryObjectStore;
pub use object_store::{ObjectStore, S3Config, S3ObjectStore};

/// Storage layer errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("S3 error: {0}")]
    S3Error(String),

    #[error("Bucket not available: {0}")]
    BucketUnavailable(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for PipelineError {
    fn from(err: StorageError) -> Self {
        PipelineError::Storage(err.to_string())
    }
}

/// The three locations one pipeline instance works against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLocations {
    /// Bucket holding uploaded input videos
    pub input: String,
    /// Bucket holding detection result documents
    pub results: String,
    /// Bucket holding annotated output videos
    pub annotated: String,
}

impl Default for StorageLocations {
    fn default() -> Self {
        Self {
            input: std::env::var("VIDEO_INPUT_BUCKET").unwrap_or_else(|_| "uploads".to_string()),
            results: std::env::var("VIDEO_RESULTS_BUCKET")
                .unwrap_or_else(|_| "detections".to_string()),
            annotated: std::env::var("VIDEO_ANNOTATED_BUCKET")
                .unwrap_or_else(|_| "annotated".to_string()),
        }
    }
}

impl StorageLocations {
    /// Create all three locations if they do not exist yet (idempotent)
    ///
    /// # Errors
    ///
    /// Returns an error if any location cannot be created or verified.
    pub async fn ensure_all(&self, store: &dyn ObjectStore) -> StorageResult<()> {
        store.ensure_bucket(&self.input).await?;
        store.ensure_bucket(&self.results).await?;
        store.ensure_bucket(&self.annotated).await?;
        Ok(())
    }
}
