//! Pipeline tuning knobs.

use serde::{Deserialize, Serialize};

/// Default number of frames handed to the detector per batch.
pub const DEFAULT_BATCH_SIZE: usize = 8;

/// Default key prefix for annotated video outputs.
pub const DEFAULT_VISUAL_PREFIX: &str = "viz_";

/// Settings that shape a detection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Frames per detector batch. The final batch of a video may be
    /// smaller; values below 1 are treated as 1.
    pub batch_size: usize,
    /// Prefix prepended to the source file name to form the annotated
    /// video key, e.g. `a.mp4` -> `viz_a.mp4`.
    pub visual_prefix: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            visual_prefix: DEFAULT_VISUAL_PREFIX.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.visual_prefix, "viz_");
    }
}
