//! Foreground run command

use anyhow::{Context as _, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

use super::stack::{build_controller, PipelineArgs};

#[derive(Args)]
pub struct RunCommand {
    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Also write the run summary as JSON to this file
    #[arg(long, value_name = "FILE")]
    summary_out: Option<PathBuf>,
}

impl RunCommand {
    /// Executes one detection run to completion and prints its summary
    /// as JSON. Item failures are part of a normal summary; only a
    /// run-level abort (storage setup or listing) exits non-zero.
    pub async fn execute(self) -> Result<()> {
        let controller = build_controller(&self.pipeline)?;

        let summary = controller
            .run_blocking()
            .await
            .context("Failed to start the run")?;

        let json = serde_json::to_string_pretty(&summary)
            .context("Failed to serialize the run summary")?;
        if let Some(path) = &self.summary_out {
            std::fs::write(path, &json)
                .with_context(|| format!("Failed to write summary to {}", path.display()))?;
            info!("Summary written to {}", path.display());
        }
        println!("{json}");

        if let Some(error) = &summary.error {
            anyhow::bail!("Run aborted: {error}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        cmd: RunCommand,
    }

    #[test]
    fn summary_out_is_optional() {
        let harness = Harness::try_parse_from(["test"]).unwrap();
        assert!(harness.cmd.summary_out.is_none());

        let harness = Harness::try_parse_from(["test", "--summary-out", "out.json"]).unwrap();
        assert_eq!(harness.cmd.summary_out, Some(PathBuf::from("out.json")));
    }
}
