//! HTTP server command

use anyhow::{Context as _, Result};
use clap::Args;

use video_detect_api_server::start_server;

use super::stack::{build_api_state, PipelineArgs};

#[derive(Args)]
pub struct ServeCommand {
    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

impl ServeCommand {
    /// Builds the production stack once at startup and serves the
    /// trigger/status endpoints until interrupted.
    pub async fn execute(self) -> Result<()> {
        let state = build_api_state(&self.pipeline)?;
        let addr = format!("{}:{}", self.host, self.port);

        start_server(&addr, state)
            .await
            .with_context(|| format!("API server failed on {addr}"))
    }
}
