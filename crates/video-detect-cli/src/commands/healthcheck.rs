//! Health probe command

use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Args;

#[derive(Args)]
pub struct HealthcheckCommand {
    /// Base URL of the running service
    #[arg(long, default_value = "http://localhost:8080")]
    url: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 5)]
    timeout: u64,
}

impl HealthcheckCommand {
    /// Probes `<url>/health` and exits non-zero unless the service
    /// answers 200 with `status: ok`. Suitable as a container
    /// healthcheck command.
    pub async fn execute(self) -> Result<()> {
        let endpoint = format!("{}/health", self.url.trim_end_matches('/'));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout))
            .build()
            .context("Failed to build HTTP client")?;

        let response = client
            .get(&endpoint)
            .send()
            .await
            .with_context(|| format!("Failed to reach {endpoint}"))?;
        anyhow::ensure!(
            response.status().is_success(),
            "Service answered HTTP {}",
            response.status()
        );

        let body: serde_json::Value = response
            .json()
            .await
            .context("Health response was not JSON")?;
        anyhow::ensure!(
            body["status"] == "ok",
            "Service reported status {}",
            body["status"]
        );

        println!("ok");
        Ok(())
    }
}
