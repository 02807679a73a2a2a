/// Addon toggling and cluster reset
use anyhow::{Context, Result};
use tracing::info;

use super::Microk8s;

impl Microk8s {
    /// Enable an addon, e.g. `dns` or `registry`
    pub async fn enable(&self, addon: &str) -> Result<String> {
        info!("Enabling addon {}", addon);
        self.retry_policy(self.config().timeouts.addon())
            .run_until_success(&self.tool_command("enable", addon))
            .await
            .with_context(|| format!("Failed to enable addon {}", addon))
    }

    /// Disable an addon
    pub async fn disable(&self, addon: &str) -> Result<String> {
        info!("Disabling addon {}", addon);
        self.retry_policy(self.config().timeouts.addon())
            .run_until_success(&self.tool_command("disable", addon))
            .await
            .with_context(|| format!("Failed to disable addon {}", addon))
    }

    /// Reset the cluster and wait for it to come back
    pub async fn reset(&self) -> Result<()> {
        info!("Resetting microk8s...");
        self.retry_policy(self.config().timeouts.addon())
            .run_until_success(&self.tool_command("reset", ""))
            .await
            .context("Failed to reset microk8s")?;

        self.wait_for_installation().await
    }
}
