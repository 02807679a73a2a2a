/// kubectl and docker through the microk8s snap wrappers
use anyhow::{Context, Result};
use std::time::Duration;

use crate::config::HarnessConfig;
use crate::utils::command::check_tool_installed;
use crate::utils::retry::RetryPolicy;

/// Helpers bound to one microk8s installation
#[derive(Debug, Clone)]
pub struct Microk8s {
    config: HarnessConfig,
}

impl Microk8s {
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Check that microk8s.kubectl can be run
    pub async fn check_installed(&self) -> Result<()> {
        check_tool_installed(
            &self.config.tool("kubectl").to_string_lossy(),
            &["version", "--client"],
            "Install the microk8s snap or set MICROK8S_BIN_DIR",
        )
        .await
    }

    pub(crate) fn retry_policy(&self, timeout: Duration) -> RetryPolicy {
        RetryPolicy::new(timeout).with_interval(self.config.timeouts.retry_interval())
    }

    /// `<bin_dir>/microk8s.<tool> <args>` as a command line
    pub(crate) fn tool_command(&self, tool: &str, args: &str) -> String {
        let program = self.config.tool(tool);
        if args.trim().is_empty() {
            program.display().to_string()
        } else {
            format!("{} {}", program.display(), args)
        }
    }

    /// Run `kubectl <cmd>` until it succeeds, returning its output
    pub async fn kubectl(&self, cmd: &str) -> Result<String> {
        self.kubectl_with_timeout(cmd, self.config.timeouts.kubectl())
            .await
    }

    pub async fn kubectl_with_timeout(&self, cmd: &str, timeout: Duration) -> Result<String> {
        self.retry_policy(timeout)
            .run_until_success(&self.tool_command("kubectl", cmd))
            .await
    }

    /// Run `docker <cmd>` until it succeeds, returning its output
    pub async fn docker(&self, cmd: &str) -> Result<String> {
        self.retry_policy(self.config.timeouts.command())
            .run_until_success(&self.tool_command("docker", cmd))
            .await
    }

    /// `kubectl get -o yaml <target>`, parsed
    pub async fn kubectl_get(&self, target: &str) -> Result<serde_yaml::Value> {
        self.kubectl_get_with_timeout(target, self.config.timeouts.kubectl())
            .await
    }

    pub async fn kubectl_get_with_timeout(
        &self,
        target: &str,
        timeout: Duration,
    ) -> Result<serde_yaml::Value> {
        let output = self
            .kubectl_with_timeout(&format!("get -o yaml {}", target), timeout)
            .await?;
        serde_yaml::from_str(&output)
            .with_context(|| format!("Failed to parse kubectl output for {}", target.trim()))
    }
}
