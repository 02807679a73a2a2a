/// Waiting for a fresh installation to come up
use anyhow::Result;
use serde_yaml::Value;
use tracing::info;

use super::Microk8s;
use crate::utils::polling::PollingConfig;

/// True once `kubectl get svc kubernetes` names the API service
pub fn is_kubernetes_service(service: &Value) -> bool {
    service
        .get("metadata")
        .and_then(|metadata| metadata.get("name"))
        .and_then(Value::as_str)
        .is_some_and(|name| name.contains("kubernetes"))
}

/// True if any row of `kubectl get no` reports Ready.
///
/// Matches " Ready" with its leading space so NotReady rows do not count.
pub fn any_node_ready(nodes: &str) -> bool {
    nodes.contains(" Ready")
}

impl Microk8s {
    /// Wait for the kubernetes service and a Ready node, then let the
    /// remaining services settle
    pub async fn wait_for_installation(&self) -> Result<()> {
        let timeouts = &self.config().timeouts;
        let this = self;

        PollingConfig::new(timeouts.wait(), timeouts.poll_interval(), "kubernetes service")
            .poll_until(move || async move {
                let service = this.kubectl_get("svc kubernetes").await?;
                Ok::<_, anyhow::Error>(is_kubernetes_service(&service))
            })
            .await?;

        PollingConfig::new(timeouts.wait(), timeouts.poll_interval(), "node to become Ready")
            .poll_until(move || async move {
                let nodes = this.kubectl("get no").await?;
                Ok::<_, anyhow::Error>(any_node_ready(&nodes))
            })
            .await?;

        if !timeouts.settle().is_zero() {
            info!(
                "Allowing {} seconds for the remaining services to start",
                timeouts.settle_secs
            );
            tokio::time::sleep(timeouts.settle()).await;
        }

        Ok(())
    }
}
