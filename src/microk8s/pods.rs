/// Waiting for pods to reach a container state
use anyhow::Result;
use serde_yaml::Value;

use super::Microk8s;
use crate::utils::polling::PollingConfig;

/// Pod state to wait for.
///
/// With an empty `pod` name the `label` selects the pods and only the first
/// one listed is inspected.
#[derive(Debug, Clone, Default)]
pub struct PodStateQuery {
    pub pod: String,
    pub namespace: String,
    /// `running`, `waiting` or `terminated`
    pub desired_state: String,
    /// e.g. `Completed` or `CrashLoopBackOff`
    pub desired_reason: Option<String>,
    pub label: Option<String>,
}

impl PodStateQuery {
    pub fn new(
        pod: impl Into<String>,
        namespace: impl Into<String>,
        desired_state: impl Into<String>,
    ) -> Self {
        Self {
            pod: pod.into(),
            namespace: namespace.into(),
            desired_state: desired_state.into(),
            ..Self::default()
        }
    }

    /// Match the first pod carrying `label` in `namespace`
    pub fn by_label(
        label: impl Into<String>,
        namespace: impl Into<String>,
        desired_state: impl Into<String>,
    ) -> Self {
        Self::new("", namespace, desired_state).with_label(label)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.desired_reason = Some(reason.into());
        self
    }

    /// Required reason, if any; an empty reason requires none
    fn required_reason(&self) -> Option<&str> {
        self.desired_reason.as_deref().filter(|reason| !reason.is_empty())
    }

    /// Argument of `kubectl get` for this query
    pub fn target(&self) -> String {
        let mut target = format!("po {} -n {}", self.pod, self.namespace);
        if let Some(label) = &self.label {
            target.push_str(" -l ");
            target.push_str(label);
        }
        target
    }

    /// Observed state if it is the desired one
    pub fn check(&self, document: &Value) -> Option<ContainerState> {
        let observed = ContainerState::from_document(document, self.pod.is_empty())?;
        let reached = observed.state == self.desired_state
            && match self.required_reason() {
                Some(reason) => observed.reason.as_deref() == Some(reason),
                None => true,
            };
        reached.then_some(observed)
    }

    fn describe(&self) -> String {
        let pod = if self.pod.is_empty() {
            format!("pod labelled {}", self.label.as_deref().unwrap_or("<any>"))
        } else {
            format!("pod {}", self.pod)
        };
        match self.required_reason() {
            Some(reason) => format!(
                "{} in {} to be {} ({})",
                pod, self.namespace, self.desired_state, reason
            ),
            None => format!("{} in {} to be {}", pod, self.namespace, self.desired_state),
        }
    }
}

/// State of a pod's first container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerState {
    pub state: String,
    pub reason: Option<String>,
}

impl ContainerState {
    /// Read the first container state from `kubectl get -o yaml` output.
    ///
    /// `listed` selects the first entry of a `List` document rather than a
    /// single pod. Returns None while the pod has no container statuses.
    pub fn from_document(document: &Value, listed: bool) -> Option<Self> {
        let pod = if listed {
            document.get("items")?.as_sequence()?.first()?
        } else {
            document
        };
        let container = pod
            .get("status")?
            .get("containerStatuses")?
            .as_sequence()?
            .first()?;
        let (state, details) = container.get("state")?.as_mapping()?.iter().next()?;

        Some(Self {
            state: state.as_str()?.to_string(),
            reason: details
                .get("reason")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}

impl Microk8s {
    /// Poll until the pod's first container reaches the desired state
    pub async fn wait_for_pod_state(&self, query: &PodStateQuery) -> Result<ContainerState> {
        let timeouts = &self.config().timeouts;
        let target = query.target();
        let target = target.as_str();
        let this = self;

        PollingConfig::new(timeouts.wait(), timeouts.poll_interval(), query.describe())
            .poll(move || async move {
                let document = this.kubectl_get(target).await?;
                Ok::<_, anyhow::Error>(query.check(&document))
            })
            .await
    }
}
