//! Helpers for driving a local microk8s cluster from integration tests.
//!
//! Every helper shells out to one of the `microk8s.*` snap wrappers and
//! either returns its output or polls it until the cluster reaches a state.
//!
//! ```no_run
//! # async fn run() -> anyhow::Result<()> {
//! use mk8s_harness::{HarnessConfig, Microk8s, PodStateQuery};
//!
//! let mk8s = Microk8s::new(HarnessConfig::load(None)?);
//! mk8s.enable("dns").await?;
//! mk8s.wait_for_pod_state(&PodStateQuery::by_label("k8s-app=kube-dns", "kube-system", "running"))
//!     .await?;
//! # Ok(())
//! # }
//! ```
pub mod config;
pub mod manifest;
pub mod microk8s;
pub mod utils;

pub use config::HarnessConfig;
pub use manifest::{update_yaml_with_arch, Arch};
pub use microk8s::{ContainerState, Microk8s, PodStateQuery};
pub use utils::{run_until_success, CommandError, RetryPolicy};
