#![cfg(unix)]
//! Helper behaviour against fake microk8s.* wrappers.
//!
//! Each test writes shell scripts named like the snap wrappers into a temp
//! directory and points `bin_dir` at it. The last test needs a real microk8s
//! snap and is ignored by default:
//!
//! ```sh
//! cargo test --test microk8s -- --ignored
//! ```

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::Duration;

use mk8s_harness::config::TimeoutConfig;
use mk8s_harness::{CommandError, HarnessConfig, Microk8s, PodStateQuery};
use tempfile::TempDir;

/// Temp bin_dir holding fake wrappers
struct FakeSnap {
    dir: TempDir,
}

impl FakeSnap {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Install `microk8s.<tool>` with the given shell body
    fn tool(&self, tool: &str, body: &str) -> &Self {
        let path = self.path().join(format!("microk8s.{}", tool));
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        self
    }

    fn microk8s(&self) -> Microk8s {
        Microk8s::new(HarnessConfig {
            bin_dir: self.path().to_path_buf(),
            timeouts: TimeoutConfig {
                command_secs: 5,
                kubectl_secs: 5,
                addon_secs: 5,
                retry_interval_secs: 1,
                poll_interval_secs: 1,
                settle_secs: 0,
                wait_secs: 20,
            },
        })
    }
}

#[tokio::test]
async fn kubectl_passes_arguments_through() {
    let snap = FakeSnap::new();
    snap.tool("kubectl", r#"echo "kubectl $*""#);

    let out = snap.microk8s().kubectl("get po -n kube-system").await.unwrap();
    assert_eq!(out, "kubectl get po -n kube-system");
}

#[tokio::test]
async fn docker_uses_the_docker_wrapper() {
    let snap = FakeSnap::new();
    snap.tool("docker", r#"echo "docker $*""#);

    let out = snap.microk8s().docker("images").await.unwrap();
    assert_eq!(out, "docker images");
}

#[tokio::test]
async fn kubectl_get_parses_yaml() {
    let snap = FakeSnap::new();
    snap.tool(
        "kubectl",
        r#"[ "$*" = "get -o yaml svc kubernetes" ] || exit 1
cat <<'EOF'
apiVersion: v1
kind: Service
metadata:
  name: kubernetes
  namespace: default
spec:
  ports:
  - port: 443
EOF"#,
    );

    let service = snap.microk8s().kubectl_get("svc kubernetes").await.unwrap();
    assert_eq!(service["metadata"]["name"].as_str(), Some("kubernetes"));
    assert_eq!(service["spec"]["ports"][0]["port"].as_u64(), Some(443));
}

#[tokio::test]
async fn kubectl_gives_up_after_timeout() {
    let snap = FakeSnap::new();
    snap.tool("kubectl", "echo 'connection refused' >&2; exit 1");

    let err = snap
        .microk8s()
        .kubectl_with_timeout("get no", Duration::from_millis(500))
        .await
        .unwrap_err();

    match err.downcast_ref::<CommandError>() {
        Some(CommandError::Failed { stderr, .. }) => assert_eq!(stderr, "connection refused"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn enable_retries_until_addon_is_enabled() {
    let snap = FakeSnap::new();
    let marker = snap.path().join("first-attempt");
    snap.tool(
        "enable",
        &format!(
            "if [ ! -f {m} ]; then touch {m}; exit 1; fi\necho \"Enabling $1\"",
            m = marker.display()
        ),
    );

    let out = snap.microk8s().enable("dns").await.unwrap();
    assert_eq!(out, "Enabling dns");
}

#[tokio::test]
async fn disable_reports_failure() {
    let snap = FakeSnap::new();
    snap.tool("disable", "echo \"addon $1 not found\" >&2; exit 1");

    let err = snap.microk8s().disable("nosuch").await.unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to disable addon nosuch"));
}

#[tokio::test]
async fn reset_waits_for_installation() {
    let snap = FakeSnap::new();
    let log = snap.path().join("calls");
    snap.tool("reset", &format!("echo reset >> {}", log.display()));
    snap.tool(
        "kubectl",
        &format!(
            r#"echo "$*" >> {log}
case "$*" in
  "get -o yaml svc kubernetes") printf 'metadata:\n  name: kubernetes\n' ;;
  "get no") printf 'NAME STATUS ROLES AGE VERSION\nnode-1 Ready <none> 1m v1.30.1\n' ;;
  *) exit 1 ;;
esac"#,
            log = log.display()
        ),
    );

    snap.microk8s().reset().await.unwrap();

    let calls = fs::read_to_string(&log).unwrap();
    let calls: Vec<&str> = calls.lines().collect();
    assert_eq!(calls, ["reset", "get -o yaml svc kubernetes", "get no"]);
}

#[tokio::test]
async fn wait_for_installation_waits_out_not_ready_nodes() {
    let snap = FakeSnap::new();
    let counter = snap.path().join("node-polls");
    snap.tool(
        "kubectl",
        &format!(
            r#"case "$*" in
  "get -o yaml svc kubernetes") printf 'metadata:\n  name: kubernetes\n' ;;
  "get no")
    echo x >> {c}
    if [ $(wc -l < {c}) -lt 2 ]; then
      printf 'NAME STATUS\nnode-1 NotReady\n'
    else
      printf 'NAME STATUS\nnode-1 Ready\n'
    fi ;;
esac"#,
            c = counter.display()
        ),
    );

    snap.microk8s().wait_for_installation().await.unwrap();
    assert_eq!(fs::read_to_string(&counter).unwrap().lines().count(), 2);
}

#[tokio::test]
async fn wait_for_pod_state_by_label() {
    let snap = FakeSnap::new();
    let counter = snap.path().join("pod-polls");
    snap.tool(
        "kubectl",
        &format!(
            r#"[ "$*" = "get -o yaml po -n container-registry -l app=registry" ] || exit 1
echo x >> {c}
if [ $(wc -l < {c}) -lt 2 ]; then
  printf 'kind: List\nitems: []\n'
  exit 0
fi
cat <<'EOF'
kind: List
items:
- metadata:
    name: registry-abc
  status:
    containerStatuses:
    - name: registry
      state:
        running:
          startedAt: "2024-01-01T00:00:00Z"
EOF"#,
            c = counter.display()
        ),
    );

    let query = PodStateQuery::by_label("app=registry", "container-registry", "running");
    let state = snap.microk8s().wait_for_pod_state(&query).await.unwrap();

    assert_eq!(state.state, "running");
    assert_eq!(state.reason, None);
    assert_eq!(fs::read_to_string(&counter).unwrap().lines().count(), 2);
}

#[tokio::test]
async fn wait_for_pod_state_with_reason() {
    let snap = FakeSnap::new();
    snap.tool(
        "kubectl",
        r#"cat <<'EOF'
kind: Pod
metadata:
  name: migrate
status:
  containerStatuses:
  - name: migrate
    state:
      terminated:
        exitCode: 0
        reason: Completed
EOF"#,
    );

    let query = PodStateQuery::new("migrate", "default", "terminated").with_reason("Completed");
    let state = snap.microk8s().wait_for_pod_state(&query).await.unwrap();
    assert_eq!(state.reason.as_deref(), Some("Completed"));
}

#[tokio::test]
async fn wait_for_pod_state_times_out() {
    let snap = FakeSnap::new();
    snap.tool(
        "kubectl",
        r#"printf 'kind: Pod\nstatus:\n  containerStatuses:\n  - state:\n      waiting:\n        reason: ImagePullBackOff\n'"#,
    );

    let mut mk8s_config = snap.microk8s().config().clone();
    mk8s_config.timeouts.wait_secs = 1;
    let mk8s = Microk8s::new(mk8s_config);

    let query = PodStateQuery::new("web", "default", "running");
    let err = mk8s.wait_for_pod_state(&query).await.unwrap_err();
    assert!(err.to_string().contains("Timeout"));
}

#[tokio::test]
#[ignore = "requires a local microk8s snap"]
async fn real_cluster_dns_addon() {
    let mk8s = Microk8s::new(HarnessConfig::load(None).unwrap());
    mk8s.wait_for_installation().await.unwrap();

    mk8s.enable("dns").await.unwrap();
    mk8s.wait_for_pod_state(&PodStateQuery::by_label(
        "k8s-app=kube-dns",
        "kube-system",
        "running",
    ))
    .await
    .unwrap();

    mk8s.disable("dns").await.unwrap();
}
