/// mk8s-harness - microk8s integration test helpers
///
/// Command-line access to the helpers used by integration tests: run
/// kubectl/docker with retries, toggle addons, wait for the cluster and
/// patch manifests for the local architecture.
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mk8s_harness::manifest::{update_yaml_with_arch_for, Arch};
use mk8s_harness::{HarnessConfig, Microk8s, PodStateQuery};

#[derive(Parser)]
#[command(name = "mk8s-harness")]
#[command(about = "Drive a local microk8s cluster for integration tests", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run microk8s.kubectl until it succeeds
    Kubectl {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        args: Vec<String>,
    },

    /// Run microk8s.docker until it succeeds
    Docker {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        args: Vec<String>,
    },

    /// kubectl get -o yaml <target>, parsed and printed
    ///
    /// --json may come before or after the target.
    Get {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        target: Vec<String>,

        /// Print as JSON instead of YAML
        #[arg(long)]
        json: bool,
    },

    /// Enable an addon
    Enable { addon: String },

    /// Disable an addon
    Disable { addon: String },

    /// Reset the cluster and wait for it to come back
    Reset,

    /// Wait for the kubernetes service and a Ready node
    WaitReady,

    /// Wait for a pod's first container to reach a state
    WaitPod {
        /// Pod name; leave empty to select by label
        #[arg(long, default_value = "")]
        pod: String,

        #[arg(short, long, default_value = "default")]
        namespace: String,

        /// running, waiting or terminated
        #[arg(long)]
        state: String,

        /// Required reason, e.g. Completed
        #[arg(long)]
        reason: Option<String>,

        #[arg(short = 'l', long)]
        label: Option<String>,
    },

    /// Replace $ARCH in a manifest with the machine architecture
    PatchArch {
        manifest: PathBuf,

        /// Override the detected architecture (amd64, arm64)
        #[arg(long)]
        arch: Option<Arch>,
    },

    /// Generate example configuration file
    Init {
        #[arg(default_value = "mk8s-harness.yaml")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("mk8s_harness={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(cli).await {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let Cli { command, config, .. } = cli;
    let microk8s = || -> Result<Microk8s> {
        let config =
            HarnessConfig::load(config.as_deref()).context("Failed to load configuration")?;
        Ok(Microk8s::new(config))
    };

    match command {
        Commands::Kubectl { args } => println!("{}", microk8s()?.kubectl(&args.join(" ")).await?),
        Commands::Docker { args } => println!("{}", microk8s()?.docker(&args.join(" ")).await?),
        Commands::Get { target, json } => {
            let (target, json) = get_request(target, json);
            let document = microk8s()?.kubectl_get(&target).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&document)?);
            } else {
                print!("{}", serde_yaml::to_string(&document)?);
            }
        }
        Commands::Enable { addon } => println!("{}", microk8s()?.enable(&addon).await?),
        Commands::Disable { addon } => println!("{}", microk8s()?.disable(&addon).await?),
        Commands::Reset => {
            let mk8s = microk8s()?;
            mk8s.check_installed().await.context("microk8s.kubectl is required")?;
            mk8s.reset().await?;
            info!("✓ microk8s reset and ready");
        }
        Commands::WaitReady => {
            let mk8s = microk8s()?;
            mk8s.check_installed().await.context("microk8s.kubectl is required")?;
            mk8s.wait_for_installation().await?;
        }
        Commands::WaitPod {
            pod,
            namespace,
            state,
            reason,
            label,
        } => {
            let query = PodStateQuery {
                pod,
                namespace,
                desired_state: state,
                desired_reason: reason,
                label,
            };
            let observed = microk8s()?.wait_for_pod_state(&query).await?;
            match observed.reason {
                Some(reason) => println!("{} ({})", observed.state, reason),
                None => println!("{}", observed.state),
            }
        }
        Commands::PatchArch { manifest, arch } => {
            let arch = match arch {
                Some(arch) => arch,
                None => Arch::detect()?,
            };
            update_yaml_with_arch_for(&manifest, arch).await?;
        }
        Commands::Init { path } => init_config(&path).await?,
    }

    Ok(())
}

/// Target of `get` with any trailing --json taken out of it
fn get_request(mut target: Vec<String>, json: bool) -> (String, bool) {
    let before = target.len();
    target.retain(|arg| arg != "--json");
    (target.join(" "), json || target.len() != before)
}

/// Initialize example configuration file
async fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!("Configuration file already exists: {}", path.display());
    }

    let yaml = serde_yaml::to_string(&HarnessConfig::example())?;

    tokio::fs::write(path, yaml)
        .await
        .context("Failed to write configuration file")?;

    info!("Example configuration created: {}", path.display());
    info!("");
    info!("Next steps:");
    info!("  1. Point bin_dir at the microk8s snap wrappers (or set MICROK8S_BIN_DIR)");
    info!("  2. Wait for the cluster:");
    info!("     mk8s-harness --config {} wait-ready", path.display());

    Ok(())
}
