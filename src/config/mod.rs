/// Configuration for the microk8s helpers
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding `bin_dir`
pub const BIN_DIR_ENV: &str = "MICROK8S_BIN_DIR";

/// Main harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Directory holding the microk8s.* snap wrappers
    #[serde(default = "default_bin_dir")]
    pub bin_dir: PathBuf,

    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// Timeouts and intervals, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Plain commands such as microk8s.docker
    pub command_secs: u64,

    pub kubectl_secs: u64,

    /// enable, disable and reset
    pub addon_secs: u64,

    /// Backoff between attempts of a failing command
    pub retry_interval_secs: u64,

    /// Sleep between state polls
    pub poll_interval_secs: u64,

    /// Grace period after the node turns Ready
    pub settle_secs: u64,

    /// Upper bound for installation and pod state waits
    pub wait_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            command_secs: 60,
            kubectl_secs: 300,
            addon_secs: 300,
            retry_interval_secs: 3,
            poll_interval_secs: 3,
            settle_secs: 30,
            wait_secs: 1800,
        }
    }
}

impl TimeoutConfig {
    pub fn command(&self) -> Duration {
        Duration::from_secs(self.command_secs)
    }

    pub fn kubectl(&self) -> Duration {
        Duration::from_secs(self.kubectl_secs)
    }

    pub fn addon(&self) -> Duration {
        Duration::from_secs(self.addon_secs)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }
}

fn default_bin_dir() -> PathBuf {
    PathBuf::from("/snap/bin")
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            bin_dir: default_bin_dir(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: HarnessConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, defaults otherwise, then apply the environment
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        if let Ok(dir) = std::env::var(BIN_DIR_ENV) {
            config.bin_dir = PathBuf::from(dir);
        }
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bin_dir.as_os_str().is_empty() {
            anyhow::bail!("bin_dir cannot be empty");
        }
        // Command lines are split on whitespace before execution
        if self.bin_dir.to_string_lossy().contains(char::is_whitespace) {
            anyhow::bail!("bin_dir cannot contain whitespace: {}", self.bin_dir.display());
        }
        if self.timeouts.retry_interval_secs == 0 {
            anyhow::bail!("timeouts.retry_interval_secs must be greater than zero");
        }
        if self.timeouts.poll_interval_secs == 0 {
            anyhow::bail!("timeouts.poll_interval_secs must be greater than zero");
        }
        Ok(())
    }

    /// Path of a microk8s.<tool> wrapper
    pub fn tool(&self, name: &str) -> PathBuf {
        self.bin_dir.join(format!("microk8s.{}", name))
    }

    /// Generate an example configuration file
    pub fn example() -> Self {
        Self::default()
    }
}
