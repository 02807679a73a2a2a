/// Re-running a command line until it exits zero
use anyhow::Result;
use std::time::{Duration, Instant};
use tracing::warn;

use super::command::{CommandBuilder, CommandError};

/// Backoff between attempts of a failing command
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(3);

/// Deadline and fixed backoff for retried commands
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            interval: DEFAULT_RETRY_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run `cmd` until it succeeds or the deadline passes.
    ///
    /// The command line is split on whitespace. Only non-zero exits are
    /// retried; a binary that cannot be started fails straight away. Once
    /// the deadline has passed the last failure is returned.
    pub async fn run_until_success(&self, cmd: &str) -> Result<String> {
        let start = Instant::now();

        loop {
            match CommandBuilder::from_command_line(cmd)?.run().await {
                Ok(stdout) => return Ok(normalize_output(&stdout)),
                Err(err @ CommandError::Failed { .. }) => {
                    if start.elapsed() > self.timeout {
                        return Err(anyhow::Error::new(err).context(format!(
                            "`{}` did not succeed within {} seconds",
                            cmd,
                            self.timeout.as_secs()
                        )));
                    }
                    warn!("Retrying {}", cmd);
                    tokio::time::sleep(self.interval).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

/// Run `cmd` until it succeeds, with the default backoff
pub async fn run_until_success(cmd: &str, timeout: Duration) -> Result<String> {
    RetryPolicy::new(timeout).run_until_success(cmd).await
}

/// Trim the output and turn escaped `\n` sequences into newlines
pub fn normalize_output(stdout: &str) -> String {
    stdout.trim().replace("\\n", "\n")
}
