/// Polling for cluster state with a deadline
use anyhow::Result;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Parameters of a condition wait
#[derive(Debug, Clone)]
pub struct PollingConfig {
    pub timeout: Duration,
    pub interval: Duration,
    pub description: String,
}

impl PollingConfig {
    pub fn new(timeout: Duration, interval: Duration, description: impl Into<String>) -> Self {
        Self {
            timeout,
            interval,
            description: description.into(),
        }
    }

    /// Poll until condition is met or timeout
    ///
    /// The condition returns:
    /// - Ok(Some(T)) when met (returns T)
    /// - Ok(None) when not yet met
    /// - Err(e) to stop polling with that error
    ///
    /// The condition is always evaluated at least once.
    pub async fn poll<F, Fut, T>(&self, mut condition: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        info!("Waiting for {}...", self.description);

        let start = Instant::now();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            if let Some(value) = condition().await? {
                info!("✓ {}", self.description);
                return Ok(value);
            }

            if start.elapsed() > self.timeout {
                anyhow::bail!(
                    "Timeout after {} seconds waiting for {}",
                    self.timeout.as_secs(),
                    self.description
                );
            }

            debug!("{} not yet reached (attempt {})", self.description, attempts);
            tokio::time::sleep(self.interval).await;
        }
    }

    /// Poll until condition returns Ok(true) or timeout
    pub async fn poll_until<F, Fut>(&self, mut condition: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        self.poll(|| {
            let fut = condition();
            async move { Ok::<_, anyhow::Error>(fut.await?.then_some(())) }
        })
        .await
    }
}
