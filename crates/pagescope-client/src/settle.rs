//! Waiting for client-side rendering to stop changing the DOM.

use std::time::Duration;

use pagescope_core::error::AppError;
use tokio::time::Instant;

/// How long to let a loaded page keep mutating before its markup is read.
#[derive(Debug, Clone, Copy)]
pub struct SettlePolicy {
    /// Pause between two markup snapshots.
    pub poll_interval: Duration,
    /// Upper bound on the whole settling phase.
    pub max_wait: Duration,
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            max_wait: Duration::from_secs(5),
        }
    }
}

impl SettlePolicy {
    /// No settling: the first snapshot is returned as is.
    pub fn none() -> Self {
        Self {
            poll_interval: Duration::ZERO,
            max_wait: Duration::ZERO,
        }
    }

    /// Snapshot the markup until two consecutive reads have the same length
    /// or `max_wait` (capped at `budget`) runs out. Returns the last snapshot.
    pub async fn settle<F, Fut>(&self, budget: Duration, mut snapshot: F) -> Result<String, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<String, AppError>>,
    {
        let deadline = Instant::now() + self.max_wait.min(budget);
        let mut html = snapshot().await?;
        let mut polls = 0;

        while !self.poll_interval.is_zero() && Instant::now() + self.poll_interval <= deadline {
            tokio::time::sleep(self.poll_interval).await;
            let next = snapshot().await?;
            polls += 1;
            if next.len() == html.len() {
                tracing::debug!(polls, bytes = next.len(), "Page settled");
                return Ok(next);
            }
            html = next;
        }

        tracing::debug!(polls, bytes = html.len(), "Settle budget exhausted, using last snapshot");
        Ok(html)
    }
}
