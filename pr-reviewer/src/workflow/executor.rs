//! Step executor: replay committed steps, retry transient failures, commit outputs.

use std::future::Future;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::errors::{JournalError, ReviewResult};
use crate::workflow::journal::StepJournal;

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per step, including the first one.
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Delay after the given failed attempt (1-based): backoff * 2^(attempt-1).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(10);
        self.backoff.saturating_mul(1u32 << exp)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}

pub struct StepExecutor<'a> {
    journal: &'a dyn StepJournal,
    instance_id: &'a str,
    retry: RetryPolicy,
}

impl<'a> StepExecutor<'a> {
    pub fn new(journal: &'a dyn StepJournal, instance_id: &'a str, retry: RetryPolicy) -> Self {
        Self {
            journal,
            instance_id,
            retry,
        }
    }

    /// Runs a journaled step.
    ///
    /// A committed output is decoded and returned without calling `op`.
    /// Otherwise `op` runs under the retry policy and its output is committed
    /// before returning.
    pub async fn run<T, F, Fut>(&self, step: &str, op: F) -> ReviewResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = ReviewResult<T>>,
    {
        if let Some(saved) = self.journal.load_step(self.instance_id, step).await? {
            debug!(instance = %self.instance_id, step, "replaying committed step");
            let out = serde_json::from_value(saved).map_err(JournalError::from)?;
            return Ok(out);
        }

        let out = self.with_retries(step, op).await?;

        let value = serde_json::to_value(&out).map_err(JournalError::from)?;
        self.journal
            .commit_step(self.instance_id, step, &value)
            .await?;
        debug!(instance = %self.instance_id, step, "step committed");
        Ok(out)
    }

    /// Runs `op` under the retry policy without journaling its output.
    pub async fn with_retries<T, F, Fut>(&self, step: &str, mut op: F) -> ReviewResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ReviewResult<T>>,
    {
        let mut attempt = 1;
        loop {
            let t0 = Instant::now();
            match op().await {
                Ok(out) => {
                    debug!(
                        instance = %self.instance_id,
                        step,
                        attempt,
                        elapsed_ms = t0.elapsed().as_millis() as u64,
                        "step succeeded"
                    );
                    return Ok(out);
                }
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    warn!(
                        instance = %self.instance_id,
                        step,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "step failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(instance = %self.instance_id, step, attempt, error = %e, "step failed");
                    return Err(e);
                }
            }
        }
    }
}
