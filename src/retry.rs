//! Retry with exponential backoff
//!
//! Every provider fetch goes through [`retry_with_backoff`]. Only transient
//! errors (see [`OctowattError::is_transient`]) are retried; the whole
//! sequence of attempts is bounded by a total time budget.

use crate::config::RetryConfig;
use crate::error::{OctowattError, Result};
use crate::logging::StructuredLogger;
use std::future::Future;
use std::time::Duration;

/// Runtime form of [`RetryConfig`]
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first one)
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_multiplier: f64,
    /// Cap on a single delay
    pub max_delay: Duration,
    /// Bound on the whole retry sequence
    pub total_budget: Duration,
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            initial_delay: Duration::from_millis(cfg.initial_delay_ms),
            backoff_multiplier: cfg.backoff_multiplier.max(1.0),
            max_delay: Duration::from_millis(cfg.max_delay_ms),
            total_budget: Duration::from_millis(cfg.total_budget_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(retry.saturating_sub(1) as i32);
        let secs = (self.initial_delay.as_secs_f64() * factor).min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

/// Execute an async operation, retrying transient failures with exponential backoff
pub async fn retry_with_backoff<F, Fut, T>(
    policy: &RetryPolicy,
    operation_name: &str,
    logger: &StructuredLogger,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = async {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        logger.info(&format!(
                            "{} succeeded on attempt {}",
                            operation_name, attempt
                        ));
                    }
                    return Ok(value);
                }
                Err(err) if attempt < policy.max_attempts && err.is_transient() => {
                    let delay = policy.delay_for(attempt);
                    logger.warn(&format!(
                        "{} failed (attempt {}/{}): {}; retrying in {} ms",
                        operation_name,
                        attempt,
                        policy.max_attempts,
                        err,
                        delay.as_millis()
                    ));
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    logger.warn(&format!(
                        "{} failed permanently after {} attempt(s): {}",
                        operation_name, attempt, err
                    ));
                    return Err(err);
                }
            }
        }
    };

    match tokio::time::timeout(policy.total_budget, attempts).await {
        Ok(result) => result,
        Err(_) => Err(OctowattError::timeout(format!(
            "{} exceeded retry budget of {} ms",
            operation_name,
            policy.total_budget.as_millis()
        ))),
    }
}
