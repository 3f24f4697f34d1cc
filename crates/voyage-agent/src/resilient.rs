//! Resilient client: one retry discipline for every remote call
//!
//! Retries are fixed-interval: the same backoff separates every attempt, and a
//! short settle pause follows the call whether it succeeded or not.
//!
//! Each call holds an indicator scope on the [`OutputArbiter`] from its first
//! attempt until it returns, so the countdown never paints over progress lines.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};
use voyage_core::config::RetryConfig;
use voyage_core::{OutputArbiter, Result, VoyageError};

/// Attempt budget and waits for [`ResilientClient`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Wait between attempts
    pub backoff: Duration,
    /// Pause after the call finishes
    pub settle: Duration,
}

impl RetryPolicy {
    /// Policy without any waiting, for tests and dry runs
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Duration::ZERO,
            settle: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            backoff: config.backoff(),
            settle: config.settle(),
        }
    }
}

/// Retry wrapper shared by every remote operation
#[derive(Debug, Clone)]
pub struct ResilientClient {
    policy: RetryPolicy,
    output: OutputArbiter,
}

impl ResilientClient {
    pub fn new(policy: RetryPolicy, output: OutputArbiter) -> Self {
        Self { policy, output }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn output(&self) -> &OutputArbiter {
        &self.output
    }

    /// Run `request` until it succeeds or the attempt budget is spent
    ///
    /// `request` is invoked once per attempt, so anything time- or
    /// fingerprint-bound (signatures, user agents) is rebuilt on every retry.
    pub async fn call<F, Fut, T>(&self, operation: &str, request: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.call_with(operation, request, |_| format!("{} succeeded", operation))
            .await
    }

    /// Like [`call`](Self::call), with a custom success line built from the result
    pub async fn call_with<F, Fut, T, D>(
        &self,
        operation: &str,
        mut request: F,
        describe: D,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        D: FnOnce(&T) -> String,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let indicator = self.output.indicator(operation);
        let mut attempt: u32 = 1;

        loop {
            debug!("{} (attempt {}/{})", operation, attempt, max_attempts);

            match request().await {
                Ok(value) => {
                    indicator.succeed(describe(&value));
                    tokio::time::sleep(self.policy.settle).await;
                    return Ok(value);
                }
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                        operation, attempt, max_attempts, err, self.policy.backoff
                    );
                    indicator.update(format!(
                        "{} [Retry {}/{}]",
                        operation, attempt, max_attempts
                    ));
                    tokio::time::sleep(self.policy.backoff).await;
                    attempt += 1;
                }
                Err(err) => {
                    warn!(
                        "{} failed after {} attempt(s): {}",
                        operation, attempt, err
                    );
                    indicator.fail(format!("Failed {}: {}", operation, err));
                    tokio::time::sleep(self.policy.settle).await;
                    return Err(VoyageError::Exhausted {
                        operation: operation.to_string(),
                        attempts: attempt,
                        source: Box::new(err),
                    });
                }
            }
        }
    }
}
