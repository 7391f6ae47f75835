//! Retry with exponential backoff and per-attempt timeout
//!
//! **Algorithm:**
//! 1. Run the operation, bounded by `policy.timeout`
//! 2. If successful, return the result
//! 3. If the error is transient and retries remain: wait
//!    `initial_backoff * 2^(retry - 1)` and try again
//! 4. Otherwise return the error (the last observed one once retries run out)
//!
//! No jitter. A timed-out attempt is dropped, which cancels its request.

use super::FetchError;
use std::future::Future;
use std::time::Duration;

/// Retry budget for one network operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub initial_backoff: Duration,
    /// Bound on each individual attempt
    pub timeout: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff_ms: u64, timeout_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::from_millis(initial_backoff_ms),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// One attempt, no retries
    pub fn single(timeout_ms: u64) -> Self {
        Self::new(0, 0, timeout_ms)
    }

    /// Wait before retry number `retry` (1-based)
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(1u32 << exponent)
    }
}

/// Run `operation` under `policy`
///
/// # Arguments
/// * `operation_name` - Name for logging; must not contain credentials
/// * `policy` - Retry count, initial backoff and per-attempt timeout
/// * `operation` - Closure producing a fresh attempt future
pub async fn attempt<F, Fut, T>(
    operation_name: &str,
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let timeout_ms = policy.timeout.as_millis() as u64;
    let mut retry = 0u32;

    loop {
        let outcome = match tokio::time::timeout(policy.timeout, operation()).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(timeout_ms)),
        };

        let err = match outcome {
            Ok(value) => {
                if retry > 0 {
                    tracing::debug!(operation = operation_name, retry, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !err.is_transient() {
            tracing::debug!(operation = operation_name, error = %err, "Terminal failure, not retrying");
            return Err(err);
        }

        if retry >= policy.max_retries {
            tracing::warn!(
                operation = operation_name,
                attempts = retry + 1,
                error = %err,
                "Retries exhausted"
            );
            return Err(err);
        }

        retry += 1;
        let wait = policy.backoff_for(retry);
        tracing::warn!(
            operation = operation_name,
            retry,
            wait_ms = wait.as_millis() as u64,
            error = %err,
            "Transient failure, backing off"
        );
        tokio::time::sleep(wait).await;
    }
}
