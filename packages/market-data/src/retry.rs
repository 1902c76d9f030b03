//! Caller-side deadlines and retries for outbound calls.

use std::future::Future;

use tokio::time::{sleep, timeout};

use crate::config::RetryPolicy;
use crate::error::{MarketDataError, Result};

/// Run `f` under `policy`: each attempt is bounded by `policy.timeout`, and
/// transient failures (network, timeout, 5xx, 429) are retried up to
/// `policy.max_retries` times with linear backoff. Other errors return at once.
pub async fn with_retry<T, F, Fut>(operation: &'static str, policy: &RetryPolicy, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retries = 0;

    loop {
        let outcome = match timeout(policy.timeout, f()).await {
            Ok(result) => result,
            Err(_) => Err(MarketDataError::Timeout {
                operation,
                after: policy.timeout,
            }),
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && retries < policy.max_retries => {
                retries += 1;
                tracing::warn!(
                    operation,
                    error = %e,
                    retry = retries,
                    max_retries = policy.max_retries,
                    "Outbound call failed, retrying"
                );
                sleep(policy.retry_delay * retries).await;
            }
            Err(e) => {
                if retries > 0 {
                    tracing::error!(operation, error = %e, retries, "Outbound call failed after retries");
                }
                return Err(e);
            }
        }
    }
}
