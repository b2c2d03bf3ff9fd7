use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use common_observability::PricingMetrics;
use tracing::{debug, warn};

use crate::repo::StoreError;

/// Deadline and retry window applied to every store read.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub timeout: Duration,
    /// Retries after the first attempt; only transient faults are retried.
    pub retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            timeout: Duration::from_millis(2000),
            retries: 2,
            base_delay: Duration::from_millis(25),
            max_delay: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.base_delay,
            max_interval: self.max_delay,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

/// Run `op` under the policy's deadline, retrying transient faults with
/// exponential backoff. Terminal failures are counted and logged here.
pub async fn guarded_read<T, F, Fut>(
    policy: &RetryPolicy,
    store: &'static str,
    metrics: &PricingMetrics,
    mut op: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let timer = metrics.store_read_seconds.start_timer();
    let mut backoff = policy.backoff();
    let mut attempt = 0u32;
    loop {
        let result = match tokio::time::timeout(policy.timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(policy.timeout)),
        };
        match result {
            Ok(value) => {
                timer.observe_duration();
                return Ok(value);
            }
            Err(err) if err.is_transient() && attempt < policy.retries => {
                attempt += 1;
                metrics.store_retry(store);
                let delay = backoff.next_backoff().unwrap_or(policy.max_delay);
                debug!(store, attempt, ?delay, error = %err, "Retrying store read");
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                timer.observe_duration();
                metrics.store_failure(store, err.kind());
                warn!(store, attempts = attempt + 1, error = %err, "Store read failed");
                return Err(err);
            }
        }
    }
}
