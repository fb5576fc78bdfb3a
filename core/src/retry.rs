use crate::{Error, Result};
use backon::{BackoffBuilder, ExponentialBuilder};
use std::future::Future;
use std::time::Duration;

/// Upper bound of a single backoff sleep.
const MAX_DELAY: Duration = Duration::from_secs(3600);

/// RetryPolicy wraps an async operation with bounded exponential backoff.
///
/// `max_retries` counts invocations, not re-invocations: a policy with
/// `max_retries = 3` calls the operation at most three times and sleeps
/// `base_delay * 2^attempt` between consecutive calls. There is no deadline,
/// callers cancel by dropping the future.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: usize,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// Create a new policy.
    pub fn new(max_retries: usize, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Maximum number of invocations.
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Delay before the second invocation.
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    fn backoff(&self) -> impl Iterator<Item = Duration> {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(MAX_DELAY)
            .with_factor(2.0)
            .with_max_times(self.max_retries.saturating_sub(1))
            .build()
    }

    /// Invoke `operation` until it yields a value accepted by `success`.
    ///
    /// A value rejected by `success` is handed to `error_extractor` once all
    /// attempts are used; an `Err` from the last attempt is returned as is.
    pub async fn retry_until<T, F, Fut, S, E>(
        &self,
        mut operation: F,
        success: S,
        error_extractor: E,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        S: Fn(&T) -> bool,
        E: FnOnce(T) -> Error,
    {
        let mut backoff = self.backoff();
        let mut attempt = 0;

        loop {
            let outcome = operation().await;
            attempt += 1;

            let last = match outcome {
                Ok(v) if success(&v) => return Ok(v),
                other => other,
            };

            let Some(delay) = backoff.next() else {
                return Err(match last {
                    Ok(v) => error_extractor(v),
                    Err(err) => err,
                });
            };

            match &last {
                Ok(_) => log::debug!(
                    "attempt {attempt}/{} rejected, retrying in {delay:?}",
                    self.max_retries
                ),
                Err(err) => log::debug!(
                    "attempt {attempt}/{} failed: {}, retrying in {delay:?}",
                    self.max_retries,
                    err.display_with_context()
                ),
            }
            tokio::time::sleep(delay).await;
        }
    }
}
