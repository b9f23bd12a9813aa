use crate::error::ProviderError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

/// Bounded exponential backoff applied around collaborator calls. Only
/// [`ProviderError::RateLimited`] is retried; every other error is returned
/// immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self { max_retries: 0, ..Self::default() }
    }

    /// Wait before retry number `retry` (1-based), without jitter. A server
    /// `retry_after` hint replaces the exponential step; both are capped.
    pub fn delay_for(&self, retry: u32, hint: Option<Duration>) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1).min(16)));
        hint.unwrap_or(exp).min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// retry budget is spent.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut retry = 0u32;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retryable() && retry < self.max_retries => {
                    retry += 1;
                    let delay = with_jitter(self.delay_for(retry, e.retry_after()));
                    warn!(retry, ?delay, "{} failed: {}. Retrying", label, e);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if e.is_retryable() {
                        error!("{} giving up after {} retries: {}", label, retry, e);
                    }
                    return Err(e);
                }
            }
        }
    }
}

fn with_jitter(delay: Duration) -> Duration {
    let spread = (delay.as_millis() / 10) as u64;
    if spread == 0 {
        return delay;
    }
    delay + Duration::from_millis(rand::thread_rng().gen_range(0..=spread))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_and_caps() {
        let p = RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };
        assert_eq!(p.delay_for(1, None), Duration::from_millis(100));
        assert_eq!(p.delay_for(2, None), Duration::from_millis(200));
        assert_eq!(p.delay_for(3, None), Duration::from_millis(350));
        assert_eq!(p.delay_for(1, Some(Duration::from_secs(10))), Duration::from_millis(350));
        assert_eq!(p.delay_for(1, Some(Duration::from_millis(20))), Duration::from_millis(20));
    }
}
