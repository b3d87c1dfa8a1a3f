use crate::core::config::RetryConfig;
use crate::core::error::FetchError;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// How many times to try a request and how long to wait in between.
///
/// The delay starts at `initial_delay` for every call. It is multiplied by
/// `throttle_multiplier` (up to `max_delay`) after each rate-limited attempt
/// and left unchanged after any other failure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub throttle_multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        (&RetryConfig::default()).into()
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy {
            max_attempts: config.max_attempts,
            initial_delay: Duration::from_secs(config.initial_delay_secs),
            max_delay: Duration::from_secs(config.max_delay_secs),
            throttle_multiplier: config.throttle_multiplier,
        }
    }
}

impl RetryPolicy {
    pub fn next_delay(&self, current: Duration, throttled: bool) -> Duration {
        if throttled {
            current
                .saturating_mul(self.throttle_multiplier)
                .min(self.max_delay)
        } else {
            current
        }
    }
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Runs `operation` until it succeeds or `policy.max_attempts` runs have failed.
///
/// `operation` receives the 1-based attempt number. On exhaustion the last
/// failure is returned wrapped in [`FetchError::Exhausted`].
pub async fn with_backoff<F, Fut, T>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut delay = policy.initial_delay;
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(val) => return Ok(val),
            Err(err) => {
                warn!(error = %err, "Attempt {}/{} failed", attempt, attempts);
                if attempt >= attempts {
                    return Err(FetchError::Exhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
                delay = policy.next_delay(delay, err.is_throttled());
                debug!("Retrying in {}s", delay.as_secs_f64());
                sleeper.sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
