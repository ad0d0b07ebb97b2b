use std::future::Future;
use anyhow::{anyhow, Result};
use tokio::time::{sleep, Duration};
use rand::Rng;

use crate::logging::{log_exhausted, log_retry};

/// Delay schedule between attempts
#[derive(Clone, Debug, PartialEq)]
pub enum Backoff {
    /// Same delay before every retry
    Fixed(Duration),
    /// base * 2^attempt, capped at max, with ±jitter_factor noise
    Exponential {
        base: Duration,
        max: Duration,
        jitter_factor: f64,
    },
}

/// Bounded retry policy
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Fixed(Duration::from_millis(2000)),
        }
    }
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed(delay),
        }
    }

    /// Zero is treated as a single attempt.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay after the given zero-based failed attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match &self.backoff {
            Backoff::Fixed(delay) => *delay,
            Backoff::Exponential {
                base,
                max,
                jitter_factor,
            } => {
                let base_ms = base.as_millis() as f64 * 2.0_f64.powi(attempt.min(30) as i32);
                let clamped = base_ms.min(max.as_millis() as f64);

                // NaN and out-of-range factors must never reach gen_range
                let factor = if jitter_factor.is_finite() {
                    jitter_factor.clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let jitter_range = clamped * factor;
                let jitter: f64 = if jitter_range > 0.0 {
                    rand::thread_rng().gen_range(-jitter_range..=jitter_range)
                } else {
                    0.0
                };
                let final_delay = (clamped + jitter).max(0.0);

                Duration::from_millis(final_delay as u64)
            }
        }
    }
}

/// Retry a fallible async operation under `policy`.
///
/// Returns the first success, or the last error once every attempt has
/// failed. Sleeps only between attempts, never after the final one.
pub async fn retry_async<F, Fut, T>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.attempts();
    let mut last_error: Option<anyhow::Error> = None;

    for attempt in 0..attempts {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if attempt + 1 < attempts {
                    let delay = policy.delay_for_attempt(attempt);
                    log_retry(
                        operation_name,
                        attempt + 1,
                        attempts,
                        &format!("{:#}", e),
                        delay.as_millis() as u64,
                    );
                    sleep(delay).await;
                } else {
                    log_exhausted(operation_name, attempts, &format!("{:#}", e));
                }
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| anyhow!("{} exhausted without error", operation_name)))
}
