use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::AiError;

/// Bounded retry with doubling backoff and no jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

/// The last error of a retry loop that ran out of attempts or hit a
/// terminal error.
#[derive(Debug)]
pub struct Exhausted {
    pub attempts: u32,
    pub last: AiError,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Result<Self, AiError> {
        if max_attempts == 0 {
            return Err(AiError::Config("max_attempts must be at least 1".into()));
        }
        Ok(Self {
            max_attempts,
            initial_backoff,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the given 1-based attempt: zero for the first, then
    /// `initial`, `2 * initial`, `4 * initial`, ...
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let doublings = (attempt - 2).min(16);
        self.initial_backoff.saturating_mul(1 << doublings)
    }

    /// Run `op` until it succeeds, fails terminally, or attempts run out.
    pub async fn run<T, F, Fut>(&self, what: &'static str, mut op: F) -> Result<T, Exhausted>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AiError>>,
    {
        let mut attempt = 1;
        loop {
            let delay = self.backoff(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    warn!(what, attempt, error = %e, "transient failure, retrying");
                    attempt += 1;
                }
                Err(e) => {
                    return Err(Exhausted {
                        attempts: attempt,
                        last: e,
                    });
                }
            }
        }
    }
}
