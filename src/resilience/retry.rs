//! Bounded retry loop for transient failures.

use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Attempts made by default (first call included).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, first call included.
    pub max_attempts: u32,
    /// Base delay between attempts; normally the rate-limit window period.
    pub delay: Duration,
    /// Double the delay after each failed attempt.
    pub exponential: bool,
    pub max_delay: Duration,
}

impl RetryConfig {
    /// Constant delay equal to the limiter window, 5 attempts.
    pub fn from_period(period: Duration) -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: period,
            exponential: false,
            max_delay: period,
        }
    }

    pub fn with_max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n.max(1);
        self
    }

    pub fn with_exponential(mut self, max_delay: Duration) -> Self {
        self.exponential = true;
        self.max_delay = max_delay.max(self.delay);
        self
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::from_period(Duration::from_secs(1))
    }
}

pub struct Retrier {
    config: RetryConfig,
}

impl Retrier {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Delay before the next attempt; `attempt` is 0-based (first failure => 0).
    fn backoff(&self, attempt: u32, err: &Error) -> Duration {
        // A limiter denial knows exactly when the next slot opens.
        if let Error::RateLimited { retry_after_ms } = err {
            let ceiling = self.config.delay.max(Duration::from_millis(1));
            return Duration::from_millis(*retry_after_ms).min(ceiling);
        }
        if !self.config.exponential {
            return self.config.delay;
        }
        let base = self.config.delay.as_millis() as u64;
        let cap = self.config.max_delay.as_millis() as u64;
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(base.saturating_mul(factor).min(cap))
    }

    /// Run `op` until it succeeds, fails with a non-transient error, or the
    /// attempt budget is spent. The last error is returned in the latter cases.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() && attempt + 1 < self.config.max_attempts => {
                    let delay = self.backoff(attempt, &e);
                    debug!(
                        call = label,
                        attempt = attempt + 1,
                        max_attempts = self.config.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying transient failure"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
