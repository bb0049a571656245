//! Bounded exponential backoff for REST calls.

use crate::error::{BalanceError, TransportError};
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

/// Outcome of a failed attempt.
#[derive(Debug)]
pub enum AttemptError {
    /// Worth retrying: connection trouble, timeouts, non-2xx status.
    Transient(TransportError),
    /// Retrying cannot help (bad payload, API rejection).
    Fatal(BalanceError),
}

impl From<TransportError> for AttemptError {
    fn from(e: TransportError) -> Self {
        AttemptError::Transient(e)
    }
}

/// Retry schedule: `max_attempts` tries, waiting `base_wait * 2^(n-1)` after failure `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_wait: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_wait: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_wait,
        }
    }

    /// Wait before the attempt following failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_wait.saturating_mul(factor)
    }

    /// All waits taken when every attempt fails. No wait follows the last attempt.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..self.max_attempts).map(|a| self.delay_after(a)).collect()
    }

    /// Run `op` until it succeeds, fails fatally, or the attempts run out.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, BalanceError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AttemptError>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(AttemptError::Fatal(e)) => return Err(e),
                Err(AttemptError::Transient(e)) if attempt < self.max_attempts => {
                    let wait = self.delay_after(attempt);
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        wait_secs = wait.as_secs_f64(),
                        error = %e,
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(AttemptError::Transient(e)) => {
                    error!(
                        attempts = self.max_attempts,
                        error = %e,
                        "Giving up after exhausting retries"
                    );
                    return Err(BalanceError::Network {
                        attempts: self.max_attempts,
                        source: e,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    fn unavailable() -> AttemptError {
        AttemptError::Transient(TransportError::Status {
            status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            body: "maintenance".to_string(),
        })
    }

    #[test]
    fn test_schedule_doubles() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        assert_eq!(
            policy.schedule(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );

        let policy = RetryPolicy::new(5, Duration::from_millis(250));
        assert_eq!(policy.delay_after(4), Duration::from_secs(2));
        assert_eq!(policy.schedule().len(), 4);
    }

    #[test]
    fn test_single_attempt_never_waits() {
        assert!(RetryPolicy::new(1, Duration::from_secs(5)).schedule().is_empty());
        // Zero is clamped to one attempt.
        assert_eq!(RetryPolicy::new(0, Duration::from_secs(1)).max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_failures_then_success_waits_one_then_two_seconds() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        let started = Instant::now();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let result = policy
            .run(|attempt| {
                let seen = seen.clone();
                async move {
                    seen.lock().unwrap().push(started.elapsed());
                    if attempt < 3 {
                        Err(unavailable())
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                Duration::ZERO,
                Duration::from_secs(1),
                Duration::from_secs(3),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_yield_network_error() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        let started = Instant::now();
        let mut calls = 0;

        let result: Result<(), _> = policy
            .run(|_| {
                calls += 1;
                async { Err(unavailable()) }
            })
            .await;

        match result {
            Err(BalanceError::Network { attempts, source }) => {
                assert_eq!(attempts, 3);
                assert!(source.to_string().contains("maintenance"));
            }
            other => panic!("expected network error, got {:?}", other),
        }
        assert_eq!(calls, 3);
        // 1s + 2s, nothing after the final attempt.
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_is_not_retried() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        let mut calls = 0;

        let result: Result<(), _> = policy
            .run(|_| {
                calls += 1;
                async { Err(AttemptError::Fatal(BalanceError::Parse("bad".to_string()))) }
            })
            .await;

        assert!(matches!(result, Err(BalanceError::Parse(_))));
        assert_eq!(calls, 1);
    }
}
