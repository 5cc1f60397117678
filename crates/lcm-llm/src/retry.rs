//! Bounded exponential-backoff retry plus a hard per-call deadline
//! (§4.B): default 5 attempts, 1s base doubling to a 30s cap, 60s
//! timeout. All three calls are idempotent from the caller's
//! perspective, so a blind retry with the same inputs is safe.

use std::future::Future;
use std::time::Duration;

use crate::error::{LlmError, Result};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub cap_delay: Duration,
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            cap_delay: Duration::from_secs(30),
            call_timeout: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        let doubled = self.base_delay.saturating_mul(1u32 << attempt.min(16));
        doubled.min(self.cap_delay)
    }

    /// Run `f` until it succeeds, the deadline is reached on every
    /// attempt, or attempts are exhausted. Each attempt is wrapped in
    /// `call_timeout`; a timed-out attempt counts against the retry
    /// budget like any other transient failure.
    pub async fn run<F, Fut, T>(&self, mut f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_err = LlmError::Unavailable("no attempts made".to_string());
        for attempt in 0..self.max_attempts {
            let outcome = tokio::time::timeout(self.call_timeout, f()).await;
            match outcome {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => last_err = e,
                Err(_) => last_err = LlmError::Unavailable("call timed out".to_string()),
            }
            if attempt + 1 < self.max_attempts {
                tokio::time::sleep(self.delay_for(attempt)).await;
            }
        }
        Err(LlmError::Unavailable(format!(
            "exhausted {} attempts: {last_err}",
            self.max_attempts
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            cap_delay: Duration::from_millis(5),
            call_timeout: Duration::from_secs(1),
        };
        let attempts = AtomicU32::new(0);
        let result = policy
            .run(|| async {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(LlmError::Unavailable("transient".to_string()))
                } else {
                    Ok(42)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn exhausts_and_surfaces_unavailable() {
        let policy = RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            cap_delay: Duration::from_millis(2),
            call_timeout: Duration::from_secs(1),
        };
        let result: Result<()> = policy
            .run(|| async { Err(LlmError::Unavailable("down".to_string())) })
            .await;
        assert!(result.is_err());
    }
}
