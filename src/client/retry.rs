//! Fixed-interval bounded retry.

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default number of dial attempts.
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// Default pause between failed dial attempts.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

// ============================================================================
// RetryPolicy
// ============================================================================

/// How many times to dial and how long to wait between failures.
///
/// There is no pause after the final failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero means never dial.
    pub attempts: u32,
    /// Pause between consecutive failed attempts.
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with explicit attempts and interval.
    #[inline]
    #[must_use]
    pub const fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// Sets the number of attempts.
    #[inline]
    #[must_use]
    pub const fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Sets the pause between attempts.
    #[inline]
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Runs `operation` until it succeeds or the attempts run out.
    ///
    /// `operation` receives the 1-based attempt number.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DialExhausted`] wrapping the last failure.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 1..=self.attempts {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    debug!(attempt, max_attempts = self.attempts, error = %e, "Attempt failed");
                    last_error = Some(e);

                    if attempt < self.attempts {
                        sleep(self.interval).await;
                    }
                }
            }
        }

        Err(Error::dial_exhausted(self.attempts, last_error))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::Cell;

    use proptest::prelude::*;
    use tokio::time::Instant;

    /// Runs `policy` against an operation failing `failures` times.
    ///
    /// Returns (succeeded, calls made, virtual time spent).
    fn run_scripted(policy: RetryPolicy, failures: u32) -> (bool, u32, Duration) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .expect("runtime");

        runtime.block_on(async {
            let calls = Cell::new(0u32);
            let start = Instant::now();

            let result = policy
                .run(|_| {
                    calls.set(calls.get() + 1);
                    let outcome = if calls.get() <= failures {
                        Err(Error::transport("refused"))
                    } else {
                        Ok(())
                    };
                    async move { outcome }
                })
                .await;

            (result.is_ok(), calls.get(), start.elapsed())
        })
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 3);
        assert_eq!(policy.interval, Duration::from_secs(2));
        assert_eq!(policy, RetryPolicy::new(3, Duration::from_secs(2)));
    }

    #[test]
    fn test_builder_setters() {
        let policy = RetryPolicy::default()
            .with_attempts(5)
            .with_interval(Duration::from_millis(250));
        assert_eq!(policy, RetryPolicy::new(5, Duration::from_millis(250)));
    }

    #[test]
    fn test_zero_attempts_fails_immediately() {
        let (ok, calls, elapsed) = run_scripted(RetryPolicy::new(0, Duration::from_secs(1)), 0);
        assert!(!ok);
        assert_eq!(calls, 0);
        assert_eq!(elapsed, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_exhausted_wraps_last_error() {
        let err = RetryPolicy::new(2, Duration::ZERO)
            .run(|attempt| async move {
                Err::<(), _>(Error::transport(format!("attempt {attempt}")))
            })
            .await
            .unwrap_err();

        match err {
            Error::DialExhausted {
                attempts,
                last_error: Some(last),
            } => {
                assert_eq!(attempts, 2);
                assert_eq!(last.to_string(), "Transport error: attempt 2");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    proptest! {
        #[test]
        fn prop_sleeps_only_between_failed_attempts(
            attempts in 1u32..6,
            failures in 0u32..8,
            interval_ms in 0u64..3_000,
        ) {
            let interval = Duration::from_millis(interval_ms);
            let (ok, calls, elapsed) = run_scripted(RetryPolicy::new(attempts, interval), failures);

            prop_assert_eq!(ok, failures < attempts);
            prop_assert_eq!(calls, (failures + 1).min(attempts));
            // The paused clock only advances to timer deadlines, rounded to
            // whole milliseconds.
            let expected = interval * (calls - 1);
            prop_assert!(elapsed >= expected);
            prop_assert!(elapsed - expected < Duration::from_millis(u64::from(calls)));
        }
    }
}
