//! Bounded-retry driver for asynchronous scaling activities.
//!
//! Resize and removal calls return an activity handle immediately; the
//! caller is synchronous, so the adapter blocks here until the activity has
//! completed, a check fails, or the check budget runs out.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Interval between completion checks.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// Number of completion checks before giving up.
pub const DEFAULT_RETRY_LIMIT: u32 = 15;

/// Errors surfaced while waiting for an activity.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum PollError<E>
where
    E: std::error::Error + 'static,
{
    /// Raised when every check in the budget reported "not done".
    #[error("activity not complete after {attempts} checks")]
    Timeout {
        /// Checks performed.
        attempts: u32,
    },
    /// Raised when the caller's cancellation token fired.
    #[error("wait cancelled after {attempts} checks")]
    Cancelled {
        /// Checks performed before cancellation.
        attempts: u32,
    },
    /// Raised when a completion check itself failed.
    #[error("completion check failed: {0}")]
    Check(#[source] E),
}

/// Fixed-interval, fixed-budget completion poller.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ActivityPoller {
    interval: Duration,
    retry_limit: u32,
}

impl Default for ActivityPoller {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_INTERVAL, DEFAULT_RETRY_LIMIT)
    }
}

impl ActivityPoller {
    /// Creates a poller. A zero `retry_limit` still performs one check.
    #[must_use]
    pub const fn new(interval: Duration, retry_limit: u32) -> Self {
        let limit = if retry_limit == 0 { 1 } else { retry_limit };
        Self {
            interval,
            retry_limit: limit,
        }
    }

    /// Interval slept between checks.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Maximum number of checks.
    #[must_use]
    pub const fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    /// Calls `check` until it reports done, fails, or the budget is spent.
    ///
    /// Returns the number of checks performed. No sleep follows the final
    /// check, and no check starts once `cancel` has fired.
    ///
    /// # Errors
    ///
    /// Returns [`PollError::Check`] on the first failing check,
    /// [`PollError::Timeout`] after `retry_limit` unfinished checks, and
    /// [`PollError::Cancelled`] when `cancel` fires.
    pub async fn wait_until_done<F, Fut, E>(
        &self,
        cancel: &CancellationToken,
        mut check: F,
    ) -> Result<u32, PollError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool, E>>,
        E: std::error::Error + 'static,
    {
        let mut attempts = 0_u32;
        loop {
            if cancel.is_cancelled() {
                return Err(PollError::Cancelled { attempts });
            }

            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(PollError::Cancelled { attempts }),
                outcome = check() => outcome,
            };
            attempts = attempts.saturating_add(1);

            if outcome.map_err(PollError::Check)? {
                return Ok(attempts);
            }
            if attempts >= self.retry_limit {
                return Err(PollError::Timeout { attempts });
            }

            debug!(attempts, limit = self.retry_limit, "activity not done yet");
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(PollError::Cancelled { attempts }),
                () = sleep(self.interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error, Eq, PartialEq)]
    #[error("check exploded")]
    struct CheckFailure;

    fn fast(limit: u32) -> ActivityPoller {
        ActivityPoller::new(Duration::from_millis(1), limit)
    }

    #[tokio::test]
    async fn succeeds_on_first_done_check() {
        let calls = Cell::new(0_u32);
        let result = fast(5)
            .wait_until_done(&CancellationToken::new(), || {
                calls.set(calls.get() + 1);
                let done = calls.get() == 3;
                async move { Ok::<_, CheckFailure>(done) }
            })
            .await;
        assert_eq!(result, Ok(3));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn returns_first_error_immediately() {
        let calls = Cell::new(0_u32);
        let result = fast(5)
            .wait_until_done(&CancellationToken::new(), || {
                calls.set(calls.get() + 1);
                async { Err::<bool, _>(CheckFailure) }
            })
            .await;
        assert_eq!(result, Err(PollError::Check(CheckFailure)));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn times_out_after_exact_budget() {
        let calls = Cell::new(0_u32);
        let result = fast(4)
            .wait_until_done(&CancellationToken::new(), || {
                calls.set(calls.get() + 1);
                async { Ok::<_, CheckFailure>(false) }
            })
            .await;
        assert_eq!(result, Err(PollError::Timeout { attempts: 4 }));
        assert_eq!(calls.get(), 4);
    }

    #[tokio::test]
    async fn zero_limit_still_checks_once() {
        let poller = fast(0);
        assert_eq!(poller.retry_limit(), 1);
        let result = poller
            .wait_until_done(&CancellationToken::new(), || async {
                Ok::<_, CheckFailure>(false)
            })
            .await;
        assert_eq!(result, Err(PollError::Timeout { attempts: 1 }));
    }

    #[tokio::test]
    async fn cancelled_token_prevents_any_check() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let calls = Cell::new(0_u32);
        let result = fast(3)
            .wait_until_done(&cancel, || {
                calls.set(calls.get() + 1);
                async { Ok::<_, CheckFailure>(true) }
            })
            .await;
        assert_eq!(result, Err(PollError::Cancelled { attempts: 0 }));
        assert_eq!(calls.get(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_sleep_stops_further_checks() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(15)).await;
            trigger.cancel();
        });
        let calls = Cell::new(0_u32);
        let result = ActivityPoller::default()
            .wait_until_done(&cancel, || {
                calls.set(calls.get() + 1);
                async { Ok::<_, CheckFailure>(false) }
            })
            .await;
        assert_eq!(result, Err(PollError::Cancelled { attempts: 2 }));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn default_matches_documented_budget() {
        let poller = ActivityPoller::default();
        assert_eq!(poller.interval(), Duration::from_secs(10));
        assert_eq!(poller.retry_limit(), 15);
    }
}
