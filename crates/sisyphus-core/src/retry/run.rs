//! Retry loop: call an operation until it succeeds, the classifier gives up,
//! or the cancellation source fires.

use super::backoff::{timer_jitter, Backoff};
use super::error::RetryError;
use crate::context::Cancellation;
use std::future::Future;
use std::time::Duration;

/// Jittered, capped exponential backoff.
///
/// The wait before retry `n` is drawn uniformly from `[0, d)`, where `d`
/// starts at `initial` and doubles after every retryable failure, capped at
/// `max`. A `Retrier` holds no per-run state, so one value can drive any
/// number of concurrent retry runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retrier {
    initial: Duration,
    max: Duration,
}

impl Retrier {
    /// Build a retrier. `initial` below 1ns is raised to 1ns and `max` below
    /// `initial` is raised to `initial`; neither is an error.
    pub fn new(initial: Duration, max: Duration) -> Self {
        let floor = Duration::from_nanos(1);
        let clamped_initial = initial.max(floor);
        let clamped_max = max.max(clamped_initial);
        if clamped_initial != initial || clamped_max != max {
            tracing::debug!(
                ?initial,
                ?max,
                initial_used = ?clamped_initial,
                max_used = ?clamped_max,
                "retrier bounds normalized"
            );
        }
        Self {
            initial: clamped_initial,
            max: clamped_max,
        }
    }

    /// 1s initial ceiling, 30s cap.
    pub const DEFAULT: Retrier = Retrier {
        initial: Duration::from_secs(1),
        max: Duration::from_secs(30),
    };

    /// Smallest backoff ceiling.
    pub fn initial(&self) -> Duration {
        self.initial
    }

    /// Largest backoff ceiling.
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Fresh ceiling sequence, as used by a single retry run.
    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.initial, self.max)
    }

    /// Call `f` until it succeeds or `ctx` fires.
    ///
    /// If `ctx` has already fired, `f` is never called.
    pub async fn retry<C, F, Fut, T, E>(&self, ctx: &C, f: F) -> Result<T, RetryError<E>>
    where
        C: Cancellation,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.retry_if(ctx, f, |_: &E| true).await
    }

    /// Call `f` until it succeeds, fails with an error for which
    /// `should_retry` returns false, or `ctx` fires.
    ///
    /// A rejected error is returned unchanged as [`RetryError::Operation`].
    /// If `ctx` fires during a backoff wait, its error is returned instead of
    /// the last operation error. If `ctx` has already fired, `f` is never
    /// called.
    pub async fn retry_if<C, F, Fut, T, E, P>(
        &self,
        ctx: &C,
        mut f: F,
        mut should_retry: P,
    ) -> Result<T, RetryError<E>>
    where
        C: Cancellation,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: FnMut(&E) -> bool,
    {
        if let Some(err) = ctx.err() {
            tracing::debug!(%err, "context already done, operation not attempted");
            return Err(RetryError::Context(err));
        }

        let mut backoff = self.backoff();
        let mut attempt: u64 = 1;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(e) if !should_retry(&e) => {
                    tracing::trace!(attempt, "error not retryable, giving up");
                    return Err(RetryError::Operation(e));
                }
                Err(_) => {}
            }

            let ceiling = backoff.next().unwrap_or(self.max);
            // Whole timer ticks, so the rounded-up sleep still ends before the ceiling.
            let wait = timer_jitter(ceiling);
            tracing::debug!(attempt, ?ceiling, ?wait, "attempt failed, backing off");

            // Dropping the losing branch deregisters the timer.
            tokio::select! {
                biased;
                err = ctx.done() => {
                    tracing::debug!(attempt, %err, "context done during backoff");
                    return Err(RetryError::Context(err));
                }
                () = tokio::time::sleep(wait) => {}
            }
            attempt += 1;
        }
    }
}

impl Default for Retrier {
    fn default() -> Self {
        Self::DEFAULT
    }
}
