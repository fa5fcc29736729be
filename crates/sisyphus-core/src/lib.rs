//! Jittered, capped exponential backoff for retrying fallible async operations.
//!
//! The free functions [`retry`] and [`retry_if`] use a shared default
//! [`Retrier`] whose backoff ceiling starts at 1 second and doubles up to 30
//! seconds. Build your own [`Retrier`] (or a [`BackoffConfig`]) to change
//! those bounds.
//!
//! Every wait is drawn uniformly from `[0, ceiling)` ("full jitter"), so
//! independent callers that fail together do not retry together.
//!
//! Pass a [`Context`] (or any other [`Cancellation`]) to put an overall
//! deadline on a run or to cancel it at any time. The cancellation source is
//! checked before the first attempt and raced against every wait; an
//! in-flight attempt is never interrupted.

pub mod config;
pub mod context;
pub mod retry;

pub use config::BackoffConfig;
pub use context::{Cancellation, Context, ContextError};
pub use retry::{
    jitter, jitter_with, timer_jitter, timer_jitter_with, Backoff, Retrier, RetryError, TIMER_TICK,
};

use std::future::Future;

/// Bounds used by the free functions: 1s initial ceiling, 30s cap.
pub static DEFAULT_RETRIER: Retrier = Retrier::DEFAULT;

/// Call `f` with the default retrier until it succeeds or `ctx` fires.
///
/// If `ctx` has already fired, `f` is never called.
pub async fn retry<C, F, Fut, T, E>(ctx: &C, f: F) -> Result<T, RetryError<E>>
where
    C: Cancellation,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    DEFAULT_RETRIER.retry(ctx, f).await
}

/// Call `f` with the default retrier until it succeeds, fails with an error
/// for which `should_retry` returns false, or `ctx` fires.
pub async fn retry_if<C, F, Fut, T, E, P>(
    ctx: &C,
    f: F,
    should_retry: P,
) -> Result<T, RetryError<E>>
where
    C: Cancellation,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: FnMut(&E) -> bool,
{
    DEFAULT_RETRIER.retry_if(ctx, f, should_retry).await
}
