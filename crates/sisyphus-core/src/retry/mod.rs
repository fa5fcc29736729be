//! Retry with jittered, capped exponential backoff.
//!
//! `backoff` owns the ceiling sequence and the jitter draw, `run` owns the
//! loop that races each wait against the caller's cancellation source.

mod backoff;
mod error;
mod run;

pub use backoff::{jitter, jitter_with, timer_jitter, timer_jitter_with, Backoff, TIMER_TICK};
pub use error::RetryError;
pub use run::Retrier;
