//! Cancellation and deadline handling for retry loops.
//!
//! A retry loop only ever asks two things of its cancellation source: has it
//! already fired, and when will it fire. [`Cancellation`] captures exactly that.
//! [`Context`] is the implementation shipped with the crate; it pairs a
//! `tokio_util` cancellation token with an optional deadline.

mod deadline;

pub use deadline::Context;

use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Terminal condition of a cancellation source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    /// The source was cancelled explicitly.
    #[error("operation canceled")]
    Canceled,
    /// The source's deadline elapsed.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// A source of "stop now" signals that the retrier polls before the first
/// attempt and races against every backoff wait.
pub trait Cancellation {
    /// Non-blocking check: `Some` once the source has fired.
    fn err(&self) -> Option<ContextError>;

    /// Resolves once the source fires, yielding the terminal error.
    /// Must resolve immediately if the source has already fired.
    fn done(&self) -> impl Future<Output = ContextError> + Send + '_;
}

impl<T: Cancellation + ?Sized> Cancellation for &T {
    fn err(&self) -> Option<ContextError> {
        (**self).err()
    }

    fn done(&self) -> impl Future<Output = ContextError> + Send + '_ {
        (**self).done()
    }
}

/// A bare token can only be cancelled, so it never reports a deadline.
impl Cancellation for CancellationToken {
    fn err(&self) -> Option<ContextError> {
        self.is_cancelled().then_some(ContextError::Canceled)
    }

    fn done(&self) -> impl Future<Output = ContextError> + Send + '_ {
        async move {
            self.cancelled().await;
            ContextError::Canceled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_condition() {
        assert_eq!(ContextError::Canceled.to_string(), "operation canceled");
        assert_eq!(ContextError::DeadlineExceeded.to_string(), "deadline exceeded");
    }

    #[tokio::test]
    async fn token_reports_canceled() {
        let token = CancellationToken::new();
        assert_eq!(Cancellation::err(&token), None);
        token.cancel();
        assert_eq!(Cancellation::err(&token), Some(ContextError::Canceled));
        assert_eq!(Cancellation::done(&token).await, ContextError::Canceled);
    }

    #[tokio::test]
    async fn reference_delegates() {
        let token = CancellationToken::new();
        let by_ref = &token;
        token.cancel();
        assert_eq!(Cancellation::err(&by_ref), Some(ContextError::Canceled));
        assert_eq!(Cancellation::done(&by_ref).await, ContextError::Canceled);
    }
}
