//! `Context`: a cancellation token with an optional deadline.

use super::{Cancellation, ContextError};
use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Clonable handle that fires when cancelled explicitly or when its deadline
/// passes, whichever is observed first.
///
/// Clones share state: cancelling one clone cancels all of them. Use
/// [`Context::child`] to derive a context that can be cancelled on its own
/// while still following its parent.
#[derive(Debug, Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    token: CancellationToken,
    deadline: Option<Instant>,
    /// First terminal condition observed; never overwritten.
    cause: OnceLock<ContextError>,
    parent: Option<Arc<Inner>>,
}

impl Inner {
    fn err(&self) -> Option<ContextError> {
        if let Some(cause) = self.cause.get() {
            return Some(*cause);
        }
        if let Some(parent) = &self.parent {
            if let Some(cause) = parent.err() {
                return Some(*self.cause.get_or_init(|| cause));
            }
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Some(*self.cause.get_or_init(|| ContextError::DeadlineExceeded));
            }
        }
        if self.token.is_cancelled() {
            return Some(*self.cause.get_or_init(|| ContextError::Canceled));
        }
        None
    }
}

impl Context {
    /// A context that never expires; it fires only if cancelled.
    pub fn background() -> Self {
        Self::root(None)
    }

    /// A context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::root(Some(deadline_after(timeout)))
    }

    /// A context that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::root(Some(deadline))
    }

    fn root(deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(Inner {
                token: CancellationToken::new(),
                deadline,
                cause: OnceLock::new(),
                parent: None,
            }),
        }
    }

    /// Derive a context that fires when this one does, or when it is cancelled
    /// itself. Cancelling the child leaves the parent untouched.
    pub fn child(&self) -> Self {
        self.derive(self.inner.deadline)
    }

    /// Like [`Context::child`], additionally expiring `timeout` from now.
    /// The child keeps the parent's deadline if that one is earlier.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let own = deadline_after(timeout);
        let deadline = match self.inner.deadline {
            Some(parent) => parent.min(own),
            None => own,
        };
        self.derive(Some(deadline))
    }

    fn derive(&self, deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(Inner {
                token: self.inner.token.child_token(),
                deadline,
                cause: OnceLock::new(),
                parent: Some(Arc::clone(&self.inner)),
            }),
        }
    }

    /// Cancel this context and every context derived from it.
    /// Has no effect on the reported error if the context already fired.
    pub fn cancel(&self) {
        // Latch the cause before waking waiters so they observe it.
        if self.inner.err().is_none() {
            self.inner.cause.get_or_init(|| ContextError::Canceled);
        }
        self.inner.token.cancel();
    }

    /// The instant this context expires, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// `Some` once the context has been cancelled or its deadline has passed.
    pub fn err(&self) -> Option<ContextError> {
        self.inner.err()
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Wait until the context fires and return why.
    pub async fn done(&self) -> ContextError {
        if let Some(cause) = self.err() {
            return cause;
        }
        match self.inner.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    () = self.inner.token.cancelled() => {}
                    () = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.inner.token.cancelled().await,
        }
        // Either branch leaves a terminal condition for err() to latch.
        self.err().unwrap_or(ContextError::Canceled)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Cancellation for Context {
    fn err(&self) -> Option<ContextError> {
        Context::err(self)
    }

    fn done(&self) -> impl Future<Output = ContextError> + Send + '_ {
        Context::done(self)
    }
}

fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    // Saturate absurd timeouts instead of panicking on overflow.
    now.checked_add(timeout)
        .unwrap_or_else(|| now + Duration::from_secs(86_400 * 365 * 30))
}
