//! Terminal error of a retry run.

use crate::context::ContextError;
use std::fmt;

/// Why a retry run stopped without a value.
///
/// The operation's error is carried as-is; `Display` and `source` forward to
/// whichever error is inside so the variant adds no text of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// The cancellation source fired before the first attempt or during a wait.
    Context(ContextError),
    /// The operation failed with an error the classifier refused to retry.
    Operation(E),
}

impl<E> RetryError<E> {
    pub fn is_context(&self) -> bool {
        matches!(self, RetryError::Context(_))
    }

    /// The cancellation error, if the run was cut short.
    pub fn context_error(&self) -> Option<ContextError> {
        match self {
            RetryError::Context(e) => Some(*e),
            RetryError::Operation(_) => None,
        }
    }

    /// The operation's own error, if that is what ended the run.
    pub fn into_operation(self) -> Option<E> {
        match self {
            RetryError::Operation(e) => Some(e),
            RetryError::Context(_) => None,
        }
    }
}

impl<E> From<ContextError> for RetryError<E> {
    fn from(e: ContextError) -> Self {
        RetryError::Context(e)
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Context(e) => write!(f, "{}", e),
            RetryError::Operation(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RetryError::Context(e) => std::error::Error::source(e),
            RetryError::Operation(e) => e.source(),
        }
    }
}
