//! Error types surfaced by decorated calls.

use std::fmt;
use std::sync::Arc;

/// The failure that made an attempt retryable: either an error the policy
/// classified as transient, or a successful value the result predicate
/// rejected.
///
/// Payloads ride in `Arc` so the same failure can appear in a lifecycle
/// event and in the final [`RetryError`] without cloning the underlying
/// value.
#[derive(Debug)]
pub enum FailureCause<T, E> {
    /// The operation returned an error.
    Error(Arc<E>),
    /// The operation succeeded but the value was rejected.
    Rejected(Arc<T>),
}

impl<T, E> Clone for FailureCause<T, E> {
    fn clone(&self) -> Self {
        match self {
            Self::Error(error) => Self::Error(error.clone()),
            Self::Rejected(value) => Self::Rejected(value.clone()),
        }
    }
}

impl<T, E> FailureCause<T, E> {
    /// Borrow the error, if this failure was one.
    pub fn error(&self) -> Option<&E> {
        match self {
            Self::Error(error) => Some(error),
            Self::Rejected(_) => None,
        }
    }

    /// Borrow the rejected value, if this failure was one.
    pub fn rejected_value(&self) -> Option<&T> {
        match self {
            Self::Error(_) => None,
            Self::Rejected(value) => Some(value),
        }
    }

    /// Whether this failure carries an error.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Whether this failure carries a rejected value.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

impl<T, E: fmt::Display> fmt::Display for FailureCause<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(error) => write!(f, "{}", error),
            Self::Rejected(_) => write!(f, "result rejected by retry predicate"),
        }
    }
}

/// Unified error type for decorated calls. Exactly one of these, or the
/// accepted value, reaches the caller per invocation.
#[derive(Debug, Clone)]
pub enum RetryError<T, E> {
    /// A non-retryable outcome surfaced immediately; the attempt counter is
    /// frozen at the attempt that produced it.
    Terminal {
        /// Attempt that produced the error (1-indexed).
        attempt: usize,
        /// The original error.
        error: Arc<E>,
    },
    /// Every allowed attempt classified as a retryable failure.
    Exhausted {
        /// Total attempts made.
        attempts: usize,
        /// The last retryable failure.
        cause: FailureCause<T, E>,
    },
    /// The surrounding context was canceled during an inter-attempt wait.
    Cancelled {
        /// Attempts completed before cancellation.
        attempt: usize,
    },
}

impl<T, E: fmt::Display> fmt::Display for RetryError<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminal { attempt, error } => {
                write!(f, "terminal failure on attempt {}: {}", attempt, error)
            }
            Self::Exhausted { attempts, cause } => {
                write!(f, "retries exhausted after {} attempts; last failure: {}", attempts, cause)
            }
            Self::Cancelled { attempt } => {
                write!(f, "retry canceled while waiting after attempt {}", attempt)
            }
        }
    }
}

impl<T, E> std::error::Error for RetryError<T, E>
where
    T: fmt::Debug,
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Terminal { error, .. } => Some(error.as_ref()),
            Self::Exhausted { cause: FailureCause::Error(error), .. } => Some(error.as_ref()),
            _ => None,
        }
    }
}

impl<T, E> RetryError<T, E> {
    /// Check if this error is a terminal failure.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal { .. })
    }

    /// Check if this error is retry exhaustion.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// Check if this error is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Attempts completed before this error surfaced.
    pub fn attempts(&self) -> usize {
        match self {
            Self::Terminal { attempt, .. } | Self::Cancelled { attempt } => *attempt,
            Self::Exhausted { attempts, .. } => *attempts,
        }
    }

    /// Retries performed before exhaustion, if this is an exhaustion.
    pub fn retry_count(&self) -> Option<usize> {
        match self {
            Self::Exhausted { attempts, .. } => Some(attempts.saturating_sub(1)),
            _ => None,
        }
    }

    /// Borrow the underlying error, if one is recorded.
    pub fn error(&self) -> Option<&E> {
        match self {
            Self::Terminal { error, .. } => Some(error),
            Self::Exhausted { cause, .. } => cause.error(),
            Self::Cancelled { .. } => None,
        }
    }

    /// Borrow the rejected value, if exhaustion ended on one.
    pub fn rejected_value(&self) -> Option<&T> {
        match self {
            Self::Exhausted { cause, .. } => cause.rejected_value(),
            _ => None,
        }
    }

    /// Borrow the last retryable failure, if this is an exhaustion.
    pub fn cause(&self) -> Option<&FailureCause<T, E>> {
        match self {
            Self::Exhausted { cause, .. } => Some(cause),
            _ => None,
        }
    }
}
