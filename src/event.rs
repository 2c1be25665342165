//! Lifecycle events emitted during retry execution.
//!
//! One event is published per state transition: a retryable failure, a
//! terminal failure, a success (with or without preceding retries), or
//! exhaustion of the attempt budget. Events are delivered synchronously
//! through the executor's [`EventPublisher`](crate::publisher::EventPublisher)
//! before the loop takes its next step.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::error::FailureCause;

/// Discriminant of a lifecycle event, used by the convenience filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    /// An attempt failed and another may follow.
    RetryableFailure,
    /// An attempt failed in a way that surfaces immediately.
    TerminalFailure,
    /// The first attempt was accepted.
    SuccessWithoutRetry,
    /// A later attempt was accepted.
    SuccessAfterRetry,
    /// The attempt budget was consumed without acceptance.
    Exhausted,
}

impl OutcomeKind {
    /// Whether this outcome accepted a value.
    pub fn is_success(self) -> bool {
        matches!(self, Self::SuccessWithoutRetry | Self::SuccessAfterRetry)
    }

    /// Whether this outcome surfaces an error to the caller.
    pub fn is_error(self) -> bool {
        matches!(self, Self::TerminalFailure | Self::Exhausted)
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RetryableFailure => "retryable-failure",
            Self::TerminalFailure => "terminal-failure",
            Self::SuccessWithoutRetry => "success-without-retry",
            Self::SuccessAfterRetry => "success-after-retry",
            Self::Exhausted => "exhausted",
        };
        f.write_str(name)
    }
}

/// Payload of a lifecycle event.
#[derive(Debug, Clone)]
pub enum EventKind<T, E> {
    /// An attempt failed retryably.
    RetryableFailure {
        /// What failed: the error or the rejected value.
        cause: FailureCause<T, E>,
        /// Delay scheduled before the next attempt; `None` when the budget
        /// is exhausted and no further attempt follows.
        wait: Option<Duration>,
    },
    /// An attempt failed terminally.
    TerminalFailure {
        /// The offending error.
        error: Arc<E>,
    },
    /// The first attempt was accepted.
    SuccessWithoutRetry,
    /// A later attempt was accepted.
    SuccessAfterRetry {
        /// Retries performed before acceptance.
        retries: usize,
    },
    /// Every allowed attempt failed retryably.
    Exhausted {
        /// Total attempts made.
        attempts: usize,
        /// The last retryable failure.
        cause: FailureCause<T, E>,
        /// Cumulative time spent waiting between attempts.
        waited: Duration,
    },
}

impl<T, E> EventKind<T, E> {
    /// The event's discriminant.
    pub fn outcome(&self) -> OutcomeKind {
        match self {
            Self::RetryableFailure { .. } => OutcomeKind::RetryableFailure,
            Self::TerminalFailure { .. } => OutcomeKind::TerminalFailure,
            Self::SuccessWithoutRetry => OutcomeKind::SuccessWithoutRetry,
            Self::SuccessAfterRetry { .. } => OutcomeKind::SuccessAfterRetry,
            Self::Exhausted { .. } => OutcomeKind::Exhausted,
        }
    }
}

/// One lifecycle event, emitted at a single state transition of a single
/// decorated call.
#[derive(Debug, Clone)]
pub struct RetryEvent<T, E> {
    /// Name of the policy that emitted the event.
    pub policy: Arc<str>,
    /// Attempt the event belongs to (1-indexed).
    pub attempt: usize,
    /// Wall-clock time of emission.
    pub timestamp: SystemTime,
    /// What happened.
    pub kind: EventKind<T, E>,
}

impl<T, E> RetryEvent<T, E> {
    pub(crate) fn new(policy: Arc<str>, attempt: usize, kind: EventKind<T, E>) -> Self {
        Self { policy, attempt, timestamp: SystemTime::now(), kind }
    }

    /// The event's discriminant.
    pub fn outcome(&self) -> OutcomeKind {
        self.kind.outcome()
    }

    /// Retries performed up to this event.
    pub fn retry_count(&self) -> usize {
        match &self.kind {
            EventKind::SuccessAfterRetry { retries } => *retries,
            EventKind::Exhausted { attempts, .. } => attempts.saturating_sub(1),
            _ => self.attempt.saturating_sub(1),
        }
    }

    /// Borrow the offending error, if the event carries one.
    pub fn error(&self) -> Option<&E> {
        match &self.kind {
            EventKind::TerminalFailure { error } => Some(error),
            EventKind::RetryableFailure { cause, .. } | EventKind::Exhausted { cause, .. } => {
                cause.error()
            }
            _ => None,
        }
    }

    /// Borrow the rejected value, if the event carries one.
    pub fn rejected_value(&self) -> Option<&T> {
        match &self.kind {
            EventKind::RetryableFailure { cause, .. } | EventKind::Exhausted { cause, .. } => {
                cause.rejected_value()
            }
            _ => None,
        }
    }
}

impl<T, E: fmt::Display> fmt::Display for RetryEvent<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "retry '{}' attempt {}: ", self.policy, self.attempt)?;
        match &self.kind {
            EventKind::RetryableFailure { cause, wait: Some(wait) } => {
                write!(f, "retryable failure ({}); next attempt in {:?}", cause, wait)
            }
            EventKind::RetryableFailure { cause, wait: None } => {
                write!(f, "retryable failure ({}); budget exhausted", cause)
            }
            EventKind::TerminalFailure { error } => write!(f, "terminal failure ({})", error),
            EventKind::SuccessWithoutRetry => write!(f, "succeeded"),
            EventKind::SuccessAfterRetry { retries } => {
                write!(f, "succeeded after {} retries", retries)
            }
            EventKind::Exhausted { attempts, cause, waited } => write!(
                f,
                "exhausted after {} attempts ({}); waited {:?} in total",
                attempts, cause, waited
            ),
        }
    }
}
