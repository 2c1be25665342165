//! Convenient re-exports for common reattempt types.
pub use crate::{
    backoff::{Jitter, Sleeper, TokioSleeper, WaitStrategy, MAX_WAIT},
    classify::Verdict,
    config::{ConfigError, ErrorKind, RetryConfig, RetryConfigBuilder},
    error::{FailureCause, RetryError},
    event::{EventKind, OutcomeKind, RetryEvent},
    publisher::{EventPublisher, SubscriptionHandle},
    registry::RetryRegistry,
    retry::Retry,
};
