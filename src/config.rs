//! Retry policy configuration.
//!
//! A [`RetryConfig`] is built once, validated eagerly, and then shared
//! read-only by every invocation of the executor that holds it.
//!
//! Semantics:
//! - `max_attempts` counts total invocations (initial call + retries).
//! - `wait_duration` sets a fixed delay before each retry; richer schedules
//!   go through [`wait_strategy`](RetryConfigBuilder::wait_strategy).
//! - `retry_on_result` flags a successful value as a failure requiring retry
//!   (defaults to never).
//! - `retry_on_error` decides whether an error is retryable (defaults to
//!   always).
//! - `retry_kinds` / `ignore_kinds` match against an [`ErrorKind`] tag
//!   computed by a user-supplied classifier function; the ignore set always
//!   wins.
//!
//! Invariants:
//! - `max_attempts >= 1`; `build` fails otherwise.
//! - Kind sets without a classifier function fail at `build` time.
//! - Negative wait durations are unrepresentable (`Duration` is unsigned).

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::backoff::{Jitter, WaitStrategy};

/// Total invocations allowed when none is configured.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Delay before each retry when none is configured.
pub const DEFAULT_WAIT: Duration = Duration::from_millis(500);

/// Stable tag identifying a class of errors.
///
/// Kinds are interned names, typically one per error enum variant. The
/// executor never inspects error types at runtime; membership in the retry
/// and ignore sets is decided purely on this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorKind(&'static str);

impl ErrorKind {
    /// Create a kind tag from a static name.
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// The tag's name.
    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Errors produced while building a [`RetryConfig`] or a [`WaitStrategy`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// `max_attempts` must allow at least the initial invocation.
    #[error("max_attempts must be at least 1 (got {0})")]
    MaxAttempts(usize),
    /// `retry_kinds`/`ignore_kinds` need a classifier to compute tags.
    #[error("{option} requires an error classifier; set classify_errors_with")]
    MissingKindClassifier {
        /// The builder option that was set without a classifier.
        option: &'static str,
    },
    /// Wait caps must be positive.
    #[error("wait cap must be greater than zero")]
    ZeroWaitCap,
    /// Wait caps below the base delay would invert the schedule.
    #[error("wait cap ({max:?}) must not be less than the base delay ({base:?})")]
    WaitCapBelowBase {
        /// Base delay of the schedule.
        base: Duration,
        /// Offending cap.
        max: Duration,
    },
    /// Fixed schedules already have a single delay; a cap is meaningless.
    #[error("a fixed wait does not take a cap")]
    FixedWaitCap,
}

type ResultPredicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;
type ErrorPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;
type KindClassifier<E> = Arc<dyn Fn(&E) -> ErrorKind + Send + Sync>;

/// Immutable, validated retry policy.
pub struct RetryConfig<T, E> {
    max_attempts: usize,
    wait: WaitStrategy,
    jitter: Jitter,
    retry_on_result: ResultPredicate<T>,
    retry_on_error: ErrorPredicate<E>,
    error_kind: Option<KindClassifier<E>>,
    retry_kinds: HashSet<ErrorKind>,
    ignore_kinds: HashSet<ErrorKind>,
}

impl<T, E> Clone for RetryConfig<T, E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            wait: self.wait.clone(),
            jitter: self.jitter,
            retry_on_result: self.retry_on_result.clone(),
            retry_on_error: self.retry_on_error.clone(),
            error_kind: self.error_kind.clone(),
            retry_kinds: self.retry_kinds.clone(),
            ignore_kinds: self.ignore_kinds.clone(),
        }
    }
}

impl<T, E> fmt::Debug for RetryConfig<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfig")
            .field("max_attempts", &self.max_attempts)
            .field("wait", &self.wait)
            .field("jitter", &self.jitter)
            .field("retry_on_result", &"<predicate>")
            .field("retry_on_error", &"<predicate>")
            .field("error_kind", &self.error_kind.as_ref().map(|_| "<classifier>"))
            .field("retry_kinds", &self.retry_kinds)
            .field("ignore_kinds", &self.ignore_kinds)
            .finish()
    }
}

impl<T, E> RetryConfig<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Construct a new builder with defaults.
    pub fn builder() -> RetryConfigBuilder<T, E> {
        RetryConfigBuilder::new()
    }

    /// Policy with the documented defaults: 3 attempts, fixed 500ms wait,
    /// every error retryable, every value accepted.
    pub fn with_defaults() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            wait: WaitStrategy::fixed(DEFAULT_WAIT),
            jitter: Jitter::None,
            retry_on_result: Arc::new(|_| false),
            retry_on_error: Arc::new(|_| true),
            error_kind: None,
            retry_kinds: HashSet::new(),
            ignore_kinds: HashSet::new(),
        }
    }

    /// Total invocations allowed, including the first.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// The configured wait schedule.
    pub fn wait(&self) -> &WaitStrategy {
        &self.wait
    }

    /// The configured jitter.
    pub fn jitter(&self) -> Jitter {
        self.jitter
    }

    /// Delay to observe after `attempt` failed, jitter applied.
    pub(crate) fn wait_after(&self, attempt: usize) -> Duration {
        self.jitter.apply(self.wait.delay(attempt))
    }

    pub(crate) fn should_retry_result(&self, value: &T) -> bool {
        (self.retry_on_result)(value)
    }

    pub(crate) fn should_retry_error(&self, error: &E) -> bool {
        (self.retry_on_error)(error)
    }

    pub(crate) fn kind_of(&self, error: &E) -> Option<ErrorKind> {
        self.error_kind.as_ref().map(|classify| classify(error))
    }

    pub(crate) fn retries_kind(&self, kind: ErrorKind) -> bool {
        self.retry_kinds.contains(&kind)
    }

    pub(crate) fn ignores_kind(&self, kind: ErrorKind) -> bool {
        self.ignore_kinds.contains(&kind)
    }
}

impl<T, E> Default for RetryConfig<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder<T, E> {
    max_attempts: usize,
    wait: WaitStrategy,
    jitter: Jitter,
    retry_on_result: ResultPredicate<T>,
    retry_on_error: ErrorPredicate<E>,
    error_kind: Option<KindClassifier<E>>,
    retry_kinds: HashSet<ErrorKind>,
    ignore_kinds: HashSet<ErrorKind>,
}

impl<T, E> RetryConfigBuilder<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Create a builder with the documented defaults.
    pub fn new() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            wait: WaitStrategy::fixed(DEFAULT_WAIT),
            jitter: Jitter::None,
            retry_on_result: Arc::new(|_| false),
            retry_on_error: Arc::new(|_| true),
            error_kind: None,
            retry_kinds: HashSet::new(),
            ignore_kinds: HashSet::new(),
        }
    }

    /// Set total invocations allowed (initial + retries). Must be >= 1.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Fixed delay before each retry.
    pub fn wait_duration(mut self, delay: Duration) -> Self {
        self.wait = WaitStrategy::fixed(delay);
        self
    }

    /// Full wait schedule, for growing delays.
    pub fn wait_strategy(mut self, wait: WaitStrategy) -> Self {
        self.wait = wait;
        self
    }

    /// Randomize computed delays.
    pub fn jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = jitter;
        self
    }

    /// Treat a successful value matching `predicate` as a retryable failure.
    pub fn retry_on_result<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.retry_on_result = Arc::new(predicate);
        self
    }

    /// Decide whether an error is retryable. Kinds in the ignore set win
    /// over this predicate.
    pub fn retry_on_error<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.retry_on_error = Arc::new(predicate);
        self
    }

    /// Tag errors with an [`ErrorKind`] so the retry/ignore sets can match
    /// them. Called at most once per classification.
    pub fn classify_errors_with<F>(mut self, classify: F) -> Self
    where
        F: Fn(&E) -> ErrorKind + Send + Sync + 'static,
    {
        self.error_kind = Some(Arc::new(classify));
        self
    }

    /// Kinds that are always retryable, regardless of `retry_on_error`.
    pub fn retry_kinds<I>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = ErrorKind>,
    {
        self.retry_kinds.extend(kinds);
        self
    }

    /// Kinds that are always terminal, winning over everything else.
    pub fn ignore_kinds<I>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = ErrorKind>,
    {
        self.ignore_kinds.extend(kinds);
        self
    }

    /// Build the policy, validating inputs.
    pub fn build(self) -> Result<RetryConfig<T, E>, ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::MaxAttempts(0));
        }
        if self.error_kind.is_none() {
            if !self.retry_kinds.is_empty() {
                return Err(ConfigError::MissingKindClassifier { option: "retry_kinds" });
            }
            if !self.ignore_kinds.is_empty() {
                return Err(ConfigError::MissingKindClassifier { option: "ignore_kinds" });
            }
        }
        Ok(RetryConfig {
            max_attempts: self.max_attempts,
            wait: self.wait,
            jitter: self.jitter,
            retry_on_result: self.retry_on_result,
            retry_on_error: self.retry_on_error,
            error_kind: self.error_kind,
            retry_kinds: self.retry_kinds,
            ignore_kinds: self.ignore_kinds,
        })
    }
}

impl<T, E> Default for RetryConfigBuilder<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
