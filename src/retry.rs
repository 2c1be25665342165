//! The retry executor.
//!
//! A [`Retry`] decorates a fallible operation with a policy-driven attempt
//! loop. Each invocation runs attempts strictly in sequence: invoke,
//! classify, then either return the value, surface a terminal failure,
//! or wait and try again until the attempt budget is consumed. Every
//! transition is published through the executor's event stream before the
//! loop proceeds.
//!
//! Semantics:
//! - `max_attempts` counts total invocations; the initial call is attempt 1.
//! - Terminal failures surface immediately, regardless of remaining budget.
//! - Exhaustion wraps the last retryable failure (error or rejected value).
//! - The inter-attempt wait is the only suspension point. The blocking form
//!   parks the calling thread; the async form registers a timer through the
//!   executor's [`Sleeper`] and never blocks a worker.
//! - Cancellation during a wait aborts before the next attempt starts and
//!   surfaces as [`RetryError::Cancelled`]. Cancellation during the
//!   operation itself is the operation's concern; whatever it returns is
//!   classified normally.
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use reattempt::{Retry, RetryConfig};
//!
//! #[derive(Debug)]
//! struct Unavailable;
//! # impl std::fmt::Display for Unavailable {
//! #     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//! #         write!(f, "unavailable")
//! #     }
//! # }
//! # impl std::error::Error for Unavailable {}
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let config = RetryConfig::builder()
//!     .max_attempts(3)
//!     .wait_duration(Duration::from_millis(10))
//!     .build()
//!     .unwrap();
//! let retry = Retry::new("upstream", config);
//! let result: Result<u32, _> = retry.execute(|| async { Err::<u32, _>(Unavailable) }).await;
//! assert!(result.unwrap_err().is_exhausted());
//! # });
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::backoff::{Sleeper, TokioSleeper};
use crate::classify::{classify, Verdict};
use crate::config::RetryConfig;
use crate::error::{FailureCause, RetryError};
use crate::event::{EventKind, RetryEvent};
use crate::publisher::EventPublisher;

/// Per-invocation bookkeeping, exclusive to one decorated call.
struct RetryContext {
    attempt: usize,
    waited: Duration,
}

impl RetryContext {
    fn start() -> Self {
        Self { attempt: 1, waited: Duration::ZERO }
    }

    fn advance(&mut self, waited: Duration) {
        self.attempt += 1;
        self.waited = self.waited.saturating_add(waited);
    }
}

/// What the loop does after processing one outcome.
enum Step<T, E> {
    Done(Result<T, RetryError<T, E>>),
    Wait(Duration),
}

/// Policy-driven retry executor for operations returning `Result<T, E>`.
pub struct Retry<T, E> {
    name: Arc<str>,
    config: Arc<RetryConfig<T, E>>,
    events: EventPublisher<T, E>,
    sleeper: Arc<dyn Sleeper>,
}

impl<T, E> Clone for Retry<T, E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            config: self.config.clone(),
            events: self.events.clone(),
            sleeper: self.sleeper.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Retry<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retry")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("events", &self.events)
            .finish()
    }
}

impl<T, E> Retry<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Create an executor for `config`, named for its event stream.
    pub fn new(name: impl Into<Arc<str>>, config: RetryConfig<T, E>) -> Self {
        Self {
            name: name.into(),
            config: Arc::new(config),
            events: EventPublisher::new(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the sleeper used by the async form (for tests).
    pub fn with_sleeper<S>(mut self, sleeper: S) -> Self
    where
        S: Sleeper + 'static,
    {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// The executor's name, as carried by its events.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The policy governing this executor.
    pub fn config(&self) -> &RetryConfig<T, E> {
        &self.config
    }

    /// The executor's event stream.
    pub fn events(&self) -> &EventPublisher<T, E> {
        &self.events
    }

    /// Run `operation` under this policy on the calling thread, blocking it
    /// for each inter-attempt wait.
    pub fn call<F>(&self, mut operation: F) -> Result<T, RetryError<T, E>>
    where
        F: FnMut() -> Result<T, E>,
    {
        self.run_blocking(&mut operation, None)
    }

    /// Blocking form that observes `token` at the wait. The wait itself is
    /// not interruptible; the token is checked before and after it, which
    /// still guarantees no further attempt starts once canceled.
    pub fn call_cancellable<F>(
        &self,
        token: &CancellationToken,
        mut operation: F,
    ) -> Result<T, RetryError<T, E>>
    where
        F: FnMut() -> Result<T, E>,
    {
        self.run_blocking(&mut operation, Some(token))
    }

    /// Run `operation` under this policy, suspending on the tokio timer
    /// between attempts.
    pub async fn execute<F, Fut>(&self, mut operation: F) -> Result<T, RetryError<T, E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run(&mut operation, None).await
    }

    /// Async form racing each wait against `token`.
    pub async fn execute_cancellable<F, Fut>(
        &self,
        token: &CancellationToken,
        mut operation: F,
    ) -> Result<T, RetryError<T, E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run(&mut operation, Some(token)).await
    }

    /// Wrap a blocking operation into one with the same shape plus this
    /// executor's retry semantics and event feed.
    pub fn decorate<F>(&self, mut operation: F) -> impl FnMut() -> Result<T, RetryError<T, E>>
    where
        F: FnMut() -> Result<T, E>,
    {
        let retry = self.clone();
        move || retry.run_blocking(&mut operation, None)
    }

    /// Wrap an async operation into one with the same shape plus this
    /// executor's retry semantics and event feed.
    pub fn decorate_async<F, Fut>(
        &self,
        operation: F,
    ) -> impl FnMut() -> BoxFuture<'static, Result<T, RetryError<T, E>>>
    where
        F: FnMut() -> Fut + Clone + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let retry = self.clone();
        move || {
            let retry = retry.clone();
            let mut operation = operation.clone();
            Box::pin(async move { retry.run(&mut operation, None).await })
        }
    }

    fn run_blocking<F>(
        &self,
        operation: &mut F,
        token: Option<&CancellationToken>,
    ) -> Result<T, RetryError<T, E>>
    where
        F: FnMut() -> Result<T, E>,
    {
        let mut ctx = RetryContext::start();
        loop {
            let outcome = operation();
            match self.step(&ctx, outcome) {
                Step::Done(result) => return result,
                Step::Wait(wait) => {
                    if let Some(token) = token {
                        if token.is_cancelled() {
                            return Err(RetryError::Cancelled { attempt: ctx.attempt });
                        }
                    }
                    std::thread::sleep(wait);
                    if let Some(token) = token {
                        if token.is_cancelled() {
                            return Err(RetryError::Cancelled { attempt: ctx.attempt });
                        }
                    }
                    ctx.advance(wait);
                }
            }
        }
    }

    async fn run<F, Fut>(
        &self,
        operation: &mut F,
        token: Option<&CancellationToken>,
    ) -> Result<T, RetryError<T, E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut ctx = RetryContext::start();
        loop {
            let outcome = operation().await;
            match self.step(&ctx, outcome) {
                Step::Done(result) => return result,
                Step::Wait(wait) => {
                    match token {
                        Some(token) => {
                            if token.is_cancelled() {
                                return Err(RetryError::Cancelled { attempt: ctx.attempt });
                            }
                            tokio::select! {
                                _ = self.sleeper.sleep(wait) => {}
                                _ = token.cancelled() => {
                                    return Err(RetryError::Cancelled { attempt: ctx.attempt });
                                }
                            }
                        }
                        None => self.sleeper.sleep(wait).await,
                    }
                    ctx.advance(wait);
                }
            }
        }
    }

    /// Classify one outcome and emit the transition's events. Returns the
    /// wait owed before the next attempt, or the final result.
    fn step(&self, ctx: &RetryContext, outcome: Result<T, E>) -> Step<T, E> {
        match (classify(&outcome, &self.config), outcome) {
            (Verdict::Accept, Ok(value)) => {
                let kind = if ctx.attempt == 1 {
                    EventKind::SuccessWithoutRetry
                } else {
                    EventKind::SuccessAfterRetry { retries: ctx.attempt - 1 }
                };
                self.publish(ctx.attempt, kind);
                Step::Done(Ok(value))
            }
            (Verdict::Terminal, Err(error)) => {
                let error = Arc::new(error);
                debug!(
                    target: "reattempt",
                    policy = %self.name,
                    attempt = ctx.attempt,
                    "terminal failure"
                );
                self.publish(ctx.attempt, EventKind::TerminalFailure { error: error.clone() });
                Step::Done(Err(RetryError::Terminal { attempt: ctx.attempt, error }))
            }
            (Verdict::Retry, outcome) => {
                let cause = match outcome {
                    Ok(value) => FailureCause::Rejected(Arc::new(value)),
                    Err(error) => FailureCause::Error(Arc::new(error)),
                };
                let exhausted = ctx.attempt >= self.config.max_attempts();
                let wait = if exhausted { None } else { Some(self.config.wait_after(ctx.attempt)) };
                self.publish(
                    ctx.attempt,
                    EventKind::RetryableFailure { cause: cause.clone(), wait },
                );
                if let Some(wait) = wait {
                    debug!(
                        target: "reattempt",
                        policy = %self.name,
                        attempt = ctx.attempt,
                        ?wait,
                        "retryable failure; waiting before next attempt"
                    );
                    Step::Wait(wait)
                } else {
                    self.publish(
                        ctx.attempt,
                        EventKind::Exhausted {
                            attempts: ctx.attempt,
                            cause: cause.clone(),
                            waited: ctx.waited,
                        },
                    );
                    Step::Done(Err(RetryError::Exhausted { attempts: ctx.attempt, cause }))
                }
            }
            // The classifier accepts only successful outcomes and declares
            // terminal only errors.
            (Verdict::Accept, Err(_)) | (Verdict::Terminal, Ok(_)) => {
                debug_assert!(false, "classifier verdict contradicts outcome shape");
                unreachable!()
            }
        }
    }

    fn publish(&self, attempt: usize, kind: EventKind<T, E>) {
        let event = RetryEvent::new(self.name.clone(), attempt, kind);
        self.events.publish(&event);
    }
}
