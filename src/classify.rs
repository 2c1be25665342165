//! Outcome classification.
//!
//! A pure function from one attempt's outcome and the policy to a verdict.
//! The rule order is fixed:
//!
//! 1. an error whose kind is in the ignore set is terminal, always;
//! 2. an error whose kind is in the retry set, or that the error predicate
//!    accepts, is retryable;
//! 3. any other error is terminal;
//! 4. a successful value the result predicate rejects is retryable;
//! 5. any other success is accepted.
//!
//! The ignore set short-circuits everything else; the kind tag is computed
//! at most once per classification.

use crate::config::RetryConfig;

/// What the executor should do with one attempt's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Return the value to the caller.
    Accept,
    /// Consume attempt budget and, if any remains, try again.
    Retry,
    /// Surface the error immediately.
    Terminal,
}

/// Classify one attempt's outcome under `config`.
pub fn classify<T, E>(outcome: &Result<T, E>, config: &RetryConfig<T, E>) -> Verdict
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    match outcome {
        Err(error) => {
            if let Some(kind) = config.kind_of(error) {
                if config.ignores_kind(kind) {
                    return Verdict::Terminal;
                }
                if config.retries_kind(kind) {
                    return Verdict::Retry;
                }
            }
            if config.should_retry_error(error) {
                Verdict::Retry
            } else {
                Verdict::Terminal
            }
        }
        Ok(value) => {
            if config.should_retry_result(value) {
                Verdict::Retry
            } else {
                Verdict::Accept
            }
        }
    }
}
