#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # reattempt
//!
//! Policy-driven retry for async and blocking Rust: failure classification,
//! backoff with jitter, and a synchronous lifecycle event stream.
//!
//! ## Features
//!
//! - **Retry policies** with attempt budgets, fixed or growing wait
//!   schedules, and jitter
//! - **Failure classification** by predicate or by explicit error-kind
//!   retry/ignore sets, with ignore always winning
//! - **Result rejection**: treat unwanted success values as retryable
//!   failures
//! - **Lifecycle events** delivered synchronously and in order to
//!   subscribed listeners
//! - **Sync and async forms**, with cancellation support at the
//!   inter-attempt wait
//! - **Named registries** caching executors behind a default policy
//!
//! ## Quick Start
//!
//! ```rust
//! use reattempt::{Retry, RetryConfig};
//! use std::time::Duration;
//!
//! #[derive(Debug)]
//! struct UpstreamError;
//! # impl std::fmt::Display for UpstreamError {
//! #     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//! #         write!(f, "upstream error")
//! #     }
//! # }
//! # impl std::error::Error for UpstreamError {}
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = RetryConfig::builder()
//!         .max_attempts(3)
//!         .wait_duration(Duration::from_millis(100))
//!         .build()
//!         .unwrap();
//!
//!     let retry = Retry::new("upstream", config);
//!     retry.events().on_retry(|event| println!("{event}"));
//!
//!     let result: Result<u32, _> = retry
//!         .execute(|| async {
//!             // Your fallible operation here
//!             Ok::<_, UpstreamError>(7)
//!         })
//!         .await;
//!     assert_eq!(result.unwrap(), 7);
//! }
//! ```

pub mod backoff;
pub mod classify;
pub mod config;
pub mod error;
pub mod event;
pub mod prelude;
pub mod publisher;
pub mod registry;
pub mod retry;

// Re-exports
pub use backoff::{Jitter, NoopSleeper, RecordingSleeper, Sleeper, TokioSleeper, WaitStrategy};
pub use classify::{classify, Verdict};
pub use config::{ConfigError, ErrorKind, RetryConfig, RetryConfigBuilder};
pub use error::{FailureCause, RetryError};
pub use event::{EventKind, OutcomeKind, RetryEvent};
pub use publisher::{EventPublisher, SubscriptionHandle};
pub use registry::RetryRegistry;
pub use retry::Retry;
