//! Wait scheduling between attempts.
//!
//! Three pieces cooperate here: a [`WaitStrategy`] computes the delay owed
//! after a failed attempt, [`Jitter`] optionally randomizes it, and a
//! [`Sleeper`] executes it. Production code uses [`TokioSleeper`]; tests
//! inject [`NoopSleeper`] or [`RecordingSleeper`] to stay deterministic.
//!
//! Attempt semantics: `delay(0)` is the initial invocation and owes no
//! delay; retries start at `delay(1)`. Computations that would overflow
//! saturate at [`MAX_WAIT`] (1 day).
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use reattempt::WaitStrategy;
//!
//! let wait = WaitStrategy::exponential(Duration::from_millis(100))
//!     .with_max(Duration::from_secs(2))
//!     .unwrap();
//! assert_eq!(wait.delay(1), Duration::from_millis(100));
//! assert_eq!(wait.delay(2), Duration::from_millis(200));
//! assert_eq!(wait.delay(6), Duration::from_secs(2)); // capped
//! ```

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use rand::{rng, Rng};

use crate::config::ConfigError;

/// Ceiling applied when a schedule would overflow (1 day).
pub const MAX_WAIT: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Schedule {
    Fixed(Duration),
    Linear { base: Duration, max: Option<Duration> },
    Exponential { base: Duration, max: Option<Duration> },
}

/// Schedule producing the delay owed before each retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitStrategy {
    schedule: Schedule,
}

impl WaitStrategy {
    /// The same delay before every retry.
    pub fn fixed(delay: Duration) -> Self {
        Self { schedule: Schedule::Fixed(delay) }
    }

    /// Delay growing linearly with the attempt number.
    pub fn linear(base: Duration) -> Self {
        Self { schedule: Schedule::Linear { base, max: None } }
    }

    /// Delay doubling with each retry.
    pub fn exponential(base: Duration) -> Self {
        Self { schedule: Schedule::Exponential { base, max: None } }
    }

    /// Cap a linear or exponential schedule. Fails on fixed schedules, on a
    /// zero cap, or on a cap below the base delay.
    pub fn with_max(mut self, max: Duration) -> Result<Self, ConfigError> {
        if max.is_zero() {
            return Err(ConfigError::ZeroWaitCap);
        }
        match &mut self.schedule {
            Schedule::Fixed(_) => Err(ConfigError::FixedWaitCap),
            Schedule::Linear { base, max: cap } | Schedule::Exponential { base, max: cap } => {
                if max < *base {
                    return Err(ConfigError::WaitCapBelowBase { base: *base, max });
                }
                *cap = Some(max);
                Ok(self)
            }
        }
    }

    /// Delay owed after `attempt` failed (1-indexed; 0 is the initial call
    /// and owes nothing).
    pub fn delay(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        match &self.schedule {
            Schedule::Fixed(delay) => *delay,
            Schedule::Linear { base, max } => {
                let factor = attempt.min(u32::MAX as usize) as u32;
                let scaled = base.checked_mul(factor).unwrap_or(MAX_WAIT);
                Self::capped(scaled, *max)
            }
            Schedule::Exponential { base, max } => {
                let exponent = attempt.saturating_sub(1).min(u32::MAX as usize) as u32;
                let multiplier = 2u128.saturating_pow(exponent);
                let nanos = base.as_nanos().saturating_mul(multiplier);
                let scaled = Duration::from_nanos(nanos.min(MAX_WAIT.as_nanos()) as u64);
                Self::capped(scaled, *max)
            }
        }
    }

    fn capped(delay: Duration, max: Option<Duration>) -> Duration {
        let capped = max.map(|m| delay.min(m)).unwrap_or(delay);
        capped.min(MAX_WAIT)
    }
}

/// Randomization applied to a scheduled delay to spread simultaneous
/// retries apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jitter {
    /// Use the exact scheduled delay.
    None,
    /// Uniform in `[0, delay]`.
    Full,
    /// Uniform in `[delay/2, delay]`, keeping a floor.
    Equal,
}

impl Jitter {
    /// Apply jitter to a delay.
    pub fn apply(self, delay: Duration) -> Duration {
        let mut rng = rng();
        self.apply_with_rng(delay, &mut rng)
    }

    /// Apply jitter with a caller-supplied RNG (for deterministic tests).
    pub fn apply_with_rng<R: Rng>(self, delay: Duration, rng: &mut R) -> Duration {
        let millis = Self::as_millis_saturated(delay);
        match self {
            Jitter::None => delay,
            Jitter::Full => {
                if millis == 0 {
                    return Duration::ZERO;
                }
                Duration::from_millis(rng.random_range(0..=millis))
            }
            Jitter::Equal => {
                if millis == 0 {
                    return Duration::ZERO;
                }
                Duration::from_millis(rng.random_range(millis / 2..=millis))
            }
        }
    }

    fn as_millis_saturated(duration: Duration) -> u64 {
        duration.as_millis().try_into().unwrap_or(u64::MAX)
    }
}

/// Abstraction for executing an inter-attempt delay.
pub trait Sleeper: Send + Sync + fmt::Debug {
    /// Resolve after `duration` has elapsed.
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// Production sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Test sleeper that resolves immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSleeper;

impl Sleeper for NoopSleeper {
    fn sleep(&self, _duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }
}

/// Test sleeper that records every requested delay without waiting.
#[derive(Debug, Clone)]
pub struct RecordingSleeper {
    waits: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self { waits: Arc::new(Mutex::new(Vec::new())) }
    }

    /// All delays requested so far, in order.
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }

    /// Sum of all delays requested so far.
    pub fn total(&self) -> Duration {
        self.waits.lock().unwrap().iter().sum()
    }
}

impl Default for RecordingSleeper {
    fn default() -> Self {
        Self::new()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        self.waits.lock().unwrap().push(duration);
        Box::pin(async {})
    }
}
