//! End-to-end retry lifecycle coverage: attempt accounting, event
//! sequences, classification short-circuits, and registry wiring.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use reattempt::{
    ErrorKind, NoopSleeper, OutcomeKind, Retry, RetryConfig, RetryRegistry,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum WebError {
    ServiceUnavailable,
    BusinessRule(&'static str),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::ServiceUnavailable => write!(f, "service unavailable"),
            WebError::BusinessRule(rule) => write!(f, "business rule violated: {}", rule),
        }
    }
}

impl std::error::Error for WebError {}

const UNAVAILABLE: ErrorKind = ErrorKind::new("unavailable");
const BUSINESS: ErrorKind = ErrorKind::new("business");

fn kind_of(error: &WebError) -> ErrorKind {
    match error {
        WebError::ServiceUnavailable => UNAVAILABLE,
        WebError::BusinessRule(_) => BUSINESS,
    }
}

fn collect_outcomes(retry: &Retry<&'static str, WebError>) -> Arc<Mutex<Vec<(OutcomeKind, usize)>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let log_clone = log.clone();
    retry
        .events()
        .subscribe(move |event| log_clone.lock().unwrap().push((event.outcome(), event.retry_count())));
    log
}

#[tokio::test]
async fn recovers_after_transient_failures() {
    let config = RetryConfig::builder()
        .max_attempts(3)
        .wait_duration(Duration::ZERO)
        .build()
        .expect("valid policy");
    let retry = Retry::new("web-service", config).with_sleeper(NoopSleeper);
    let log = collect_outcomes(&retry);
    let calls = Arc::new(AtomicUsize::new(0));

    let calls_clone = calls.clone();
    let result = retry
        .execute(|| {
            let calls = calls_clone.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(WebError::ServiceUnavailable)
                } else {
                    Ok("OK")
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), "OK");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            (OutcomeKind::RetryableFailure, 0),
            (OutcomeKind::RetryableFailure, 1),
            (OutcomeKind::SuccessAfterRetry, 2),
        ]
    );
}

#[tokio::test]
async fn business_failures_are_never_retried() {
    let config = RetryConfig::builder()
        .max_attempts(2)
        .wait_duration(Duration::ZERO)
        .classify_errors_with(kind_of)
        .ignore_kinds([BUSINESS])
        .build()
        .expect("valid policy");
    let retry = Retry::new("web-service", config).with_sleeper(NoopSleeper);
    let log = collect_outcomes(&retry);
    let calls = Arc::new(AtomicUsize::new(0));

    let calls_clone = calls.clone();
    let result = retry
        .execute(|| {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<&'static str, _>(WebError::BusinessRule("credit limit"))
            }
        })
        .await;

    let err = result.unwrap_err();
    assert!(err.is_terminal());
    assert_eq!(err.attempts(), 1);
    assert_eq!(err.error(), Some(&WebError::BusinessRule("credit limit")));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(*log.lock().unwrap(), vec![(OutcomeKind::TerminalFailure, 0)]);
}

#[tokio::test]
async fn rejected_status_codes_drive_retries() {
    let config = RetryConfig::<u32, WebError>::builder()
        .max_attempts(2)
        .wait_duration(Duration::ZERO)
        .retry_on_result(|status| *status == 500)
        .build()
        .expect("valid policy");
    let retry = Retry::new("status-check", config).with_sleeper(NoopSleeper);
    let outcomes = Arc::new(Mutex::new(Vec::new()));
    let outcomes_clone = outcomes.clone();
    retry.events().subscribe(move |event| outcomes_clone.lock().unwrap().push(event.outcome()));
    let calls = Arc::new(AtomicUsize::new(0));

    let calls_clone = calls.clone();
    let result = retry
        .execute(|| {
            let calls = calls_clone.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Ok(500)
                } else {
                    Ok(200)
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), 200);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        *outcomes.lock().unwrap(),
        vec![OutcomeKind::RetryableFailure, OutcomeKind::SuccessAfterRetry]
    );
}

#[tokio::test]
async fn single_attempt_budget_exhausts_without_retrying() {
    let config = RetryConfig::builder()
        .max_attempts(1)
        .wait_duration(Duration::from_secs(30))
        .build()
        .expect("valid policy");
    let retry = Retry::new("one-shot", config).with_sleeper(NoopSleeper);
    let log = collect_outcomes(&retry);
    let calls = Arc::new(AtomicUsize::new(0));

    let calls_clone = calls.clone();
    let result = retry
        .execute(|| {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<&'static str, _>(WebError::ServiceUnavailable)
            }
        })
        .await;

    let err = result.unwrap_err();
    assert!(err.is_exhausted());
    assert_eq!(err.retry_count(), Some(0));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        *log.lock().unwrap(),
        vec![(OutcomeKind::RetryableFailure, 0), (OutcomeKind::Exhausted, 0)]
    );
}

#[tokio::test]
async fn attempt_starts_are_spaced_by_the_wait_duration() {
    let wait = Duration::from_millis(50);
    let config = RetryConfig::builder()
        .max_attempts(3)
        .wait_duration(wait)
        .build()
        .expect("valid policy");
    let retry = Retry::new("spaced", config);
    let starts = Arc::new(Mutex::new(Vec::new()));

    let starts_clone = starts.clone();
    let _ = retry
        .execute(|| {
            let starts = starts_clone.clone();
            async move {
                starts.lock().unwrap().push(Instant::now());
                Err::<&'static str, _>(WebError::ServiceUnavailable)
            }
        })
        .await;

    let starts = starts.lock().unwrap();
    assert_eq!(starts.len(), 3);
    for pair in starts.windows(2) {
        // Small tolerance for timer coarseness.
        assert!(pair[1] - pair[0] >= wait - Duration::from_millis(5));
    }
}

#[tokio::test]
async fn listeners_never_see_events_from_before_their_subscription() {
    let config = RetryConfig::builder()
        .max_attempts(2)
        .wait_duration(Duration::ZERO)
        .build()
        .expect("valid policy");
    let retry = Retry::new("no-replay", config).with_sleeper(NoopSleeper);

    let _ = retry
        .execute(|| async { Err::<&'static str, _>(WebError::ServiceUnavailable) })
        .await;

    let late = collect_outcomes(&retry);
    assert!(late.lock().unwrap().is_empty());

    let result = retry.execute(|| async { Ok("OK") }).await;
    assert_eq!(result.unwrap(), "OK");
    assert_eq!(*late.lock().unwrap(), vec![(OutcomeKind::SuccessWithoutRetry, 0)]);
}

#[tokio::test]
async fn panicking_listener_does_not_change_the_outcome() {
    let config = RetryConfig::builder()
        .max_attempts(2)
        .wait_duration(Duration::ZERO)
        .build()
        .expect("valid policy");
    let retry = Retry::new("isolated", config).with_sleeper(NoopSleeper);
    retry.events().subscribe(|_| panic!("listener bug"));
    let log = collect_outcomes(&retry);
    let calls = Arc::new(AtomicUsize::new(0));

    let calls_clone = calls.clone();
    let result = retry
        .execute(|| {
            let calls = calls_clone.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(WebError::ServiceUnavailable)
                } else {
                    Ok("OK")
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), "OK");
    assert_eq!(
        *log.lock().unwrap(),
        vec![(OutcomeKind::RetryableFailure, 0), (OutcomeKind::SuccessAfterRetry, 1)]
    );
}

#[tokio::test]
async fn registry_caches_executors_by_name() {
    let registry = RetryRegistry::<&'static str, WebError>::with_defaults();

    let custom = RetryConfig::builder()
        .max_attempts(2)
        .wait_duration(Duration::ZERO)
        .build()
        .expect("valid policy");
    let first = registry.retry_with_config("checkout", custom);
    let calls = Arc::new(AtomicUsize::new(0));

    // Events subscribed through one handle fire for calls through another.
    let seen = Arc::new(AtomicUsize::new(0));
    let seen_clone = seen.clone();
    first.events().on_error(move |_| {
        seen_clone.fetch_add(1, Ordering::SeqCst);
    });

    let second = registry.retry("checkout");
    let calls_clone = calls.clone();
    let result = second
        .call(|| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            Err::<&'static str, _>(WebError::ServiceUnavailable)
        });

    assert!(result.unwrap_err().is_exhausted());
    assert_eq!(calls.load(Ordering::SeqCst), 2, "cached two-attempt policy applies");
    assert_eq!(seen.load(Ordering::SeqCst), 1, "exhaustion reached the early subscriber");
}
