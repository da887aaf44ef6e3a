//! Tests for retry execution.

use lectern_error::{
    ApiError, CancelReason, HttpError, LecternError, LecternErrorKind, LecternResult,
};
use lectern_rate_limit::{CallContext, RetryPolicy};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

fn fast_policy(max_retries: usize) -> RetryPolicy {
    RetryPolicy::new(max_retries, Duration::from_millis(1), Duration::from_millis(4))
}

#[tokio::test]
async fn test_succeeds_after_transient_failures() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let result: LecternResult<&str> = fast_policy(2)
        .execute(&CallContext::new(), || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(HttpError::new("connection reset").into())
                } else {
                    Ok("done")
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), "done");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_returns_last_failure_when_exhausted() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let result: LecternResult<()> = fast_policy(2)
        .execute(&CallContext::new(), || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move { Err(ApiError::new(503, vec![lectern_error::ApiErrorDetail::new(format!("attempt {n}"))]).into()) }
        })
        .await;

    let err = result.unwrap_err();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    let api = err.api_error().unwrap();
    assert_eq!(api.status_code(), 503);
    assert_eq!(api.message(), "attempt 2");
}

#[tokio::test]
async fn test_non_retryable_runs_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let result: LecternResult<()> = fast_policy(2)
        .execute(&CallContext::new(), || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(ApiError::new(400, vec![]).into()) }
        })
        .await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_zero_retries_runs_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let result: LecternResult<()> = fast_policy(0)
        .execute(&CallContext::new(), || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(HttpError::new("refused").into()) }
        })
        .await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancellation_during_backoff_surfaces_cancellation() {
    let policy = RetryPolicy::new(3, Duration::from_secs(10), Duration::from_secs(10));
    let ctx = CallContext::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let canceller = {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            ctx.cancel();
        })
    };

    let start = Instant::now();
    let result: LecternResult<()> = policy
        .execute(&ctx, || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(ApiError::new(500, vec![]).into()) }
        })
        .await;

    let err: LecternError = result.unwrap_err();
    assert!(err.is_cancelled());
    assert!(!err.is_server_error());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(start.elapsed() < Duration::from_secs(5));
    canceller.await.unwrap();
}

#[tokio::test]
async fn test_cancelled_before_start_never_calls() {
    let ctx = CallContext::new();
    ctx.cancel();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let result: LecternResult<()> = fast_policy(3)
        .execute(&ctx, || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .await;

    assert!(result.unwrap_err().is_cancelled());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_deadline_during_backoff() {
    let policy = RetryPolicy::new(3, Duration::from_secs(10), Duration::from_secs(10));
    let ctx = CallContext::new().with_timeout(Duration::from_millis(50));

    let result: LecternResult<()> = policy
        .execute(&ctx, || async { Err(HttpError::new("reset").into()) })
        .await;

    match result.unwrap_err().kind() {
        LecternErrorKind::Cancelled(err) => assert_eq!(err.reason, CancelReason::DeadlineExceeded),
        other => panic!("expected cancellation, got {other}"),
    }
}
