//! Retry executor — bounded exponential backoff around one task invocation.
//!
//! All failures are retried identically (no per-error policy, no jitter);
//! the collaborator services upsert, so re-running a partially applied task
//! is safe.

use std::future::Future;
use std::time::Duration;

use brandpulse_core::error::{BrandPulseError, Result};

/// Run `task` up to `max_attempts` times, sleeping `2^attempt` seconds
/// between attempts (2s before the 2nd, 4s before the 3rd, …). Returns the
/// first success or the last error.
pub async fn run_with_retry<T, F, Fut>(task: F, max_attempts: u32) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err = None;

    for attempt in 1..=max_attempts {
        match task().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!("✅ Task succeeded on attempt {attempt}/{max_attempts}");
                }
                return Ok(value);
            }
            Err(e) => {
                tracing::warn!("⚠️ Attempt {attempt}/{max_attempts} failed: {e}");
                last_err = Some(e);
                if attempt < max_attempts {
                    let backoff = Duration::from_millis(2u64.pow(attempt) * 1000);
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    Err(last_err
        .unwrap_or_else(|| BrandPulseError::Task("retry executor given zero attempts".into())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_first_attempt_success_runs_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result = run_with_retry(
            move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                }
            },
            3,
        )
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result = run_with_retry(
            move || {
                let c = c.clone();
                async move {
                    let n = c.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        Err(BrandPulseError::Service("flaky".into()))
                    } else {
                        Ok("ok")
                    }
                }
            },
            3,
        )
        .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error_and_bounds_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result: Result<()> = run_with_retry(
            move || {
                let c = c.clone();
                async move {
                    let n = c.fetch_add(1, Ordering::SeqCst) + 1;
                    Err(BrandPulseError::Service(format!("boom {n}")))
                }
            },
            3,
        )
        .await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("boom 3"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_totals_six_seconds_for_three_attempts() {
        let start = tokio::time::Instant::now();
        let result: Result<()> = run_with_retry(
            || async { Err(BrandPulseError::Service("down".into())) },
            3,
        )
        .await;
        assert!(result.is_err());
        // 2s before attempt 2 + 4s before attempt 3.
        assert!(start.elapsed() >= Duration::from_secs(6));
    }
}
