// Path: crates/stats/src/retry.rs
use std::time::Duration;

use crate::error::StatsError;

/// Retries `f` on `StatsError::Transient` with exponential back-off, per
/// spec §5's "per-subsystem locks ... retried with exponential back-off on
/// database-locked errors, up to 6-8 attempts, bases 100ms-1s". Any other
/// error is returned immediately.
pub async fn with_retry<T, F>(attempts: u32, base: Duration, mut f: F) -> Result<T, StatsError>
where
    F: FnMut() -> Result<T, StatsError>,
{
    let mut delay = base;
    for attempt in 0..attempts {
        match f() {
            Ok(value) => return Ok(value),
            Err(StatsError::Transient(msg)) => {
                if attempt + 1 == attempts {
                    return Err(StatsError::Transient(msg));
                }
                tracing::warn!(attempt, %msg, "statistics store lock contention, retrying");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(other) => return Err(other),
        }
    }
    // Unreachable given attempts >= 1, but keeps the function total.
    Err(StatsError::Transient("retry budget exhausted".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = with_retry(5, Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(StatsError::Transient("locked".into()))
            } else {
                Ok(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn non_transient_error_returns_immediately() {
        let result: Result<i32, StatsError> =
            with_retry(5, Duration::from_millis(1), || Err(StatsError::NotFound)).await;
        assert!(matches!(result, Err(StatsError::NotFound)));
    }

    #[tokio::test]
    async fn exhausts_budget_and_returns_transient() {
        let result: Result<i32, StatsError> =
            with_retry(3, Duration::from_millis(1), || Err(StatsError::Transient("x".into())))
                .await;
        assert!(matches!(result, Err(StatsError::Transient(_))));
    }
}
