//! Retry with exponential back-off and jitter for the places client.
//!
//! [`retry_with_backoff`] wraps any fallible async operation and retries on
//! transient errors (network failures, 5xx, 429). A bad key or a malformed
//! response is returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::PlacesError;

const MAX_DELAY_MS: u64 = 60_000;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:** timeouts, connection failures, HTTP 5xx and HTTP 429.
///
/// **Not retriable:** [`PlacesError::Unauthorized`], other 4xx statuses,
/// [`PlacesError::Deserialize`] and [`PlacesError::InvalidBaseUrl`].
pub(crate) fn is_retriable(err: &PlacesError) -> bool {
    match err {
        PlacesError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        PlacesError::RateLimited { .. } => true,
        PlacesError::UnexpectedStatus { status, .. } => *status >= 500,
        PlacesError::Unauthorized(_)
        | PlacesError::Deserialize { .. }
        | PlacesError::InvalidBaseUrl { .. } => false,
    }
}

/// Sleep before retry number `attempt` (1-based).
///
/// A `Retry-After` hint from a 429 replaces the exponential schedule.
/// Otherwise `backoff_base_ms × 2^(attempt-1)` with ±25 % jitter. Both are
/// capped at 60 s.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn delay_ms(err: &PlacesError, attempt: u32, backoff_base_ms: u64) -> u64 {
    if let PlacesError::RateLimited {
        retry_after_secs: Some(secs),
    } = err
    {
        return secs.saturating_mul(1_000).min(MAX_DELAY_MS);
    }
    let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
    let capped = computed.min(MAX_DELAY_MS);
    (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64
}

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, PlacesError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PlacesError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let delay_ms = delay_ms(&err, attempt, backoff_base_ms);
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "places API transient error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn deserialize_err() -> PlacesError {
        let src = serde_json::from_str::<()>("invalid").unwrap_err();
        PlacesError::Deserialize {
            context: "test".to_owned(),
            source: src,
        }
    }

    #[test]
    fn unauthorized_is_not_retriable() {
        assert!(!is_retriable(&PlacesError::Unauthorized(401)));
    }

    #[test]
    fn deserialize_error_is_not_retriable() {
        assert!(!is_retriable(&deserialize_err()));
    }

    #[test]
    fn rate_limited_is_retriable() {
        assert!(is_retriable(&PlacesError::RateLimited {
            retry_after_secs: None
        }));
    }

    #[test]
    fn only_server_errors_are_retriable_statuses() {
        let status = |status| PlacesError::UnexpectedStatus {
            status,
            url: "http://localhost/".to_owned(),
        };
        assert!(is_retriable(&status(503)));
        assert!(!is_retriable(&status(400)));
        assert!(!is_retriable(&status(404)));
    }

    #[test]
    fn retry_after_overrides_backoff_and_is_capped() {
        let hinted = PlacesError::RateLimited {
            retry_after_secs: Some(7),
        };
        assert_eq!(delay_ms(&hinted, 1, 1_000), 7_000);
        let huge = PlacesError::RateLimited {
            retry_after_secs: Some(3_600),
        };
        assert_eq!(delay_ms(&huge, 1, 1_000), MAX_DELAY_MS);
    }

    #[test]
    fn backoff_doubles_within_jitter_bounds() {
        let err = PlacesError::UnexpectedStatus {
            status: 502,
            url: String::new(),
        };
        for attempt in 1..=3u32 {
            let base = 1_000u64 << (attempt - 1);
            let d = delay_ms(&err, attempt, 1_000);
            assert!(
                (base * 3 / 4..=base * 5 / 4).contains(&d),
                "attempt {attempt}: {d} ms"
            );
        }
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, PlacesError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn does_not_retry_unauthorized() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(PlacesError::Unauthorized(401))
            }
        })
        .await;
        assert_eq!(
            calls.load(Ordering::SeqCst),
            1,
            "Unauthorized must not be retried"
        );
        assert!(matches!(result, Err(PlacesError::Unauthorized(401))));
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                let attempt = c.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt < 3 {
                    Err::<u32, _>(PlacesError::RateLimited {
                        retry_after_secs: Some(0),
                    })
                } else {
                    Ok(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99, "should succeed after retries");
        assert_eq!(
            calls.load(Ordering::SeqCst),
            3,
            "should have been called 3 times (2 failures + 1 success)"
        );
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(2, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(PlacesError::UnexpectedStatus {
                    status: 503,
                    url: "http://localhost/".to_owned(),
                })
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(
            result,
            Err(PlacesError::UnexpectedStatus { status: 503, .. })
        ));
    }
}
