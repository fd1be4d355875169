//! Jittered exponential backoff for oracle calls.

use std::future::Future;

use oats_domain::error::{Error, Result};

/// Whether an error is worth retrying: transport failures, timeouts,
/// and 5xx/429 responses. Provider rejections (bad request, bad auth)
/// and everything else are permanent.
pub fn is_transient(error: &Error) -> bool {
    matches!(error, Error::Http(_) | Error::Timeout(_))
}

/// Run `op` up to `attempts` times, sleeping `base_ms * 2^n` plus jitter
/// between transient failures. The last error is returned unchanged.
pub async fn with_backoff<T, F, Fut>(attempts: u32, base_ms: u64, op: F) -> Result<T>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = attempts.max(1);
    let mut last_err = None;
    for attempt in 0..attempts {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                let retryable = is_transient(&e) && attempt + 1 < attempts;
                if !retryable {
                    return Err(e);
                }
                let delay = backoff_delay(base_ms, attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "oracle call failed, retrying"
                );
                last_err = Some(e);
                tokio::time::sleep(delay).await;
            }
        }
    }
    // Unreachable: the loop always returns. Kept for totality.
    Err(last_err.unwrap_or_else(|| Error::Other("retry loop exhausted".into())))
}

/// `base * 2^attempt` plus up to half of `base` in jitter.
fn backoff_delay(base_ms: u64, attempt: u32) -> std::time::Duration {
    let exp = base_ms.saturating_mul(1u64 << attempt.min(16));
    let jitter = if base_ms == 0 { 0 } else { clock_jitter() % (base_ms / 2 + 1) };
    std::time::Duration::from_millis(exp + jitter)
}

/// Cheap jitter source: sub-millisecond clock noise.
fn clock_jitter() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn transient_errors_are_retried_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_backoff(3, 1, |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(Error::Http("503".into()))
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
    async fn permanent_errors_fail_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_backoff(3, 1, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(Error::Provider {
                    provider: "anthropic".into(),
                    message: "invalid api key".into(),
                })
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transient_exhaustion_returns_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_backoff(3, 1, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::Timeout("60s".into())) }
        })
        .await;
        assert!(matches!(result, Err(Error::Timeout(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn delay_grows_exponentially() {
        let d0 = backoff_delay(500, 0).as_millis() as u64;
        let d2 = backoff_delay(500, 2).as_millis() as u64;
        assert!((500..=750).contains(&d0));
        assert!((2000..=2250).contains(&d2));
    }
}
