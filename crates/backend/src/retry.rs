//! Retry policy for transient backend errors: capped exponential backoff,
//! 3 attempts, 100 ms base, jitter.  Exhaustion surfaces as
//! `backend_fatal`.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use masc_domain::trace::TraceEvent;
use masc_domain::{Error, Result};

const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY_MS: u64 = 100;

/// Run `op`, retrying on `backend_transient` with exponential backoff.
pub async fn with_retries<T, F, Fut>(operation: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => {
                attempt += 1;
                if attempt >= MAX_ATTEMPTS {
                    return Err(Error::BackendFatal(format!(
                        "{operation}: retries exhausted: {e}"
                    )));
                }
                TraceEvent::BackendRetry {
                    operation: operation.to_owned(),
                    attempt,
                }
                .emit();
                let backoff = BASE_DELAY_MS * 2u64.pow(attempt - 1);
                let jitter = rand::thread_rng().gen_range(0..=backoff / 2);
                tokio::time::sleep(Duration::from_millis(backoff + jitter)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = with_retries("test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(Error::BackendTransient("flaky".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhaustion_becomes_fatal() {
        let result: Result<()> = with_retries("test", || async {
            Err(Error::BackendTransient("down".into()))
        })
        .await;
        assert!(matches!(result, Err(Error::BackendFatal(_))));
    }

    #[tokio::test]
    async fn non_transient_errors_pass_through() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retries("test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::Conflict("lost".into())) }
        })
        .await;
        assert!(matches!(result, Err(Error::Conflict(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
