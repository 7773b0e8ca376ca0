//! Lock-contention retry for store writes
//!
//! The store is shared with the register's web application, so a batch
//! commit can meet `database is locked` even with a busy timeout. Those
//! errors are retried with exponential backoff until a total wait budget is
//! spent; every other error is returned straight away.

use genes_common::{Error, Result};
use std::time::{Duration, Instant};

/// Default total time spent retrying one operation
pub const DEFAULT_MAX_LOCK_WAIT: Duration = Duration::from_secs(10);

const INITIAL_BACKOFF_MS: u64 = 10;
const MAX_BACKOFF_MS: u64 = 1000;

/// Retry `operation` while it fails with lock contention and `max_wait` has not elapsed
///
/// `operation` must be safe to repeat: each call starts its own transaction.
pub async fn retry_on_lock<F, Fut, T>(
    operation_name: &str,
    max_wait: Duration,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let start_time = Instant::now();
    let mut attempt = 0u32;
    let mut backoff_ms = INITIAL_BACKOFF_MS;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        "Store operation succeeded after lock retry"
                    );
                }
                return Ok(result);
            }
            Err(err) if !err.is_lock_contention() => return Err(err),
            Err(err) => {
                let elapsed = start_time.elapsed();

                if elapsed >= max_wait {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = elapsed.as_millis() as u64,
                        max_wait_ms = max_wait.as_millis() as u64,
                        "Store still locked, giving up"
                    );
                    return Err(Error::Internal(format!(
                        "{}: database locked after {} attempts ({} ms): {}",
                        operation_name,
                        attempt,
                        elapsed.as_millis(),
                        err
                    )));
                }

                let sleep_ms = backoff_ms.min(MAX_BACKOFF_MS);
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms = sleep_ms,
                    remaining_ms = max_wait.saturating_sub(elapsed).as_millis() as u64,
                    "Store locked, will retry after backoff"
                );

                tokio::time::sleep(Duration::from_millis(sleep_ms)).await;
                backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn locked() -> Error {
        Error::Database(sqlx::Error::Protocol("database is locked".to_string()))
    }

    #[tokio::test]
    async fn test_succeeds_first_attempt() {
        let result = retry_on_lock("test_op", Duration::from_secs(1), || async {
            Ok::<i32, Error>(42)
        })
        .await;

        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_succeeds_after_lock_errors() {
        let attempts = AtomicU32::new(0);

        let result = retry_on_lock("test_op", Duration::from_secs(5), || {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(locked())
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_wait() {
        let attempts = AtomicU32::new(0);

        let result = retry_on_lock("test_op", Duration::from_millis(50), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, Error>(locked()) }
        })
        .await;

        assert!(matches!(result, Err(Error::Internal(_))));
        assert!(attempts.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn test_other_error_fails_immediately() {
        let attempts = AtomicU32::new(0);

        let result = retry_on_lock("test_op", Duration::from_secs(5), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, Error>(Error::Database(sqlx::Error::RowNotFound)) }
        })
        .await;

        assert!(matches!(result, Err(Error::Database(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
