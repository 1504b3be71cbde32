use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Fixed-delay retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub attempts: usize,
    /// Pause between two attempts
    pub delay: Duration,
}

impl RetryPolicy {
    /// Policy applied to every write: 3 attempts, 1 s apart
    pub const PUT: RetryPolicy = RetryPolicy {
        attempts: 3,
        delay: Duration::from_secs(1),
    };
}

/// Run `operation` until it succeeds or the policy's attempts are used up.
///
/// Every error is retried. There is no pause after the last attempt, and the
/// last attempt's error is the one returned. An `attempts` of `0` still runs
/// the operation once.
pub async fn retry_fixed<F, Fut, T, E>(
    policy: RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt >= attempts => return Err(e),
            Err(e) => {
                warn!(
                    "Error in {} (attempt {}/{}): {}",
                    operation_name, attempt, attempts, e
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    #[derive(Debug, Clone)]
    struct TestError {
        message: String,
    }

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.message)
        }
    }

    fn failing_until(
        counter: &Arc<AtomicUsize>,
        successes_from: usize,
    ) -> impl FnMut() -> std::pin::Pin<Box<dyn Future<Output = Result<usize, TestError>> + Send>>
    {
        let counter = Arc::clone(counter);
        move || {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                let count = counter.fetch_add(1, Ordering::SeqCst);
                if count < successes_from {
                    Err(TestError {
                        message: format!("failure #{}", count + 1),
                    })
                } else {
                    Ok(count)
                }
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_success_on_first_attempt() {
        let start = Instant::now();
        let result =
            retry_fixed(RetryPolicy::PUT, "test_operation", || async { Ok::<i32, TestError>(42) })
                .await;

        assert_eq!(result.unwrap(), 42);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_fail_fail_succeed() {
        let counter = Arc::new(AtomicUsize::new(0));
        let start = Instant::now();

        let result = retry_fixed(RetryPolicy::PUT, "test_operation", failing_until(&counter, 2)).await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        // two pauses of one second each, no backoff
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_returns_last_error() {
        let counter = Arc::new(AtomicUsize::new(0));
        let start = Instant::now();

        let result = retry_fixed(RetryPolicy::PUT, "test_operation", failing_until(&counter, usize::MAX)).await;

        assert_eq!(result.unwrap_err().message, "failure #3");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_zero_attempts_runs_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let policy = RetryPolicy {
            attempts: 0,
            delay: Duration::from_secs(1),
        };

        let result = retry_fixed(policy, "test_operation", failing_until(&counter, usize::MAX)).await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
