use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Bounded exponential back-off policy (spec §4.E).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay_initial_ms: u64,
    pub delay_max_ms: u64,
    pub backoff_factor: f64,
}

impl RetryPolicy {
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let scaled = self.delay_initial_ms as f64 * self.backoff_factor.powi(attempt as i32);
        Duration::from_millis(scaled.min(self.delay_max_ms as f64) as u64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3, delay_initial_ms: 200, delay_max_ms: 5_000, backoff_factor: 2.0 }
    }
}

/// Retries `f` while `predicate(&err)` holds, sleeping
/// `min(delay_initial_ms * backoff_factor^attempt, delay_max_ms)` between
/// attempts. Errors the predicate rejects propagate immediately; after
/// `max_retries` attempts the last error is returned regardless.
pub async fn run<F, Fut, T, E>(
    name: &str,
    policy: RetryPolicy,
    predicate: impl Fn(&E) -> bool,
    mut f: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.max_retries && predicate(&err) => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(call = name, attempt, %err, delay_ms = delay.as_millis() as u64, "retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug)]
    struct Flaky;

    impl std::fmt::Display for Flaky {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "flaky")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success_within_budget() {
        let calls = Cell::new(0);
        let policy = RetryPolicy { max_retries: 5, delay_initial_ms: 10, delay_max_ms: 100, backoff_factor: 2.0 };

        let result: Result<u32, Flaky> = run("test", policy, |_| true, || {
            let n = calls.get() + 1;
            calls.set(n);
            async move { if n < 3 { Err(Flaky) } else { Ok(42) } }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let policy = RetryPolicy { max_retries: 2, delay_initial_ms: 10, delay_max_ms: 100, backoff_factor: 2.0 };
        let result: Result<u32, Flaky> = run("test", policy, |_| true, || async { Err(Flaky) }).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn non_retriable_error_propagates_immediately() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::default();
        let result: Result<u32, Flaky> = run("test", policy, |_| false, || {
            calls.set(calls.get() + 1);
            async { Err(Flaky) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn delay_caps_at_max() {
        let policy = RetryPolicy { max_retries: 10, delay_initial_ms: 100, delay_max_ms: 1_000, backoff_factor: 3.0 };
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(300));
        assert_eq!(policy.delay_for_attempt(5), Duration::from_millis(1_000));
    }
}
