use crate::collection::FnvIndexMap;
use crate::error::IntegrationError;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Per-key rate-limiting policy. `Unlimited` is an explicit opt-out so
/// callers can bypass limiting for keys that don't map to a venue-imposed
/// bucket (spec §4.D: "unknown keys bypass limiting").
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateLimitPolicy {
    /// GCRA-style token bucket: `rate` tokens refill per second, burst up to
    /// `burst` tokens, callers wait at most `timeout` for tokens to free up.
    Bucket { rate: f64, burst: f64, timeout: Duration },
    Unlimited,
}

struct Bucket {
    policy: RateLimitPolicy,
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn new(policy: RateLimitPolicy) -> Self {
        Self { policy, tokens: Self::initial_tokens(policy), last_refill: Instant::now() }
    }

    fn initial_tokens(policy: RateLimitPolicy) -> f64 {
        match policy {
            RateLimitPolicy::Bucket { burst, .. } => burst,
            RateLimitPolicy::Unlimited => 0.0,
        }
    }

    fn refill(&mut self, now: Instant) {
        if let RateLimitPolicy::Bucket { rate, burst, .. } = self.policy {
            let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
            self.tokens = (self.tokens + elapsed * rate).min(burst);
            self.last_refill = now;
        }
    }

    /// Attempts to take `cost` tokens now. Returns `Ok(())` on success, or
    /// `Err(wait)` with the duration the caller should sleep before
    /// retrying.
    fn try_take(&mut self, cost: f64, now: Instant) -> Result<(), Duration> {
        match self.policy {
            RateLimitPolicy::Unlimited => Ok(()),
            RateLimitPolicy::Bucket { rate, .. } => {
                self.refill(now);
                if self.tokens >= cost {
                    self.tokens -= cost;
                    Ok(())
                } else {
                    let deficit = cost - self.tokens;
                    Err(Duration::from_secs_f64(deficit / rate))
                }
            }
        }
    }
}

/// Async-flavoured rate limiter: `limit` awaits a `tokio::time::sleep` until
/// tokens are available, or returns [`IntegrationError::RateLimited`] once
/// the configured timeout has been exhausted.
#[derive(Debug, Default)]
pub struct AsyncRateLimiter {
    buckets: Mutex<FnvIndexMap<String, Bucket>>,
}

impl std::fmt::Debug for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bucket").field("tokens", &self.tokens).finish()
    }
}

impl AsyncRateLimiter {
    pub fn new() -> Self {
        Self { buckets: Mutex::new(FnvIndexMap::default()) }
    }

    pub fn configure(&self, key: impl Into<String>, policy: RateLimitPolicy) {
        self.buckets.lock().insert(key.into(), Bucket::new(policy));
    }

    pub async fn limit(&self, key: &str, cost: f64) -> Result<(), IntegrationError> {
        let timeout = match self.buckets.lock().get(key).map(|b| b.policy) {
            Some(RateLimitPolicy::Bucket { timeout, .. }) => timeout,
            Some(RateLimitPolicy::Unlimited) | None => Duration::MAX,
        };
        let deadline = Instant::now() + timeout.min(Duration::from_secs(3600 * 24));

        loop {
            let outcome = {
                let mut buckets = self.buckets.lock();
                let bucket = buckets.entry(key.to_string()).or_insert_with(|| Bucket::new(RateLimitPolicy::Unlimited));
                bucket.try_take(cost, Instant::now())
            };
            match outcome {
                Ok(()) => return Ok(()),
                Err(wait) => {
                    if Instant::now() + wait > deadline {
                        return Err(IntegrationError::RateLimited {
                            key: key.to_string(),
                            timeout_ms: timeout.as_millis() as u64,
                        });
                    }
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}

/// Blocking flavour used by the synchronous strategy-facing `ApiProxy`
/// bridge (spec's `SyncApiCall` dispatch, supplemented feature 1): spins the
/// same token-bucket logic but sleeps the OS thread rather than awaiting,
/// since it's invoked from `TaskManager::run_sync`, off the async executor.
#[derive(Debug, Default)]
pub struct SyncRateLimiter {
    buckets: Mutex<FnvIndexMap<String, Bucket>>,
}

impl SyncRateLimiter {
    pub fn new() -> Self {
        Self { buckets: Mutex::new(FnvIndexMap::default()) }
    }

    pub fn configure(&self, key: impl Into<String>, policy: RateLimitPolicy) {
        self.buckets.lock().insert(key.into(), Bucket::new(policy));
    }

    pub fn limit(&self, key: &str, cost: f64) -> Result<(), IntegrationError> {
        let timeout = match self.buckets.lock().get(key).map(|b| b.policy) {
            Some(RateLimitPolicy::Bucket { timeout, .. }) => timeout,
            Some(RateLimitPolicy::Unlimited) | None => Duration::MAX,
        };
        let deadline = std::time::Instant::now() + timeout.min(Duration::from_secs(3600 * 24));

        loop {
            let outcome = {
                let mut buckets = self.buckets.lock();
                let bucket = buckets.entry(key.to_string()).or_insert_with(|| Bucket::new(RateLimitPolicy::Unlimited));
                bucket.try_take(cost, Instant::now())
            };
            match outcome {
                Ok(()) => return Ok(()),
                Err(wait) => {
                    if std::time::Instant::now() + wait > deadline {
                        return Err(IntegrationError::RateLimited {
                            key: key.to_string(),
                            timeout_ms: timeout.as_millis() as u64,
                        });
                    }
                    std::thread::sleep(wait);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn unconfigured_key_bypasses_limiting() {
        let limiter = AsyncRateLimiter::new();
        for _ in 0..100 {
            limiter.limit("/unknown", 1.0).await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_bucket_waits_then_succeeds() {
        let limiter = AsyncRateLimiter::new();
        limiter.configure("/trade", RateLimitPolicy::Bucket {
            rate: 10.0,
            burst: 1.0,
            timeout: Duration::from_secs(5),
        });

        limiter.limit("/trade", 1.0).await.unwrap();

        let start = Instant::now();
        limiter.limit("/trade", 1.0).await.unwrap();
        assert!(Instant::now() >= start);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_when_wait_exceeds_timeout() {
        let limiter = AsyncRateLimiter::new();
        limiter.configure("/trade", RateLimitPolicy::Bucket {
            rate: 0.01,
            burst: 1.0,
            timeout: Duration::from_millis(10),
        });

        limiter.limit("/trade", 1.0).await.unwrap();
        let err = limiter.limit("/trade", 1.0).await.unwrap_err();
        assert!(matches!(err, IntegrationError::RateLimited { .. }));
    }
}
