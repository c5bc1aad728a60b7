//! Token-bucket limiter for embedding calls.
//!
//! One bucket is shared by every task that talks to the same provider, so
//! concurrent indexing runs stay under the provider's request rate together.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::trace;

/// Provider request limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimit {
    pub requests_per_second: f64,
    /// Bucket capacity (requests allowed back-to-back).
    pub burst: u32,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket rate limiter.
#[derive(Debug)]
pub struct TokenBucket {
    limit: Option<RateLimit>,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Starts with a full bucket.
    pub fn new(limit: RateLimit) -> Self {
        let burst = limit.burst.max(1);
        Self {
            limit: Some(RateLimit { burst, ..limit }),
            state: Mutex::new(BucketState {
                tokens: burst as f64,
                last_refill: Instant::now(),
            }),
        }
    }

    /// A limiter that never waits.
    pub fn unlimited() -> Self {
        Self {
            limit: None,
            state: Mutex::new(BucketState {
                tokens: 0.0,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Waits until a permit is available and takes it.
    pub async fn acquire(&self) {
        let Some(limit) = self.limit else {
            return;
        };

        loop {
            let wait = {
                let mut st = self.state.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(st.last_refill).as_secs_f64();
                st.tokens = (st.tokens + elapsed * limit.requests_per_second).min(limit.burst as f64);
                st.last_refill = now;

                if st.tokens >= 1.0 {
                    st.tokens -= 1.0;
                    return;
                }
                Duration::from_secs_f64((1.0 - st.tokens) / limit.requests_per_second)
            };

            trace!(wait_ms = wait.as_millis(), "rate limiter: waiting for permit");
            sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn burst_is_free_then_waits() {
        let bucket = TokenBucket::new(RateLimit {
            requests_per_second: 20.0,
            burst: 2,
        });

        let started = Instant::now();
        bucket.acquire().await;
        bucket.acquire().await;
        assert!(started.elapsed() < Duration::from_millis(40));

        bucket.acquire().await;
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn unlimited_never_waits() {
        let bucket = TokenBucket::unlimited();
        let started = Instant::now();
        for _ in 0..100 {
            bucket.acquire().await;
        }
        assert!(started.elapsed() < Duration::from_millis(50));
    }
}
