use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tracing::debug;

use super::ReasoningError;
use crate::config::ThrottleConfig;

/// Token bucket plus a concurrency cap, with random jitter on every wait.
#[derive(Debug)]
pub struct Throttle {
    bucket: Mutex<Bucket>,
    permits: Arc<Semaphore>,
    rate_per_sec: f64,
    capacity: f64,
    jitter_ms: u64,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

/// Held for the duration of one reasoning call.
#[derive(Debug)]
pub struct ThrottlePermit {
    _permit: OwnedSemaphorePermit,
}

impl Throttle {
    pub fn new(config: &ThrottleConfig) -> Self {
        let capacity = f64::from(config.burst.max(1));
        Self {
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                refilled_at: Instant::now(),
            }),
            permits: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
            rate_per_sec: config.rate_per_sec,
            capacity,
            jitter_ms: config.jitter_ms,
        }
    }

    /// No rate limit and generous concurrency; for tests and offline tools.
    pub fn unlimited() -> Self {
        Self::new(&ThrottleConfig {
            rate_per_sec: 0.0,
            burst: 1,
            max_concurrency: Semaphore::MAX_PERMITS,
            jitter_ms: 0,
        })
    }

    pub async fn acquire(&self) -> Result<ThrottlePermit, ReasoningError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| ReasoningError::Unavailable("throttle closed".to_string()))?;
        self.take_token().await;
        Ok(ThrottlePermit { _permit: permit })
    }

    async fn take_token(&self) {
        if self.rate_per_sec <= 0.0 {
            return;
        }
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(bucket.refilled_at).as_secs_f64();
                bucket.tokens = (bucket.tokens + elapsed * self.rate_per_sec).min(self.capacity);
                bucket.refilled_at = now;
                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    None
                } else {
                    Some(Duration::from_secs_f64(
                        (1.0 - bucket.tokens) / self.rate_per_sec,
                    ))
                }
            };

            match wait {
                None => return,
                Some(delay) => {
                    let delay = delay + self.jitter();
                    debug!(delay_ms = delay.as_millis() as u64, "reasoning call throttled");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn jitter(&self) -> Duration {
        jitter(self.jitter_ms)
    }
}

/// Uniform random delay in `0..=max_ms` milliseconds.
pub(crate) fn jitter(max_ms: u64) -> Duration {
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=max_ms))
}
