//! Request rate limiting for discovery.
//!
//! Fixed-rate token bucket with zero burst accumulation: a background task
//! adds one permit per tick and drops the refill when the bucket is already
//! full, so admission never exceeds the configured ceiling no matter how
//! long the limiter sat idle.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Admits at most `requests_per_second` permits per rolling one-second
/// window. Lives for the duration of the owning discovery run; the refill
/// task is aborted on drop.
pub struct RateLimiter {
    permits: Arc<Semaphore>,
    refill: JoinHandle<()>,
}

impl RateLimiter {
    pub fn new(requests_per_second: usize) -> Self {
        let capacity = requests_per_second.max(1);
        let permits = Arc::new(Semaphore::new(capacity));

        let refill = {
            let permits = Arc::clone(&permits);
            let period = Duration::from_secs(1) / capacity as u32;
            tokio::spawn(async move {
                let mut tick = tokio::time::interval(period);
                tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    tick.tick().await;
                    // Bucket full: drop the refill instead of banking it.
                    if permits.available_permits() < capacity {
                        permits.add_permits(1);
                    }
                }
            })
        };

        Self { permits, refill }
    }

    /// Block the calling task until a permit is available.
    pub async fn wait(&self) {
        // acquire() only fails once the semaphore is closed, which never
        // happens while the limiter is alive.
        if let Ok(permit) = self.permits.acquire().await {
            permit.forget();
        }
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.refill.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn initial_burst_is_capped_at_the_configured_rate() {
        let limiter = RateLimiter::new(4);
        let start = Instant::now();

        // The bucket starts full: the first four permits are immediate.
        for _ in 0..4 {
            limiter.wait().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));

        // The fifth has to wait for a refill tick (250ms period at 4 rps).
        limiter.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_time_does_not_accumulate_burst_capacity() {
        let limiter = RateLimiter::new(4);

        // Let the refill task tick many times with a full bucket.
        tokio::time::sleep(Duration::from_secs(5)).await;

        let start = Instant::now();
        for _ in 0..8 {
            limiter.wait().await;
        }
        // Only 4 permits were banked; the remaining 4 each waited a tick.
        assert!(start.elapsed() >= Duration::from_millis(750));
    }

    #[tokio::test(start_paused = true)]
    async fn sustained_rate_matches_configuration() {
        let limiter = RateLimiter::new(10);
        let start = Instant::now();
        for _ in 0..30 {
            limiter.wait().await;
        }
        // 10 banked + 20 refilled at 100ms each.
        assert!(start.elapsed() >= Duration::from_millis(1900));
        assert!(start.elapsed() <= Duration::from_secs(4));
    }
}
