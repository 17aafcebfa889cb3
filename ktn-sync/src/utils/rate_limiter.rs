//! Pacing of remote reads
//!
//! Every remote read is preceded by a wait so that at least the profile
//! delay separates two reads. The first read also waits: a task may be
//! started right after a previous one finished reading.

use ktn_common::config::RequestProfile;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval,
        }
    }

    pub fn for_profile(profile: RequestProfile) -> Self {
        Self::new(profile.delay())
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait if necessary before the next remote read
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        let wait_time = match *last {
            Some(last_time) => self.min_interval.saturating_sub(last_time.elapsed()),
            None => self.min_interval,
        };

        if !wait_time.is_zero() {
            tracing::debug!("Rate limiting: waiting {:?}", wait_time);
            tokio::time::sleep(wait_time).await;
        }

        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles() {
        assert_eq!(
            RateLimiter::for_profile(RequestProfile::Greedy).min_interval(),
            Duration::from_millis(50)
        );
        assert_eq!(
            RateLimiter::for_profile(RequestProfile::Safe).min_interval(),
            Duration::from_millis(1200)
        );
    }

    #[tokio::test]
    async fn test_consecutive_waits_are_spaced() {
        let limiter = RateLimiter::new(Duration::from_millis(30));
        let start = Instant::now();

        limiter.wait().await;
        limiter.wait().await;

        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_zero_interval_never_sleeps() {
        let limiter = RateLimiter::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..10 {
            limiter.wait().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
