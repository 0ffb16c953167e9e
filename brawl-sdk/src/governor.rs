use crate::classify::RateHeaders;
use crate::{Error, Result};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// The API's rate limit window as last reported in response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateState {
    /// Requests allowed per window.
    pub limit: u32,
    pub remaining: u32,
    /// Unix timestamp in seconds at which the window resets.
    pub reset_at: i64,
}

impl Default for RateState {
    fn default() -> Self {
        Self {
            limit: 3,
            remaining: 3,
            reset_at: 0,
        }
    }
}

impl RateState {
    /// Take over the window from `headers`. Ignored unless the limit is sent.
    pub fn observe(&mut self, headers: &RateHeaders) {
        if let Some(limit) = headers.limit {
            self.limit = limit;
            self.remaining = headers.remaining.unwrap_or(limit);
            self.reset_at = headers.reset.unwrap_or(0);
        }
    }

    /// How long to hold the next request at unix time `now`, if at all.
    pub fn wait_at(&self, now: i64) -> Option<Duration> {
        if self.remaining == 0 && now < self.reset_at {
            Some(Duration::from_secs((self.reset_at - now) as u64))
        } else {
            None
        }
    }
}

/// Decides whether a request may go out now.
///
/// Implementations hand out permits on their own schedule; callers never
/// return them.
pub trait RateGovernor: Send + Sync + std::fmt::Debug {
    /// Take a permit, or say how long until one is available.
    fn try_acquire(&self) -> core::result::Result<(), Duration>;
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last: Instant,
}

/// Token bucket refilled continuously at a fixed rate.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    bucket: Mutex<Bucket>,
}

impl TokenBucket {
    /// A full bucket holding `capacity` permits, refilled at `refill_per_sec`.
    pub fn new(capacity: u32, refill_per_sec: f64) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidArgument(
                "token bucket capacity must be at least 1".into(),
            ));
        }
        if !(refill_per_sec.is_finite() && refill_per_sec > 0.0) {
            return Err(Error::InvalidArgument(format!(
                "token bucket refill rate must be positive, got {}",
                refill_per_sec
            )));
        }
        Ok(Self {
            capacity: capacity as f64,
            refill_per_sec,
            bucket: Mutex::new(Bucket {
                tokens: capacity as f64,
                last: Instant::now(),
            }),
        })
    }

    /// At most `requests` per second, allowing a burst of the same size.
    pub fn per_second(requests: u32) -> Result<Self> {
        Self::new(requests, requests as f64)
    }

    /// One request per `interval`, no bursts.
    pub fn with_interval(interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::InvalidArgument(
                "request interval must be greater than zero".into(),
            ));
        }
        Self::new(1, 1.0 / interval.as_secs_f64())
    }

    /// Permits currently available.
    pub fn available(&self) -> f64 {
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
        self.refill(&mut bucket);
        bucket.tokens
    }

    fn refill(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(bucket.last).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        bucket.last = now;
    }
}

impl RateGovernor for TokenBucket {
    fn try_acquire(&self) -> core::result::Result<(), Duration> {
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
        self.refill(&mut bucket);
        // float drift after sleeping exactly the advertised wait
        if bucket.tokens + 1e-9 >= 1.0 {
            bucket.tokens = (bucket.tokens - 1.0).max(0.0);
            Ok(())
        } else {
            let missing = 1.0 - bucket.tokens;
            let wait = Duration::try_from_secs_f64(missing / self.refill_per_sec);
            Err(wait.unwrap_or(Duration::MAX))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_state_waits_only_when_exhausted() {
        let mut state = RateState::default();
        assert_eq!(state.wait_at(100), None);
        state.observe(&RateHeaders {
            limit: Some(3),
            remaining: Some(0),
            reset: Some(105),
        });
        assert_eq!(state.wait_at(100), Some(Duration::from_secs(5)));
        assert_eq!(state.wait_at(105), None);
    }

    #[test]
    fn rate_state_ignores_partial_headers() {
        let mut state = RateState::default();
        state.observe(&RateHeaders {
            limit: None,
            remaining: Some(0),
            reset: Some(105),
        });
        assert_eq!(state, RateState::default());
    }

    #[test]
    fn rejects_bad_buckets() {
        assert!(TokenBucket::new(0, 1.0).is_err());
        assert!(TokenBucket::new(1, 0.0).is_err());
        assert!(TokenBucket::new(1, f64::NAN).is_err());
        assert!(TokenBucket::with_interval(Duration::ZERO).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn bucket_drains_then_refills() {
        let bucket = TokenBucket::per_second(2).unwrap();
        assert!(bucket.try_acquire().is_ok());
        assert!(bucket.try_acquire().is_ok());
        let wait = bucket.try_acquire().unwrap_err();
        assert_eq!(wait, Duration::from_millis(500));

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(bucket.try_acquire().is_ok());
        assert!(bucket.try_acquire().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn refill_is_capped() {
        let bucket = TokenBucket::new(2, 10.0).unwrap();
        tokio::time::advance(Duration::from_secs(60)).await;
        assert!((bucket.available() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn huge_waits_saturate() {
        let bucket = TokenBucket::with_interval(Duration::from_secs(u64::MAX)).unwrap();
        assert!(bucket.try_acquire().is_ok());
        assert_eq!(bucket.try_acquire().unwrap_err(), Duration::MAX);

        let bucket = TokenBucket::new(1, 1e-20).unwrap();
        assert!(bucket.try_acquire().is_ok());
        assert_eq!(bucket.try_acquire().unwrap_err(), Duration::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_spaces_requests() {
        let bucket = TokenBucket::with_interval(Duration::from_millis(250)).unwrap();
        assert!(bucket.try_acquire().is_ok());
        let wait = bucket.try_acquire().unwrap_err();
        assert!(wait <= Duration::from_millis(250));
        assert!(wait > Duration::from_millis(249));
        tokio::time::advance(wait).await;
        assert!(bucket.try_acquire().is_ok());
    }
}
