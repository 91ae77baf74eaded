//! Rate limiter implementation
//!
//! Provides sliding window rate limiting for API keys across the burst,
//! minute, hour and day windows.

use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::api_key::{ApiKeyId, RateLimitConfig, RateLimitWindow};
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Result of a rate limit check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    /// Whether the request is allowed
    pub allowed: bool,
    /// Remaining requests in the per-minute window
    pub remaining: u32,
    /// Limit of the reported window
    pub limit: u32,
    /// Seconds until the reported window frees a slot
    pub reset_in_seconds: u64,
    /// Which window was exceeded (if any)
    pub window: Option<RateLimitWindow>,
}

impl RateLimitResult {
    pub(crate) fn allowed(config: &RateLimitConfig, minute_count_after: u32) -> Self {
        Self {
            allowed: true,
            remaining: config.requests_per_minute.saturating_sub(minute_count_after),
            limit: config.requests_per_minute,
            reset_in_seconds: RateLimitWindow::Minute.duration_secs() as u64,
            window: None,
        }
    }

    pub(crate) fn exceeded(window: RateLimitWindow, limit: u32, reset_in_seconds: u64) -> Self {
        Self {
            allowed: false,
            remaining: 0,
            limit,
            reset_in_seconds: reset_in_seconds.max(1),
            window: Some(window),
        }
    }
}

/// Atomic check-and-record rate limiting
///
/// A request is only recorded when it is allowed, so refused requests never
/// consume budget.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RateLimiter: Send + Sync + Debug {
    /// Evaluate every window and record the request if all pass
    async fn check_and_record(
        &self,
        key: &ApiKeyId,
        config: &RateLimitConfig,
        now: DateTime<Utc>,
    ) -> Result<RateLimitResult, DomainError>;

    /// Forget all recorded requests for a key
    async fn reset(&self, key: &ApiKeyId) -> Result<(), DomainError>;
}

/// Process-local sliding window limiter
///
/// Keys that stop sending requests are swept out by a periodic pass riding on
/// `check_and_record`, so the map does not grow with every key ever seen.
#[derive(Debug)]
pub struct InMemoryRateLimiter {
    /// Per-key request timestamps, oldest first
    records: Arc<RwLock<HashMap<ApiKeyId, VecDeque<DateTime<Utc>>>>>,
    last_cleanup: RwLock<Option<DateTime<Utc>>>,
    cleanup_interval: Duration,
}

impl InMemoryRateLimiter {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            last_cleanup: RwLock::new(None),
            cleanup_interval: Duration::minutes(5),
        }
    }

    /// Number of keys currently tracked
    #[cfg(test)]
    async fn tracked_keys(&self) -> usize {
        self.records.read().await.len()
    }

    /// True at most once per `cleanup_interval`
    async fn cleanup_due(&self, now: DateTime<Utc>) -> bool {
        let mut last = self.last_cleanup.write().await;

        match *last {
            Some(at) if now - at < self.cleanup_interval => false,
            Some(_) => {
                *last = Some(now);
                true
            }
            None => {
                *last = Some(now);
                false
            }
        }
    }
}

impl Default for InMemoryRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

fn prune(timestamps: &mut VecDeque<DateTime<Utc>>, cutoff: DateTime<Utc>) {
    while timestamps.front().is_some_and(|t| *t <= cutoff) {
        timestamps.pop_front();
    }
}

/// Evaluate the windows against recorded timestamps
pub(crate) fn evaluate(
    timestamps: &VecDeque<DateTime<Utc>>,
    config: &RateLimitConfig,
    now: DateTime<Utc>,
) -> RateLimitResult {
    let mut minute_count = 0;

    for window in RateLimitWindow::ALL {
        let window_len = Duration::seconds(window.duration_secs());
        let window_start = now - window_len;
        let limit = config.limit_for(window);

        let mut in_window = timestamps.iter().filter(|t| **t > window_start);
        let oldest = in_window.next().copied();
        let count = oldest.map(|_| 1 + in_window.count()).unwrap_or(0) as u32;

        if window == RateLimitWindow::Minute {
            minute_count = count;
        }

        if count >= limit {
            let reset_in = oldest
                .map(|t| (t + window_len - now).num_milliseconds())
                .map(|ms| ((ms + 999) / 1000).max(0) as u64)
                .unwrap_or(window.duration_secs() as u64);

            return RateLimitResult::exceeded(window, limit, reset_in);
        }
    }

    RateLimitResult::allowed(config, minute_count + 1)
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check_and_record(
        &self,
        key: &ApiKeyId,
        config: &RateLimitConfig,
        now: DateTime<Utc>,
    ) -> Result<RateLimitResult, DomainError> {
        let cutoff = now - Duration::seconds(RateLimitWindow::Day.duration_secs());
        let mut records = self.records.write().await;

        if self.cleanup_due(now).await {
            let before = records.len();
            for timestamps in records.values_mut() {
                prune(timestamps, cutoff);
            }
            records.retain(|_, v| !v.is_empty());
            debug!(dropped = before - records.len(), "Swept idle rate limit entries");
        }

        let timestamps = records.entry(*key).or_default();

        prune(timestamps, cutoff);

        let result = evaluate(timestamps, config, now);

        if result.allowed {
            timestamps.push_back(now);
        }

        Ok(result)
    }

    async fn reset(&self, key: &ApiKeyId) -> Result<(), DomainError> {
        self.records.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(per_minute: u32, burst: u32) -> RateLimitConfig {
        RateLimitConfig::new(per_minute, 100, 1000, burst)
    }

    #[tokio::test]
    async fn test_allows_first_request() {
        let limiter = InMemoryRateLimiter::new();
        let key = ApiKeyId::generate();

        let result = limiter
            .check_and_record(&key, &config(10, 10), Utc::now())
            .await
            .unwrap();

        assert!(result.allowed);
        assert_eq!(result.remaining, 9);
        assert_eq!(result.limit, 10);
    }

    #[tokio::test]
    async fn test_blocks_over_minute_limit() {
        let limiter = InMemoryRateLimiter::new();
        let key = ApiKeyId::generate();
        let now = Utc::now();
        let cfg = config(2, 10);

        limiter.check_and_record(&key, &cfg, now).await.unwrap();
        limiter
            .check_and_record(&key, &cfg, now + Duration::seconds(2))
            .await
            .unwrap();

        let result = limiter
            .check_and_record(&key, &cfg, now + Duration::seconds(4))
            .await
            .unwrap();

        assert!(!result.allowed);
        assert_eq!(result.window, Some(RateLimitWindow::Minute));
        assert_eq!(result.reset_in_seconds, 56);
    }

    #[tokio::test]
    async fn test_minute_window_slides() {
        let limiter = InMemoryRateLimiter::new();
        let key = ApiKeyId::generate();
        let now = Utc::now();
        let cfg = config(1, 10);

        assert!(limiter.check_and_record(&key, &cfg, now).await.unwrap().allowed);
        assert!(
            !limiter
                .check_and_record(&key, &cfg, now + Duration::seconds(59))
                .await
                .unwrap()
                .allowed
        );
        assert!(
            limiter
                .check_and_record(&key, &cfg, now + Duration::seconds(60))
                .await
                .unwrap()
                .allowed
        );
    }

    #[tokio::test]
    async fn test_burst_limit() {
        let limiter = InMemoryRateLimiter::new();
        let key = ApiKeyId::generate();
        let now = Utc::now();
        let cfg = config(100, 2);

        limiter.check_and_record(&key, &cfg, now).await.unwrap();
        limiter.check_and_record(&key, &cfg, now).await.unwrap();

        let blocked = limiter.check_and_record(&key, &cfg, now).await.unwrap();
        assert_eq!(blocked.window, Some(RateLimitWindow::Burst));

        let later = limiter
            .check_and_record(&key, &cfg, now + Duration::milliseconds(1001))
            .await
            .unwrap();
        assert!(later.allowed);
    }

    #[tokio::test]
    async fn test_denied_requests_do_not_consume_budget() {
        let limiter = InMemoryRateLimiter::new();
        let key = ApiKeyId::generate();
        let now = Utc::now();
        let cfg = config(1, 10);

        limiter.check_and_record(&key, &cfg, now).await.unwrap();
        for i in 1..10 {
            limiter
                .check_and_record(&key, &cfg, now + Duration::seconds(i))
                .await
                .unwrap();
        }

        let result = limiter
            .check_and_record(&key, &cfg, now + Duration::seconds(60))
            .await
            .unwrap();
        assert!(result.allowed);
    }

    #[tokio::test]
    async fn test_hour_limit() {
        let limiter = InMemoryRateLimiter::new();
        let key = ApiKeyId::generate();
        let now = Utc::now();
        let cfg = RateLimitConfig::new(10, 3, 1000, 10);

        for i in 0..3 {
            let at = now + Duration::minutes(i * 2);
            assert!(limiter.check_and_record(&key, &cfg, at).await.unwrap().allowed);
        }

        let result = limiter
            .check_and_record(&key, &cfg, now + Duration::minutes(10))
            .await
            .unwrap();
        assert_eq!(result.window, Some(RateLimitWindow::Hour));
        assert_eq!(result.limit, 3);
    }

    #[tokio::test]
    async fn test_different_keys_are_independent() {
        let limiter = InMemoryRateLimiter::new();
        let first = ApiKeyId::generate();
        let second = ApiKeyId::generate();
        let now = Utc::now();
        let cfg = config(1, 10);

        limiter.check_and_record(&first, &cfg, now).await.unwrap();

        assert!(limiter.check_and_record(&second, &cfg, now).await.unwrap().allowed);
        assert!(!limiter.check_and_record(&first, &cfg, now).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_reset() {
        let limiter = InMemoryRateLimiter::new();
        let key = ApiKeyId::generate();
        let now = Utc::now();
        let cfg = config(1, 10);

        limiter.check_and_record(&key, &cfg, now).await.unwrap();
        limiter.reset(&key).await.unwrap();

        assert!(limiter.check_and_record(&key, &cfg, now).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_idle_keys_are_swept_by_later_checks() {
        let limiter = InMemoryRateLimiter::new();
        let now = Utc::now();
        let cfg = config(10, 10);

        limiter
            .check_and_record(&ApiKeyId::generate(), &cfg, now)
            .await
            .unwrap();
        limiter
            .check_and_record(&ApiKeyId::generate(), &cfg, now)
            .await
            .unwrap();
        assert_eq!(limiter.tracked_keys().await, 2);

        let active = ApiKeyId::generate();
        limiter
            .check_and_record(&active, &cfg, now + Duration::days(2))
            .await
            .unwrap();
        assert_eq!(limiter.tracked_keys().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_never_overshoot() {
        let limiter = Arc::new(InMemoryRateLimiter::new());
        let key = ApiKeyId::generate();
        let now = Utc::now();
        let cfg = config(5, 50);

        let handles: Vec<_> = (0..25)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move { limiter.check_and_record(&key, &cfg, now).await })
            })
            .collect();

        let mut allowed = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().allowed {
                allowed += 1;
            }
        }

        assert_eq!(allowed, 5);
    }
}
