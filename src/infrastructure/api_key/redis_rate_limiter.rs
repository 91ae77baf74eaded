//! Redis-backed rate limiter
//!
//! Keeps one sorted set of request timestamps per key. Evaluation and
//! recording run inside a single Lua script, so concurrent requests from
//! several gateway instances are counted exactly once.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};
use uuid::Uuid;

use super::rate_limiter::{RateLimitResult, RateLimiter};
use crate::domain::api_key::{ApiKeyId, RateLimitConfig, RateLimitWindow};
use crate::domain::DomainError;

const SLIDING_WINDOW_SCRIPT: &str = r#"
local key = KEYS[1]
local now = tonumber(ARGV[1])
local member = ARGV[2]
local longest = tonumber(ARGV[3])

redis.call('ZREMRANGEBYSCORE', key, '-inf', now - longest)

local minute_count = 0
local index = 0
for i = 4, #ARGV, 2 do
  local window = tonumber(ARGV[i])
  local limit = tonumber(ARGV[i + 1])
  local count = redis.call('ZCOUNT', key, '(' .. (now - window), '+inf')
  if index == 1 then
    minute_count = count
  end
  if count >= limit then
    local oldest = redis.call('ZRANGEBYSCORE', key, '(' .. (now - window), '+inf', 'WITHSCORES', 'LIMIT', 0, 1)
    local reset = window
    if oldest[2] then
      reset = tonumber(oldest[2]) + window - now
    end
    return {0, index, limit, reset}
  end
  index = index + 1
end

redis.call('ZADD', key, now, member)
redis.call('PEXPIRE', key, longest)
return {1, -1, minute_count + 1, 0}
"#;

/// Redis sliding window limiter
#[derive(Clone)]
pub struct RedisRateLimiter {
    connection: ConnectionManager,
    key_prefix: String,
    script: Script,
}

impl fmt::Debug for RedisRateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisRateLimiter")
            .field("key_prefix", &self.key_prefix)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisRateLimiter {
    /// Connect to Redis
    pub async fn connect(url: &str) -> Result<Self, DomainError> {
        let client = Client::open(url)
            .map_err(|e| DomainError::cache(format!("Failed to create Redis client: {}", e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self {
            connection,
            key_prefix: "bzk:ratelimit".to_string(),
            script: Script::new(SLIDING_WINDOW_SCRIPT),
        })
    }

    /// Sets the key prefix
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    fn redis_key(&self, key: &ApiKeyId) -> String {
        redis_key(&self.key_prefix, key)
    }
}

fn redis_key(prefix: &str, key: &ApiKeyId) -> String {
    format!("{}:{}", prefix, key)
}

/// Script arguments after the member: longest window, then (window_ms, limit) pairs
fn window_args(config: &RateLimitConfig) -> Vec<i64> {
    let mut args = vec![RateLimitWindow::Day.duration_secs() * 1000];

    for window in RateLimitWindow::ALL {
        args.push(window.duration_secs() * 1000);
        args.push(config.limit_for(window) as i64);
    }

    args
}

/// Translate the script's reply into a result
fn parse_reply(reply: &[i64], config: &RateLimitConfig) -> Result<RateLimitResult, DomainError> {
    let [allowed, index, value, reset_ms] = reply else {
        return Err(DomainError::cache(format!(
            "Unexpected rate limit script reply: {:?}",
            reply
        )));
    };

    if *allowed == 1 {
        return Ok(RateLimitResult::allowed(config, *value as u32));
    }

    let window = RateLimitWindow::ALL
        .get(*index as usize)
        .copied()
        .ok_or_else(|| DomainError::cache(format!("Unknown rate limit window index {}", index)))?;

    let reset_secs = ((*reset_ms).max(0) as u64).div_ceil(1000);

    Ok(RateLimitResult::exceeded(window, *value as u32, reset_secs))
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn check_and_record(
        &self,
        key: &ApiKeyId,
        config: &RateLimitConfig,
        now: DateTime<Utc>,
    ) -> Result<RateLimitResult, DomainError> {
        let mut conn = self.connection.clone();
        let member = format!("{}-{}", now.timestamp_millis(), Uuid::new_v4().simple());

        let mut invocation = self.script.key(self.redis_key(key));
        invocation.arg(now.timestamp_millis()).arg(member);

        for arg in window_args(config) {
            invocation.arg(arg);
        }

        let reply: Vec<i64> = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(|e| DomainError::cache(format!("Rate limit script failed: {}", e)))?;

        parse_reply(&reply, config)
    }

    async fn reset(&self, key: &ApiKeyId) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();

        let _: () = conn
            .del(self.redis_key(key))
            .await
            .map_err(|e| DomainError::cache(format!("Failed to reset rate limit: {}", e)))?;

        Ok(())
    }
}
