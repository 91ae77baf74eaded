//! API Key infrastructure implementations
//!
//! This module provides implementations for API key generation,
//! storage, validation, and rate limiting.

mod generator;
mod postgres_repository;
mod rate_limiter;
mod redis_rate_limiter;
mod repository;
mod service;

pub use generator::{
    extract_key_id, hash_key, verify_key, ApiKeyGenerator, GeneratedApiKey, KEY_PREFIX,
};
pub use postgres_repository::PostgresApiKeyRepository;
pub use rate_limiter::{InMemoryRateLimiter, RateLimitResult, RateLimiter};
pub use redis_rate_limiter::RedisRateLimiter;
pub use repository::InMemoryApiKeyRepository;
pub use service::{ApiKeyService, CreateApiKeyRequest, IssuedApiKey, UpdateApiKeyRequest};
