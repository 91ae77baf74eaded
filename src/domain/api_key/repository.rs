//! Persistence seam for API key records

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[cfg(test)]
use mockall::automock;

use super::entity::{ApiKey, ApiKeyId};
use crate::domain::DomainError;

/// Stores API key records. Only the digest of a secret ever reaches this layer.
///
/// Both `id` and `key_id` are unique; a clash on either is reported as
/// [`DomainError::Conflict`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ApiKeyRepository: Send + Sync + Debug {
    async fn get(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError>;

    /// Lookup by the public prefix embedded in the presented secret
    async fn get_by_key_id(&self, key_id: &str) -> Result<Option<ApiKey>, DomainError>;

    async fn create(&self, api_key: ApiKey) -> Result<ApiKey, DomainError>;

    /// Overwrites the record but never lowers `usage_count` or `last_used_at`,
    /// so an admin edit cannot erase concurrent traffic.
    ///
    /// The write only lands if the stored `version` still equals the one on
    /// `api_key`; otherwise [`DomainError::Conflict`] is returned and nothing
    /// changes. The returned record carries the bumped version.
    async fn update(&self, api_key: &ApiKey) -> Result<ApiKey, DomainError>;

    /// `Ok(false)` when nothing was stored under `id`
    async fn delete(&self, id: &ApiKeyId) -> Result<bool, DomainError>;

    async fn list(&self, active_only: bool) -> Result<Vec<ApiKey>, DomainError>;

    /// Increment `usage_count` by one and advance `last_used_at` in a single step
    async fn record_usage(&self, id: &ApiKeyId, at: DateTime<Utc>) -> Result<(), DomainError>;
}
