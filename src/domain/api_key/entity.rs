//! API Key entity and related types

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::decision::RateLimitWindow;
use super::permission::PermissionSet;
use super::validation::ApiKeyValidationError;

/// API key identifier (UUID v4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKeyId(Uuid);

impl ApiKeyId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an identifier from its string form
    pub fn parse(value: &str) -> Result<Self, ApiKeyValidationError> {
        Uuid::parse_str(value)
            .map(Self)
            .map_err(|_| ApiKeyValidationError::InvalidId(value.to_string()))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for ApiKeyId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for ApiKeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Environment a key is issued for; part of the key's visible prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum KeyEnvironment {
    #[default]
    Live,
    Test,
}

impl KeyEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Test => "test",
        }
    }
}

impl FromStr for KeyEnvironment {
    type Err = ApiKeyValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "live" => Ok(Self::Live),
            "test" => Ok(Self::Test),
            other => Err(ApiKeyValidationError::UnknownEnvironment(other.to_string())),
        }
    }
}

impl std::fmt::Display for KeyEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rate limit thresholds for a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    pub requests_per_hour: u32,
    pub requests_per_day: u32,
    /// Maximum requests inside the one-second burst window
    pub burst_limit: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            requests_per_hour: 1_000,
            requests_per_day: 10_000,
            burst_limit: 10,
        }
    }
}

impl RateLimitConfig {
    pub fn new(per_minute: u32, per_hour: u32, per_day: u32, burst: u32) -> Self {
        Self {
            requests_per_minute: per_minute,
            requests_per_hour: per_hour,
            requests_per_day: per_day,
            burst_limit: burst,
        }
    }

    /// Threshold configured for a window
    pub fn limit_for(&self, window: RateLimitWindow) -> u32 {
        match window {
            RateLimitWindow::Burst => self.burst_limit,
            RateLimitWindow::Minute => self.requests_per_minute,
            RateLimitWindow::Hour => self.requests_per_hour,
            RateLimitWindow::Day => self.requests_per_day,
        }
    }

    /// All thresholds must be positive
    pub fn validate(&self) -> Result<(), ApiKeyValidationError> {
        let checks = [
            ("requestsPerMinute", self.requests_per_minute),
            ("requestsPerHour", self.requests_per_hour),
            ("requestsPerDay", self.requests_per_day),
            ("burstLimit", self.burst_limit),
        ];

        for (name, value) in checks {
            if value == 0 {
                return Err(ApiKeyValidationError::NonPositiveRateLimit(name));
            }
        }

        Ok(())
    }
}

/// API Key entity
///
/// The plaintext secret is never stored; `key_hash` holds its SHA-256 digest
/// and `key_id` the public prefix used for lookup and display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    id: ApiKeyId,
    name: String,
    key_id: String,
    key_hash: String,
    environment: KeyEnvironment,
    permissions: PermissionSet,
    is_active: bool,
    rate_limit: RateLimitConfig,
    usage_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_used_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    revoked_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    revoked_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    revocation_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rotated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rotated_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rotation_reason: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_by: Option<String>,
    /// Bumped by the repository on every administrative write
    #[serde(skip)]
    version: u64,
}

impl ApiKey {
    /// Create a new, active API key with default rate limits
    pub fn new(
        id: ApiKeyId,
        name: impl Into<String>,
        key_id: impl Into<String>,
        key_hash: impl Into<String>,
        environment: KeyEnvironment,
        created_by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            key_id: key_id.into(),
            key_hash: key_hash.into(),
            environment,
            permissions: PermissionSet::default(),
            is_active: true,
            rate_limit: RateLimitConfig::default(),
            usage_count: 0,
            expires_at: None,
            last_used_at: None,
            revoked_at: None,
            revoked_by: None,
            revocation_reason: None,
            rotated_at: None,
            rotated_by: None,
            rotation_reason: None,
            created_by: created_by.into(),
            created_at: now,
            updated_at: now,
            updated_by: None,
            version: 0,
        }
    }

    pub fn with_permissions(mut self, permissions: PermissionSet) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_expiration(mut self, expires_at: Option<DateTime<Utc>>) -> Self {
        self.expires_at = expires_at;
        self
    }

    // Getters

    pub fn id(&self) -> &ApiKeyId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn key_hash(&self) -> &str {
        &self.key_hash
    }

    pub fn environment(&self) -> KeyEnvironment {
        self.environment
    }

    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn rate_limit(&self) -> &RateLimitConfig {
        &self.rate_limit
    }

    pub fn usage_count(&self) -> u64 {
        self.usage_count
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn last_used_at(&self) -> Option<DateTime<Utc>> {
        self.last_used_at
    }

    pub fn revoked_at(&self) -> Option<DateTime<Utc>> {
        self.revoked_at
    }

    pub fn revoked_by(&self) -> Option<&str> {
        self.revoked_by.as_deref()
    }

    pub fn revocation_reason(&self) -> Option<&str> {
        self.revocation_reason.as_deref()
    }

    pub fn rotated_at(&self) -> Option<DateTime<Utc>> {
        self.rotated_at
    }

    pub fn rotated_by(&self) -> Option<&str> {
        self.rotated_by.as_deref()
    }

    pub fn rotation_reason(&self) -> Option<&str> {
        self.rotation_reason.as_deref()
    }

    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn updated_by(&self) -> Option<&str> {
        self.updated_by.as_deref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    // Status checks

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    // Mutators

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_permissions(&mut self, permissions: PermissionSet) {
        self.permissions = permissions;
    }

    pub fn set_rate_limit(&mut self, rate_limit: RateLimitConfig) {
        self.rate_limit = rate_limit;
    }

    pub fn set_expiration(&mut self, expires_at: Option<DateTime<Utc>>) {
        self.expires_at = expires_at;
    }

    /// Reactivating clears the revocation audit trail
    pub fn set_active(&mut self, active: bool) {
        if active && !self.is_active {
            self.revoked_at = None;
            self.revoked_by = None;
            self.revocation_reason = None;
        }
        self.is_active = active;
    }

    /// Record one successful use
    pub fn record_usage(&mut self, at: DateTime<Utc>) {
        self.usage_count = self.usage_count.saturating_add(1);
        self.last_used_at = Some(at);
    }

    /// Keep the higher usage figures of `self` and `stored`
    pub(crate) fn absorb_usage(&mut self, stored: &ApiKey) {
        self.usage_count = self.usage_count.max(stored.usage_count);
        self.last_used_at = self.last_used_at.max(stored.last_used_at);
    }

    pub(crate) fn bump_version(&mut self) {
        self.version = self.version.saturating_add(1);
    }

    /// Revoke the key, overwriting any earlier revocation audit fields
    pub fn revoke(&mut self, by: impl Into<String>, reason: Option<String>, now: DateTime<Utc>) {
        self.is_active = false;
        self.revoked_at = Some(now);
        self.revoked_by = Some(by.into());
        self.revocation_reason = reason;
        self.touch(self.revoked_by.clone(), now);
    }

    /// Swap in a freshly generated secret
    pub fn rotate(
        &mut self,
        key_id: impl Into<String>,
        key_hash: impl Into<String>,
        by: impl Into<String>,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.key_id = key_id.into();
        self.key_hash = key_hash.into();
        self.rotated_at = Some(now);
        self.rotated_by = Some(by.into());
        self.rotation_reason = reason;
        self.touch(self.rotated_by.clone(), now);
    }

    /// Stamp the modification time and actor
    pub fn touch(&mut self, by: Option<String>, now: DateTime<Utc>) {
        self.updated_at = now;
        if by.is_some() {
            self.updated_by = by;
        }
    }

    /// Restore a record from persistent storage
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn restore(
        id: ApiKeyId,
        name: String,
        key_id: String,
        key_hash: String,
        environment: KeyEnvironment,
        permissions: PermissionSet,
        is_active: bool,
        rate_limit: RateLimitConfig,
        usage_count: u64,
        expires_at: Option<DateTime<Utc>>,
        last_used_at: Option<DateTime<Utc>>,
        revocation: (Option<DateTime<Utc>>, Option<String>, Option<String>),
        rotation: (Option<DateTime<Utc>>, Option<String>, Option<String>),
        created_by: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        updated_by: Option<String>,
        version: u64,
    ) -> Self {
        Self {
            id,
            name,
            key_id,
            key_hash,
            environment,
            permissions,
            is_active,
            rate_limit,
            usage_count,
            expires_at,
            last_used_at,
            revoked_at: revocation.0,
            revoked_by: revocation.1,
            revocation_reason: revocation.2,
            rotated_at: rotation.0,
            rotated_by: rotation.1,
            rotation_reason: rotation.2,
            created_by,
            created_at,
            updated_at,
            updated_by,
            version,
        }
    }
}
