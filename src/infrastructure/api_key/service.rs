//! API Key service
//!
//! High-level operations for API key management and request authorization.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::domain::api_key::{
    validate_api_key_name, ApiKey, ApiKeyId, ApiKeyRepository, ApiKeyValidationError,
    AuthorizationDecision, DenyReason, KeyEnvironment, PermissionSet, RateLimitConfig,
};
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::DomainError;

use super::generator::{extract_key_id, verify_key, ApiKeyGenerator, GeneratedApiKey};
use super::rate_limiter::{InMemoryRateLimiter, RateLimiter};

/// Attempts at generating a key whose public ID is not already taken
const MAX_GENERATION_ATTEMPTS: usize = 3;

/// Attempts at landing an administrative write on an unchanged record
const MAX_WRITE_ATTEMPTS: usize = 3;

/// Request for creating a new API key
#[derive(Debug, Clone)]
pub struct CreateApiKeyRequest {
    pub name: String,
    pub permissions: Vec<String>,
    pub created_by: String,
    pub environment: KeyEnvironment,
    pub rate_limit: Option<RateLimitConfig>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Partial update of an API key; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct UpdateApiKeyRequest {
    pub name: Option<String>,
    pub permissions: Option<Vec<String>>,
    pub is_active: Option<bool>,
    /// `Some(None)` clears the expiration
    pub expires_at: Option<Option<DateTime<Utc>>>,
    pub rate_limit: Option<RateLimitConfig>,
}

/// A key record together with its plaintext secret (shown once)
#[derive(Debug)]
pub struct IssuedApiKey {
    pub api_key: ApiKey,
    pub secret: String,
}

fn validation(err: ApiKeyValidationError) -> DomainError {
    DomainError::validation(err.to_string())
}

/// API Key service for managing and authorizing API keys
#[derive(Debug)]
pub struct ApiKeyService {
    repository: Arc<dyn ApiKeyRepository>,
    generator: ApiKeyGenerator,
    rate_limiter: Arc<dyn RateLimiter>,
    clock: Arc<dyn Clock>,
    default_rate_limit: RateLimitConfig,
    default_environment: KeyEnvironment,
}

impl ApiKeyService {
    /// Create a new API key service with an in-memory rate limiter
    pub fn new(repository: Arc<dyn ApiKeyRepository>) -> Self {
        Self {
            repository,
            generator: ApiKeyGenerator::new(),
            rate_limiter: Arc::new(InMemoryRateLimiter::new()),
            clock: Arc::new(SystemClock),
            default_rate_limit: RateLimitConfig::default(),
            default_environment: KeyEnvironment::default(),
        }
    }

    pub fn with_rate_limiter(mut self, rate_limiter: Arc<dyn RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Limits applied when a create request omits them
    pub fn with_default_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.default_rate_limit = rate_limit;
        self
    }

    pub fn with_default_environment(mut self, environment: KeyEnvironment) -> Self {
        self.default_environment = environment;
        self
    }

    /// Environment for keys requested without one
    pub fn default_environment(&self) -> KeyEnvironment {
        self.default_environment
    }

    /// Create a new API key
    pub async fn create(&self, request: CreateApiKeyRequest) -> Result<IssuedApiKey, DomainError> {
        let now = self.clock.now();

        validate_api_key_name(&request.name).map_err(validation)?;

        let permissions = PermissionSet::parse(request.permissions).map_err(validation)?;
        if permissions.is_empty() {
            return Err(validation(ApiKeyValidationError::NoPermissions));
        }

        let rate_limit = request.rate_limit.unwrap_or(self.default_rate_limit);
        rate_limit.validate().map_err(validation)?;

        if request.expires_at.is_some_and(|at| at <= now) {
            return Err(validation(ApiKeyValidationError::ExpiryInPast));
        }

        info!(
            name = %request.name,
            environment = %request.environment,
            created_by = %request.created_by,
            "Creating API key"
        );

        let mut last_conflict = None;

        for _ in 0..MAX_GENERATION_ATTEMPTS {
            let generated = self.generator.generate(request.environment);

            let api_key = ApiKey::new(
                ApiKeyId::generate(),
                request.name.trim(),
                &generated.key_id,
                &generated.hash,
                request.environment,
                &request.created_by,
                now,
            )
            .with_permissions(permissions.clone())
            .with_rate_limit(rate_limit)
            .with_expiration(request.expires_at);

            match self.repository.create(api_key).await {
                Ok(created) => {
                    info!(id = %created.id(), key_id = %created.key_id(), "API key created");
                    return Ok(IssuedApiKey {
                        api_key: created,
                        secret: generated.key,
                    });
                }
                Err(err @ DomainError::Conflict { .. }) => {
                    warn!(key_id = %generated.key_id, "Generated key ID collided, retrying");
                    last_conflict = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_conflict.unwrap_or_else(|| DomainError::internal("Failed to generate API key")))
    }

    /// Get an API key by ID
    pub async fn get(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError> {
        self.repository.get(id).await
    }

    /// List API keys
    pub async fn list(&self, active_only: bool) -> Result<Vec<ApiKey>, DomainError> {
        self.repository.list(active_only).await
    }

    /// Look up the record matching a presented secret
    ///
    /// Malformed or unknown keys yield `Ok(None)`; the record is returned
    /// regardless of its active or expiry state.
    pub async fn validate(&self, secret: &str) -> Result<Option<ApiKey>, DomainError> {
        let Some(key_id) = extract_key_id(secret) else {
            debug!("Presented API key is malformed");
            return Ok(None);
        };

        debug!(key_id = %key_id, "Validating API key");

        let Some(api_key) = self.repository.get_by_key_id(&key_id).await? else {
            return Ok(None);
        };

        if !verify_key(secret, api_key.key_hash()) {
            debug!(key_id = %key_id, "API key hash verification failed");
            return Ok(None);
        }

        Ok(Some(api_key))
    }

    /// Authorize a presented key for a permission
    ///
    /// Checks run in order: existence, active flag, expiry, permission, rate
    /// limits. Only an allowed request is counted towards the rate limits and
    /// the usage counter.
    pub async fn authorize(
        &self,
        secret: &str,
        required_permission: &str,
    ) -> Result<AuthorizationDecision, DomainError> {
        let now = self.clock.now();

        let Some(mut api_key) = self.validate(secret).await? else {
            return Ok(AuthorizationDecision::Deny(DenyReason::NotFound));
        };

        if !api_key.is_active() {
            debug!(key_id = %api_key.key_id(), "API key is inactive");
            return Ok(AuthorizationDecision::Deny(DenyReason::Inactive));
        }

        if api_key.is_expired_at(now) {
            debug!(key_id = %api_key.key_id(), "API key has expired");
            return Ok(AuthorizationDecision::Deny(DenyReason::Expired));
        }

        if !api_key.has_permission(required_permission) {
            debug!(
                key_id = %api_key.key_id(),
                permission = %required_permission,
                "API key lacks permission"
            );
            return Ok(AuthorizationDecision::Deny(DenyReason::PermissionDenied {
                required: required_permission.to_string(),
            }));
        }

        let limit = self
            .rate_limiter
            .check_and_record(api_key.id(), api_key.rate_limit(), now)
            .await?;

        if let Some(window) = limit.window.filter(|_| !limit.allowed) {
            info!(key_id = %api_key.key_id(), window = %window, "API key rate limited");
            return Ok(AuthorizationDecision::Deny(DenyReason::RateLimited {
                window,
                limit: limit.limit,
                retry_after_secs: limit.reset_in_seconds,
            }));
        }

        if let Err(e) = self.repository.record_usage(api_key.id(), now).await {
            warn!(key_id = %api_key.key_id(), error = %e, "Failed to record API key usage");
        }
        api_key.record_usage(now);

        Ok(AuthorizationDecision::Allow(Box::new(api_key)))
    }

    /// Apply a partial update
    pub async fn update(
        &self,
        id: &ApiKeyId,
        request: UpdateApiKeyRequest,
        updated_by: &str,
    ) -> Result<ApiKey, DomainError> {
        let now = self.clock.now();

        if let Some(name) = &request.name {
            validate_api_key_name(name).map_err(validation)?;
        }

        let permissions = match request.permissions {
            Some(permissions) => {
                let permissions = PermissionSet::parse(permissions).map_err(validation)?;
                if permissions.is_empty() {
                    return Err(validation(ApiKeyValidationError::NoPermissions));
                }
                Some(permissions)
            }
            None => None,
        };

        if request
            .expires_at
            .is_some_and(|expires_at| expires_at.is_some_and(|at| at <= now))
        {
            return Err(validation(ApiKeyValidationError::ExpiryInPast));
        }

        if let Some(rate_limit) = &request.rate_limit {
            rate_limit.validate().map_err(validation)?;
        }

        info!(id = %id, updated_by = %updated_by, "Updating API key");

        let mut limits_changed = false;
        let updated = self
            .modify(id, |key| {
                if let Some(name) = &request.name {
                    key.set_name(name.trim());
                }
                if let Some(permissions) = &permissions {
                    key.set_permissions(permissions.clone());
                }
                if let Some(expires_at) = request.expires_at {
                    key.set_expiration(expires_at);
                }
                limits_changed = match request.rate_limit {
                    Some(rate_limit) if rate_limit != *key.rate_limit() => {
                        key.set_rate_limit(rate_limit);
                        true
                    }
                    _ => false,
                };
                if let Some(active) = request.is_active {
                    key.set_active(active);
                }
                key.touch(Some(updated_by.to_string()), now);
            })
            .await?;

        if limits_changed {
            self.reset_limits(id).await;
        }

        Ok(updated)
    }

    /// Issue a new secret for an existing key; the old secret stops working
    pub async fn rotate(
        &self,
        id: &ApiKeyId,
        rotated_by: &str,
        reason: Option<String>,
    ) -> Result<IssuedApiKey, DomainError> {
        let now = self.clock.now();

        info!(id = %id, rotated_by = %rotated_by, "Rotating API key");

        let mut last_conflict = None;

        // A conflict is either a key ID collision or a concurrent write; both retry from a fresh read
        for _ in 0..MAX_GENERATION_ATTEMPTS {
            let mut rotated = self.require(id).await?;
            let GeneratedApiKey { key, key_id, hash } =
                self.generator.generate(rotated.environment());

            rotated.rotate(&key_id, hash, rotated_by, reason.clone(), now);

            match self.repository.update(&rotated).await {
                Ok(updated) => {
                    info!(id = %id, key_id = %updated.key_id(), "API key rotated");
                    return Ok(IssuedApiKey {
                        api_key: updated,
                        secret: key,
                    });
                }
                Err(err @ DomainError::Conflict { .. }) => {
                    warn!(id = %id, key_id = %key_id, error = %err, "Rotation conflicted, retrying");
                    last_conflict = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_conflict.unwrap_or_else(|| DomainError::internal("Failed to rotate API key")))
    }

    /// Revoke an API key; revoking twice succeeds and refreshes the audit fields
    pub async fn revoke(
        &self,
        id: &ApiKeyId,
        revoked_by: &str,
        reason: Option<String>,
    ) -> Result<ApiKey, DomainError> {
        let now = self.clock.now();

        info!(id = %id, revoked_by = %revoked_by, reason = ?reason, "Revoking API key");

        let revoked = self
            .modify(id, |key| key.revoke(revoked_by, reason.clone(), now))
            .await?;

        self.reset_limits(id).await;

        Ok(revoked)
    }

    /// Permanently delete an API key, returning whether it existed
    pub async fn delete(
        &self,
        id: &ApiKeyId,
        deleted_by: &str,
        reason: Option<&str>,
    ) -> Result<bool, DomainError> {
        let deleted = self.repository.delete(id).await?;

        if deleted {
            info!(id = %id, deleted_by = %deleted_by, reason = ?reason, "API key deleted");
            self.reset_limits(id).await;
        } else {
            debug!(id = %id, "Delete requested for unknown API key");
        }

        Ok(deleted)
    }

    /// Read, change and write back a key, starting over from a fresh read
    /// whenever another writer committed in between
    async fn modify<F>(&self, id: &ApiKeyId, mut change: F) -> Result<ApiKey, DomainError>
    where
        F: FnMut(&mut ApiKey),
    {
        let mut last_conflict = None;

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let mut key = self.require(id).await?;
            change(&mut key);

            match self.repository.update(&key).await {
                Ok(updated) => return Ok(updated),
                Err(err @ DomainError::Conflict { .. }) => {
                    debug!(id = %id, "API key changed during write, retrying");
                    last_conflict = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_conflict.unwrap_or_else(|| DomainError::internal("Failed to update API key")))
    }

    /// The record change is already committed, so a limiter outage only costs stale windows
    async fn reset_limits(&self, id: &ApiKeyId) {
        if let Err(e) = self.rate_limiter.reset(id).await {
            warn!(id = %id, error = %e, "Failed to reset rate limit windows");
        }
    }

    async fn require(&self, id: &ApiKeyId) -> Result<ApiKey, DomainError> {
        self.repository
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("API key '{}' not found", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::api_key::{MockApiKeyRepository, RateLimitWindow};
    use crate::domain::clock::ManualClock;
    use crate::infrastructure::api_key::rate_limiter::MockRateLimiter;
    use crate::infrastructure::api_key::InMemoryApiKeyRepository;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::collections::HashSet;
    use tokio::sync::Mutex;

    /// Serves one pre-recorded copy on the first `get`, then delegates
    #[derive(Debug)]
    struct OutdatedFirstRead {
        inner: Arc<InMemoryApiKeyRepository>,
        outdated: Mutex<Option<ApiKey>>,
    }

    #[async_trait]
    impl ApiKeyRepository for OutdatedFirstRead {
        async fn get(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError> {
            if let Some(key) = self.outdated.lock().await.take() {
                return Ok(Some(key));
            }
            self.inner.get(id).await
        }

        async fn get_by_key_id(&self, key_id: &str) -> Result<Option<ApiKey>, DomainError> {
            self.inner.get_by_key_id(key_id).await
        }

        async fn create(&self, api_key: ApiKey) -> Result<ApiKey, DomainError> {
            self.inner.create(api_key).await
        }

        async fn update(&self, api_key: &ApiKey) -> Result<ApiKey, DomainError> {
            self.inner.update(api_key).await
        }

        async fn delete(&self, id: &ApiKeyId) -> Result<bool, DomainError> {
            self.inner.delete(id).await
        }

        async fn list(&self, active_only: bool) -> Result<Vec<ApiKey>, DomainError> {
            self.inner.list(active_only).await
        }

        async fn record_usage(&self, id: &ApiKeyId, at: DateTime<Utc>) -> Result<(), DomainError> {
            self.inner.record_usage(id, at).await
        }
    }

    fn failing_limiter(resets: usize) -> MockRateLimiter {
        let mut limiter = MockRateLimiter::new();
        limiter
            .expect_reset()
            .times(resets)
            .returning(|_| Err(DomainError::cache("redis down")));
        limiter
    }

    fn create_service() -> (ApiKeyService, ManualClock) {
        let clock = ManualClock::default();
        let service = ApiKeyService::new(Arc::new(InMemoryApiKeyRepository::new()))
            .with_clock(Arc::new(clock.clone()));
        (service, clock)
    }

    fn request(permissions: &[&str]) -> CreateApiKeyRequest {
        CreateApiKeyRequest {
            name: "Storefront".to_string(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            created_by: "admin-1".to_string(),
            environment: KeyEnvironment::Live,
            rate_limit: None,
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_api_key() {
        let (service, _) = create_service();

        let issued = service.create(request(&["products:read"])).await.unwrap();

        assert!(issued.secret.starts_with("bzk_live_"));
        assert!(issued.secret.starts_with(issued.api_key.key_id()));
        assert_eq!(issued.api_key.usage_count(), 0);
        assert_eq!(issued.api_key.rate_limit(), &RateLimitConfig::default());
        assert!(issued.api_key.is_active());
    }

    #[tokio::test]
    async fn test_create_never_repeats_secret() {
        let (service, _) = create_service();
        let mut secrets = HashSet::new();

        for _ in 0..25 {
            let issued = service.create(request(&["products:read"])).await.unwrap();
            assert!(secrets.insert(issued.secret));
        }
    }

    #[tokio::test]
    async fn test_create_deduplicates_permissions() {
        let (service, _) = create_service();

        let issued = service
            .create(request(&["products:read", "products:read", "quotations:write"]))
            .await
            .unwrap();

        assert_eq!(
            issued.api_key.permissions().to_strings(),
            vec!["products:read", "quotations:write"]
        );
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let (service, clock) = create_service();

        let bad_scope = service.create(request(&["products"])).await;
        assert!(matches!(bad_scope, Err(DomainError::Validation { .. })));

        let no_scope = service.create(request(&[])).await;
        assert!(matches!(no_scope, Err(DomainError::Validation { .. })));

        let mut zero_limit = request(&["products:read"]);
        zero_limit.rate_limit = Some(RateLimitConfig::new(0, 1, 1, 1));
        assert!(matches!(
            service.create(zero_limit).await,
            Err(DomainError::Validation { .. })
        ));

        let mut expired = request(&["products:read"]);
        expired.expires_at = Some(clock.now() - Duration::minutes(1));
        assert!(matches!(
            service.create(expired).await,
            Err(DomainError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_custom_default_rate_limit() {
        let (service, _) = create_service();
        let service = service.with_default_rate_limit(RateLimitConfig::new(5, 50, 500, 2));

        let issued = service.create(request(&["products:read"])).await.unwrap();
        assert_eq!(issued.api_key.rate_limit().requests_per_minute, 5);
    }

    #[tokio::test]
    async fn test_validate_api_key() {
        let (service, _) = create_service();
        let issued = service.create(request(&["products:read"])).await.unwrap();

        let validated = service.validate(&issued.secret).await.unwrap().unwrap();
        assert_eq!(validated.id(), issued.api_key.id());
    }

    #[tokio::test]
    async fn test_validate_unknown_and_malformed_keys() {
        let (service, _) = create_service();
        let issued = service.create(request(&["products:read"])).await.unwrap();

        assert!(service.validate("garbage").await.unwrap().is_none());
        assert!(service.validate("").await.unwrap().is_none());

        // Same public prefix, different secret
        let forged = format!("{}XXXXXXXXXXXX", issued.api_key.key_id());
        assert!(service.validate(&forged).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_authorize_allows_and_records_usage() {
        let (service, clock) = create_service();
        let issued = service.create(request(&["products:read"])).await.unwrap();

        let decision = service.authorize(&issued.secret, "products:read").await.unwrap();
        let key = decision.into_api_key().unwrap();

        assert_eq!(key.usage_count(), 1);
        assert_eq!(key.last_used_at(), Some(clock.now()));

        let stored = service.get(issued.api_key.id()).await.unwrap().unwrap();
        assert_eq!(stored.usage_count(), 1);
    }

    #[tokio::test]
    async fn test_authorize_unknown_key() {
        let (service, _) = create_service();

        let decision = service
            .authorize("bzk_live_abcdefghijklmnopqrstuvwxyz", "products:read")
            .await
            .unwrap();

        assert_eq!(decision.deny_reason(), Some(&DenyReason::NotFound));
    }

    #[tokio::test]
    async fn test_authorize_permission_denied() {
        let (service, _) = create_service();
        let issued = service.create(request(&["products:read"])).await.unwrap();

        let decision = service.authorize(&issued.secret, "products:write").await.unwrap();

        assert_eq!(
            decision.deny_reason(),
            Some(&DenyReason::PermissionDenied {
                required: "products:write".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_permission_denial_takes_precedence_over_rate_limit() {
        let (service, _) = create_service();
        let mut req = request(&["products:read"]);
        req.rate_limit = Some(RateLimitConfig::new(1, 10, 10, 1));
        let issued = service.create(req).await.unwrap();

        assert!(service.authorize(&issued.secret, "products:read").await.unwrap().is_allowed());

        let decision = service.authorize(&issued.secret, "products:write").await.unwrap();
        assert!(matches!(
            decision.deny_reason(),
            Some(DenyReason::PermissionDenied { .. })
        ));
    }

    #[tokio::test]
    async fn test_rate_limit_window_elapses() {
        let (service, clock) = create_service();
        let mut req = request(&["products:read"]);
        req.rate_limit = Some(RateLimitConfig::new(1, 100, 1000, 10));
        let issued = service.create(req).await.unwrap();

        assert!(service.authorize(&issued.secret, "products:read").await.unwrap().is_allowed());

        clock.advance(Duration::seconds(30));
        let denied = service.authorize(&issued.secret, "products:read").await.unwrap();
        assert_eq!(
            denied.deny_reason(),
            Some(&DenyReason::RateLimited {
                window: RateLimitWindow::Minute,
                limit: 1,
                retry_after_secs: 30,
            })
        );

        clock.advance(Duration::seconds(30));
        assert!(service.authorize(&issued.secret, "products:read").await.unwrap().is_allowed());

        let stored = service.get(issued.api_key.id()).await.unwrap().unwrap();
        assert_eq!(stored.usage_count(), 2);
    }

    #[tokio::test]
    async fn test_authorize_expired_key() {
        let (service, clock) = create_service();
        let mut req = request(&["products:read"]);
        req.expires_at = Some(clock.now() + Duration::hours(1));
        let issued = service.create(req).await.unwrap();

        clock.advance(Duration::hours(2));

        let decision = service.authorize(&issued.secret, "products:read").await.unwrap();
        assert_eq!(decision.deny_reason(), Some(&DenyReason::Expired));
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent_and_blocks_authorization() {
        let (service, _) = create_service();
        let issued = service.create(request(&["products:read"])).await.unwrap();
        let id = *issued.api_key.id();

        let first = service.revoke(&id, "admin-1", Some("leaked".into())).await.unwrap();
        assert!(!first.is_active());

        let second = service.revoke(&id, "admin-2", None).await.unwrap();
        assert!(!second.is_active());
        assert_eq!(second.revoked_by(), Some("admin-2"));

        let decision = service.authorize(&issued.secret, "products:read").await.unwrap();
        assert_eq!(decision.deny_reason(), Some(&DenyReason::Inactive));
    }

    #[tokio::test]
    async fn test_reactivate_through_update() {
        let (service, _) = create_service();
        let issued = service.create(request(&["products:read"])).await.unwrap();
        let id = *issued.api_key.id();

        service.revoke(&id, "admin-1", None).await.unwrap();
        service
            .update(
                &id,
                UpdateApiKeyRequest {
                    is_active: Some(true),
                    ..Default::default()
                },
                "admin-1",
            )
            .await
            .unwrap();

        assert!(service.authorize(&issued.secret, "products:read").await.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let (service, clock) = create_service();
        let issued = service.create(request(&["products:read"])).await.unwrap();
        let id = *issued.api_key.id();

        clock.advance(Duration::minutes(1));

        let updated = service
            .update(
                &id,
                UpdateApiKeyRequest {
                    name: Some("Mobile app".into()),
                    permissions: Some(vec![
                        "orders:read".into(),
                        "orders:read".into(),
                        "products:read".into(),
                    ]),
                    ..Default::default()
                },
                "admin-2",
            )
            .await
            .unwrap();

        assert_eq!(updated.name(), "Mobile app");
        assert_eq!(updated.permissions().len(), 2);
        assert_eq!(updated.updated_at(), clock.now());
        assert_eq!(updated.updated_by(), Some("admin-2"));
        assert_eq!(updated.rate_limit(), issued.api_key.rate_limit());
    }

    #[tokio::test]
    async fn test_update_unknown_key() {
        let (service, _) = create_service();

        let result = service
            .update(&ApiKeyId::generate(), UpdateApiKeyRequest::default(), "admin-1")
            .await;

        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_update_rate_limit_resets_windows() {
        let (service, _) = create_service();
        let mut req = request(&["products:read"]);
        req.rate_limit = Some(RateLimitConfig::new(1, 100, 1000, 10));
        let issued = service.create(req).await.unwrap();
        let id = *issued.api_key.id();

        assert!(service.authorize(&issued.secret, "products:read").await.unwrap().is_allowed());
        assert!(!service.authorize(&issued.secret, "products:read").await.unwrap().is_allowed());

        service
            .update(
                &id,
                UpdateApiKeyRequest {
                    rate_limit: Some(RateLimitConfig::new(2, 100, 1000, 10)),
                    ..Default::default()
                },
                "admin-1",
            )
            .await
            .unwrap();

        assert!(service.authorize(&issued.secret, "products:read").await.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn test_rotate_replaces_secret() {
        let (service, _) = create_service();
        let issued = service.create(request(&["products:read"])).await.unwrap();
        let id = *issued.api_key.id();

        let rotated = service
            .rotate(&id, "admin-1", Some("scheduled".into()))
            .await
            .unwrap();

        assert_ne!(rotated.secret, issued.secret);
        assert_eq!(rotated.api_key.id(), &id);
        assert_eq!(rotated.api_key.rotated_by(), Some("admin-1"));
        assert_eq!(rotated.api_key.rotation_reason(), Some("scheduled"));

        assert!(service.validate(&issued.secret).await.unwrap().is_none());
        assert!(service.validate(&rotated.secret).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete() {
        let (service, _) = create_service();
        let issued = service.create(request(&["products:read"])).await.unwrap();
        let id = *issued.api_key.id();

        assert!(service.delete(&id, "admin-1", Some("cleanup")).await.unwrap());
        assert!(service.get(&id).await.unwrap().is_none());
        assert!(service.validate(&issued.secret).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_nonexistent_returns_false() {
        let (service, _) = create_service();

        let deleted = service
            .delete(&ApiKeyId::generate(), "admin-1", None)
            .await
            .unwrap();

        assert!(!deleted);
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces_as_error() {
        let mut repo = MockApiKeyRepository::new();
        repo.expect_get_by_key_id()
            .returning(|_| Err(DomainError::storage("connection reset")));
        let service = ApiKeyService::new(Arc::new(repo));

        let secret = ApiKeyGenerator::new().generate(KeyEnvironment::Live).key;
        let result = service.authorize(&secret, "products:read").await;

        assert!(matches!(result, Err(DomainError::Storage { .. })));
    }

    #[tokio::test]
    async fn test_usage_recording_failure_still_allows() {
        let generated = ApiKeyGenerator::new().generate(KeyEnvironment::Live);
        let stored = ApiKey::new(
            ApiKeyId::generate(),
            "Storefront",
            generated.key_id.clone(),
            generated.hash.clone(),
            KeyEnvironment::Live,
            "admin-1",
            Utc::now(),
        )
        .with_permissions(PermissionSet::parse(["products:read"]).unwrap());

        let mut repo = MockApiKeyRepository::new();
        repo.expect_get_by_key_id()
            .times(1)
            .returning(move |_| Ok(Some(stored.clone())));
        repo.expect_record_usage()
            .times(1)
            .returning(|_, _| Err(DomainError::storage("write timeout")));
        let service = ApiKeyService::new(Arc::new(repo));

        let decision = service
            .authorize(&generated.key, "products:read")
            .await
            .unwrap();

        match decision {
            AuthorizationDecision::Allow(key) => assert_eq!(key.usage_count(), 1),
            AuthorizationDecision::Deny(reason) => panic!("unexpected deny: {}", reason),
        }
    }

    #[tokio::test]
    async fn test_rename_over_outdated_read_keeps_revocation() {
        let repo = Arc::new(InMemoryApiKeyRepository::new());
        let admin = ApiKeyService::new(repo.clone());
        let issued = admin.create(request(&["products:read"])).await.unwrap();
        let id = *issued.api_key.id();

        let before_revoke = repo.get(&id).await.unwrap().unwrap();
        admin.revoke(&id, "admin-2", Some("leaked".into())).await.unwrap();

        let other_admin = ApiKeyService::new(Arc::new(OutdatedFirstRead {
            inner: repo.clone(),
            outdated: Mutex::new(Some(before_revoke)),
        }));
        let renamed = other_admin
            .update(
                &id,
                UpdateApiKeyRequest {
                    name: Some("Renamed".into()),
                    ..Default::default()
                },
                "admin-3",
            )
            .await
            .unwrap();

        assert_eq!(renamed.name(), "Renamed");
        assert!(!renamed.is_active());
        assert_eq!(renamed.revoked_by(), Some("admin-2"));
        assert_eq!(renamed.revocation_reason(), Some("leaked"));

        let decision = admin.authorize(&issued.secret, "products:read").await.unwrap();
        assert_eq!(decision.deny_reason(), Some(&DenyReason::Inactive));
    }

    #[tokio::test]
    async fn test_overlapping_updates_and_revoke_all_land() {
        let (service, _) = create_service();
        let service = Arc::new(service);
        let issued = service.create(request(&["products:read"])).await.unwrap();
        let id = *issued.api_key.id();

        let mut handles = Vec::new();
        for scope in ["orders:read", "quotations:write"] {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                service
                    .update(
                        &id,
                        UpdateApiKeyRequest {
                            permissions: Some(vec![scope.to_string()]),
                            ..Default::default()
                        },
                        "admin-1",
                    )
                    .await
                    .map(|_| ())
            }));
        }
        let revoker = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            revoker.revoke(&id, "admin-2", None).await.map(|_| ())
        }));

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = service.get(&id).await.unwrap().unwrap();
        assert!(!stored.is_active());
        assert_eq!(stored.revoked_by(), Some("admin-2"));
        assert_eq!(stored.version(), 3);
    }

    #[tokio::test]
    async fn test_limiter_outage_does_not_fail_committed_changes() {
        let repo = Arc::new(InMemoryApiKeyRepository::new());
        let service = ApiKeyService::new(repo.clone())
            .with_rate_limiter(Arc::new(failing_limiter(3)));

        let issued = service.create(request(&["products:read"])).await.unwrap();
        let id = *issued.api_key.id();
        let updated = service
            .update(
                &id,
                UpdateApiKeyRequest {
                    rate_limit: Some(RateLimitConfig::new(5, 50, 500, 2)),
                    ..Default::default()
                },
                "admin-1",
            )
            .await
            .unwrap();
        assert_eq!(updated.rate_limit(), &RateLimitConfig::new(5, 50, 500, 2));

        let revoked = service.revoke(&id, "admin-1", None).await.unwrap();
        assert!(!revoked.is_active());
        assert!(!repo.get(&id).await.unwrap().unwrap().is_active());

        assert!(service.delete(&id, "admin-1", None).await.unwrap());
        assert!(repo.get(&id).await.unwrap().is_none());
    }
}
