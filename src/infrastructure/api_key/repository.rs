//! In-memory API key repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::api_key::{ApiKey, ApiKeyId, ApiKeyRepository};
use crate::domain::DomainError;

#[derive(Debug, Default)]
struct Inner {
    keys: HashMap<ApiKeyId, ApiKey>,
    key_id_index: HashMap<String, ApiKeyId>,
}

/// In-memory implementation of ApiKeyRepository
///
/// Records and the key-prefix index live behind one lock so a create or a
/// rotation can never leave them out of step.
#[derive(Debug, Default)]
pub struct InMemoryApiKeyRepository {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryApiKeyRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApiKeyRepository for InMemoryApiKeyRepository {
    async fn get(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError> {
        let inner = self.inner.read().await;
        Ok(inner.keys.get(id).cloned())
    }

    async fn get_by_key_id(&self, key_id: &str) -> Result<Option<ApiKey>, DomainError> {
        let inner = self.inner.read().await;

        Ok(inner
            .key_id_index
            .get(key_id)
            .and_then(|id| inner.keys.get(id))
            .cloned())
    }

    async fn create(&self, api_key: ApiKey) -> Result<ApiKey, DomainError> {
        let mut inner = self.inner.write().await;

        if inner.keys.contains_key(api_key.id()) {
            return Err(DomainError::conflict(format!(
                "API key with ID '{}' already exists",
                api_key.id()
            )));
        }

        if inner.key_id_index.contains_key(api_key.key_id()) {
            return Err(DomainError::conflict(format!(
                "API key with key ID '{}' already exists",
                api_key.key_id()
            )));
        }

        inner
            .key_id_index
            .insert(api_key.key_id().to_string(), *api_key.id());
        inner.keys.insert(*api_key.id(), api_key.clone());

        Ok(api_key)
    }

    async fn update(&self, api_key: &ApiKey) -> Result<ApiKey, DomainError> {
        let mut inner = self.inner.write().await;

        let stored = inner
            .keys
            .get(api_key.id())
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("API key '{}' not found", api_key.id())))?;

        if stored.version() != api_key.version() {
            return Err(DomainError::conflict(format!(
                "API key '{}' was modified concurrently",
                api_key.id()
            )));
        }

        if stored.key_id() != api_key.key_id() {
            if inner.key_id_index.contains_key(api_key.key_id()) {
                return Err(DomainError::conflict(format!(
                    "API key with key ID '{}' already exists",
                    api_key.key_id()
                )));
            }

            inner.key_id_index.remove(stored.key_id());
            inner
                .key_id_index
                .insert(api_key.key_id().to_string(), *api_key.id());
        }

        let mut updated = api_key.clone();
        updated.absorb_usage(&stored);
        updated.bump_version();
        inner.keys.insert(*updated.id(), updated.clone());

        Ok(updated)
    }

    async fn delete(&self, id: &ApiKeyId) -> Result<bool, DomainError> {
        let mut inner = self.inner.write().await;

        if let Some(key) = inner.keys.remove(id) {
            inner.key_id_index.remove(key.key_id());
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn list(&self, active_only: bool) -> Result<Vec<ApiKey>, DomainError> {
        let inner = self.inner.read().await;

        let mut result: Vec<ApiKey> = inner
            .keys
            .values()
            .filter(|k| !active_only || k.is_active())
            .cloned()
            .collect();
        result.sort_by_key(|k| k.created_at());

        Ok(result)
    }

    async fn record_usage(&self, id: &ApiKeyId, at: DateTime<Utc>) -> Result<(), DomainError> {
        let mut inner = self.inner.write().await;

        match inner.keys.get_mut(id) {
            Some(key) => {
                key.record_usage(at);
                Ok(())
            }
            None => Err(DomainError::not_found(format!("API key '{}' not found", id))),
        }
    }
}
