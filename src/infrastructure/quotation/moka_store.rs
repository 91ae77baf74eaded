//! Draft store backed by a moka TTL cache

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache as MokaCache;

use crate::domain::admin::AdminId;
use crate::domain::quotation::{DraftId, DraftQuotation, DraftStore};
use crate::domain::DomainError;

/// Configuration for the draft store
#[derive(Debug, Clone)]
pub struct DraftStoreConfig {
    /// Maximum number of drafts kept across all owners
    pub max_capacity: u64,
    /// Time a draft survives after its last save
    pub ttl: Duration,
}

impl Default for DraftStoreConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            ttl: Duration::from_secs(24 * 3600),
        }
    }
}

impl DraftStoreConfig {
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

type DraftKey = (AdminId, DraftId);

/// Owner-scoped draft store; entries expire `ttl` after their last write
#[derive(Debug, Clone)]
pub struct MokaDraftStore {
    cache: MokaCache<DraftKey, DraftQuotation>,
}

impl MokaDraftStore {
    pub fn new() -> Self {
        Self::with_config(DraftStoreConfig::default())
    }

    pub fn with_config(config: DraftStoreConfig) -> Self {
        let cache = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.ttl)
            .build();

        Self { cache }
    }

    fn owned_by(&self, owner: &AdminId) -> Vec<(DraftKey, DraftQuotation)> {
        self.cache
            .iter()
            .filter(|(key, _)| key.0 == *owner)
            .map(|(key, draft)| (*key, draft))
            .collect()
    }
}

impl Default for MokaDraftStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DraftStore for MokaDraftStore {
    async fn save(&self, draft: DraftQuotation) -> Result<DraftQuotation, DomainError> {
        let key = (*draft.owner(), *draft.id());
        self.cache.insert(key, draft.clone()).await;
        Ok(draft)
    }

    async fn get(
        &self,
        owner: &AdminId,
        id: &DraftId,
    ) -> Result<Option<DraftQuotation>, DomainError> {
        Ok(self.cache.get(&(*owner, *id)).await)
    }

    async fn list(&self, owner: &AdminId) -> Result<Vec<DraftQuotation>, DomainError> {
        let mut drafts: Vec<DraftQuotation> = self
            .owned_by(owner)
            .into_iter()
            .map(|(_, draft)| draft)
            .collect();
        drafts.sort_by_key(|d| d.created_at());

        Ok(drafts)
    }

    async fn delete(&self, owner: &AdminId, id: &DraftId) -> Result<bool, DomainError> {
        Ok(self.cache.remove(&(*owner, *id)).await.is_some())
    }

    async fn clear(&self, owner: &AdminId) -> Result<usize, DomainError> {
        let keys: Vec<DraftKey> = self.owned_by(owner).into_iter().map(|(k, _)| k).collect();

        for key in &keys {
            self.cache.invalidate(key).await;
        }

        Ok(keys.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::quotation::{DraftContent, DraftItem};
    use chrono::Utc;

    fn create_draft(owner: AdminId, customer: &str) -> DraftQuotation {
        let content = DraftContent {
            customer_name: customer.to_string(),
            customer_email: None,
            items: vec![DraftItem {
                product_id: "h2so4-98".to_string(),
                product_name: "Sulfuric acid 98%".to_string(),
                quantity: 1,
                unit: "ibc".to_string(),
                unit_price_cents: 45_000,
            }],
            notes: None,
        };

        DraftQuotation::new(DraftId::generate(), owner, content, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let store = MokaDraftStore::new();
        let owner = AdminId::generate();
        let draft = create_draft(owner, "Acme");

        store.save(draft.clone()).await.unwrap();

        let retrieved = store.get(&owner, draft.id()).await.unwrap().unwrap();
        assert_eq!(retrieved.content().customer_name, "Acme");
    }

    #[tokio::test]
    async fn test_owners_are_isolated() {
        let store = MokaDraftStore::new();
        let alice = AdminId::generate();
        let bob = AdminId::generate();
        let draft = create_draft(alice, "Acme");

        store.save(draft.clone()).await.unwrap();
        store.save(create_draft(bob, "Globex")).await.unwrap();

        assert!(store.get(&bob, draft.id()).await.unwrap().is_none());
        assert!(!store.delete(&bob, draft.id()).await.unwrap());

        let bobs = store.list(&bob).await.unwrap();
        assert_eq!(bobs.len(), 1);
        assert_eq!(bobs[0].content().customer_name, "Globex");
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let store = MokaDraftStore::new();
        let owner = AdminId::generate();
        let other = AdminId::generate();
        let first = create_draft(owner, "Acme");

        store.save(first.clone()).await.unwrap();
        store.save(create_draft(owner, "Initech")).await.unwrap();
        store.save(create_draft(other, "Globex")).await.unwrap();

        assert!(store.delete(&owner, first.id()).await.unwrap());
        assert!(!store.delete(&owner, first.id()).await.unwrap());

        assert_eq!(store.clear(&owner).await.unwrap(), 1);
        assert!(store.list(&owner).await.unwrap().is_empty());
        assert_eq!(store.list(&other).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_drafts_expire() {
        let store =
            MokaDraftStore::with_config(DraftStoreConfig::default().with_ttl(Duration::from_millis(100)));
        let owner = AdminId::generate();
        let draft = create_draft(owner, "Acme");

        store.save(draft.clone()).await.unwrap();
        assert!(store.get(&owner, draft.id()).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(300)).await;

        assert!(store.get(&owner, draft.id()).await.unwrap().is_none());
    }
}
