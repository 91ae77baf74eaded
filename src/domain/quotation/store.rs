//! Draft store trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::draft::{DraftId, DraftQuotation};
use crate::domain::admin::AdminId;
use crate::domain::DomainError;

/// Owner-scoped storage for draft quotations
///
/// Every operation takes the owner; a draft saved by one admin is never
/// visible to another.
#[async_trait]
pub trait DraftStore: Send + Sync + Debug {
    /// Insert or replace a draft under its owner
    async fn save(&self, draft: DraftQuotation) -> Result<DraftQuotation, DomainError>;

    async fn get(&self, owner: &AdminId, id: &DraftId)
        -> Result<Option<DraftQuotation>, DomainError>;

    /// Drafts of one owner, oldest first
    async fn list(&self, owner: &AdminId) -> Result<Vec<DraftQuotation>, DomainError>;

    async fn delete(&self, owner: &AdminId, id: &DraftId) -> Result<bool, DomainError>;

    /// Remove every draft of an owner, returning how many were removed
    async fn clear(&self, owner: &AdminId) -> Result<usize, DomainError>;
}
