//! Admin repository trait

use async_trait::async_trait;
use std::fmt::Debug;

#[cfg(test)]
use mockall::automock;

use super::entity::{AdminId, AdminUser};
use crate::domain::DomainError;

/// Repository trait for admin account storage
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AdminRepository: Send + Sync + Debug {
    async fn get(&self, id: &AdminId) -> Result<Option<AdminUser>, DomainError>;

    /// Look up by email (case-insensitive)
    async fn get_by_email(&self, email: &str) -> Result<Option<AdminUser>, DomainError>;

    /// Create a new admin; fails with Conflict when the email is taken
    async fn create(&self, admin: AdminUser) -> Result<AdminUser, DomainError>;

    async fn update(&self, admin: &AdminUser) -> Result<AdminUser, DomainError>;

    async fn count(&self) -> Result<usize, DomainError>;
}
