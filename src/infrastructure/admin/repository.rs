//! In-memory admin repository implementation

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::admin::{normalize_email, AdminId, AdminRepository, AdminUser};
use crate::domain::DomainError;

/// In-memory implementation of AdminRepository
#[derive(Debug, Default)]
pub struct InMemoryAdminRepository {
    admins: Arc<RwLock<HashMap<AdminId, AdminUser>>>,
}

impl InMemoryAdminRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AdminRepository for InMemoryAdminRepository {
    async fn get(&self, id: &AdminId) -> Result<Option<AdminUser>, DomainError> {
        Ok(self.admins.read().await.get(id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<AdminUser>, DomainError> {
        let email = normalize_email(email);
        let admins = self.admins.read().await;

        Ok(admins.values().find(|a| a.email() == email).cloned())
    }

    async fn create(&self, admin: AdminUser) -> Result<AdminUser, DomainError> {
        let mut admins = self.admins.write().await;

        if admins.contains_key(admin.id()) {
            return Err(DomainError::conflict(format!(
                "Admin with ID '{}' already exists",
                admin.id()
            )));
        }

        if admins.values().any(|a| a.email() == admin.email()) {
            return Err(DomainError::conflict(format!(
                "Admin with email '{}' already exists",
                admin.email()
            )));
        }

        admins.insert(*admin.id(), admin.clone());
        Ok(admin)
    }

    async fn update(&self, admin: &AdminUser) -> Result<AdminUser, DomainError> {
        let mut admins = self.admins.write().await;

        if !admins.contains_key(admin.id()) {
            return Err(DomainError::not_found(format!(
                "Admin '{}' not found",
                admin.id()
            )));
        }

        admins.insert(*admin.id(), admin.clone());
        Ok(admin.clone())
    }

    async fn count(&self) -> Result<usize, DomainError> {
        Ok(self.admins.read().await.len())
    }
}
