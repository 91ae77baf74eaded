//! Admin service for authentication and account management

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::admin::{
    validate_admin_name, validate_email, validate_password, AdminId, AdminRepository, AdminUser,
};
use crate::domain::DomainError;
use crate::infrastructure::auth::JwtGenerator;

use super::password::PasswordHasher;

/// Request for creating a new admin
#[derive(Debug, Clone)]
pub struct CreateAdminRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

/// Successful login: session token plus the admin it belongs to
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub token: String,
    pub expires_in_hours: u64,
    pub admin: AdminUser,
}

/// Admin service for authentication and management
#[derive(Debug)]
pub struct AdminService {
    repository: Arc<dyn AdminRepository>,
    hasher: Arc<dyn PasswordHasher>,
    jwt: Arc<dyn JwtGenerator>,
}

impl AdminService {
    pub fn new(
        repository: Arc<dyn AdminRepository>,
        hasher: Arc<dyn PasswordHasher>,
        jwt: Arc<dyn JwtGenerator>,
    ) -> Self {
        Self {
            repository,
            hasher,
            jwt,
        }
    }

    /// Create a new admin account; the password is always stored hashed
    pub async fn create_admin(&self, request: CreateAdminRequest) -> Result<AdminUser, DomainError> {
        validate_email(&request.email).map_err(|e| DomainError::validation(e.to_string()))?;
        validate_admin_name(&request.name).map_err(|e| DomainError::validation(e.to_string()))?;
        validate_password(&request.password).map_err(|e| DomainError::validation(e.to_string()))?;

        if self.repository.get_by_email(&request.email).await?.is_some() {
            return Err(DomainError::conflict(format!(
                "Admin with email '{}' already exists",
                request.email.trim()
            )));
        }

        let password_hash = self.hasher.hash(&request.password)?;
        let admin = AdminUser::new(
            AdminId::generate(),
            &request.email,
            request.name.trim(),
            password_hash,
        );

        let created = self.repository.create(admin).await?;
        info!(admin_id = %created.id(), email = %created.email(), "Admin created");

        Ok(created)
    }

    /// Authenticate with email and password
    ///
    /// Unknown accounts, inactive accounts and wrong passwords all produce
    /// the same `InvalidCredentials` error.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResult, DomainError> {
        let Some(mut admin) = self.repository.get_by_email(email).await? else {
            debug!("Login attempt for unknown admin");
            return Err(DomainError::InvalidCredentials);
        };

        if !admin.is_active() || !self.hasher.verify(password, admin.password_hash()) {
            warn!(admin_id = %admin.id(), "Rejected admin login");
            return Err(DomainError::InvalidCredentials);
        }

        admin.record_login();
        let admin = self.repository.update(&admin).await?;
        let token = self.jwt.generate(&admin)?;

        info!(admin_id = %admin.id(), "Admin logged in");

        Ok(LoginResult {
            token,
            expires_in_hours: self.jwt.expiration_hours(),
            admin,
        })
    }

    /// Resolve a session token to an active admin
    pub async fn authenticate_token(&self, token: &str) -> Result<Option<AdminUser>, DomainError> {
        let Ok(claims) = self.jwt.validate(token) else {
            return Ok(None);
        };

        let Ok(id) = AdminId::parse(claims.admin_id()) else {
            return Ok(None);
        };

        Ok(self.repository.get(&id).await?.filter(|a| a.is_active()))
    }

    pub async fn get(&self, id: &AdminId) -> Result<Option<AdminUser>, DomainError> {
        self.repository.get(id).await
    }

    /// Change an admin's password after verifying the current one
    pub async fn change_password(
        &self,
        id: &AdminId,
        current_password: &str,
        new_password: &str,
    ) -> Result<AdminUser, DomainError> {
        let mut admin = self
            .repository
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Admin '{}' not found", id)))?;

        if !self.hasher.verify(current_password, admin.password_hash()) {
            return Err(DomainError::InvalidCredentials);
        }

        validate_password(new_password).map_err(|e| DomainError::validation(e.to_string()))?;

        admin.set_password_hash(self.hasher.hash(new_password)?);
        let updated = self.repository.update(&admin).await?;

        info!(admin_id = %id, "Admin password changed");

        Ok(updated)
    }

    /// Create the first admin when none exist; returns whether one was created
    pub async fn bootstrap(&self, email: &str, password: &str) -> Result<bool, DomainError> {
        if self.repository.count().await? > 0 {
            debug!("Admins already exist, skipping bootstrap");
            return Ok(false);
        }

        self.create_admin(CreateAdminRequest {
            email: email.to_string(),
            name: "Administrator".to_string(),
            password: password.to_string(),
        })
        .await?;

        info!(email = %email, "Bootstrap admin created");
        Ok(true)
    }
}
