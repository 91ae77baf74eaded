//! PostgreSQL admin repository implementation

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::admin::{normalize_email, AdminId, AdminRepository, AdminUser};
use crate::domain::DomainError;

/// PostgreSQL implementation of AdminRepository
#[derive(Debug, Clone)]
pub struct PostgresAdminRepository {
    pool: PgPool,
}

impl PostgresAdminRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdminRepository for PostgresAdminRepository {
    async fn get(&self, id: &AdminId) -> Result<Option<AdminUser>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, email, name, password_hash, is_active,
                   created_at, updated_at, last_login_at
            FROM admins
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get admin: {}", e)))?;

        Ok(row.as_ref().map(row_to_admin))
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<AdminUser>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, email, name, password_hash, is_active,
                   created_at, updated_at, last_login_at
            FROM admins
            WHERE email = $1
            "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get admin by email: {}", e)))?;

        Ok(row.as_ref().map(row_to_admin))
    }

    async fn create(&self, admin: AdminUser) -> Result<AdminUser, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO admins (id, email, name, password_hash, is_active,
                                created_at, updated_at, last_login_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(admin.id().as_uuid())
        .bind(admin.email())
        .bind(admin.name())
        .bind(admin.password_hash())
        .bind(admin.is_active())
        .bind(admin.created_at())
        .bind(admin.updated_at())
        .bind(admin.last_login_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
                DomainError::conflict(format!(
                    "Admin with email '{}' already exists",
                    admin.email()
                ))
            } else {
                DomainError::storage(format!("Failed to create admin: {}", e))
            }
        })?;

        Ok(admin)
    }

    async fn update(&self, admin: &AdminUser) -> Result<AdminUser, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE admins
            SET name = $2, password_hash = $3, is_active = $4,
                updated_at = $5, last_login_at = $6
            WHERE id = $1
            "#,
        )
        .bind(admin.id().as_uuid())
        .bind(admin.name())
        .bind(admin.password_hash())
        .bind(admin.is_active())
        .bind(admin.updated_at())
        .bind(admin.last_login_at())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to update admin: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!(
                "Admin '{}' not found",
                admin.id()
            )));
        }

        Ok(admin.clone())
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admins")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to count admins: {}", e)))?;

        Ok(usize::try_from(count).unwrap_or(0))
    }
}

fn row_to_admin(row: &PgRow) -> AdminUser {
    let id: Uuid = row.get("id");

    AdminUser::restore(
        AdminId::from(id),
        row.get("email"),
        row.get("name"),
        row.get("password_hash"),
        row.get("is_active"),
        row.get("created_at"),
        row.get("updated_at"),
        row.get("last_login_at"),
    )
}
