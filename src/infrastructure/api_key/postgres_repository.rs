//! PostgreSQL API key repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::api_key::{
    ApiKey, ApiKeyId, ApiKeyRepository, KeyEnvironment, PermissionSet, RateLimitConfig,
};
use crate::domain::DomainError;

const API_KEY_COLUMNS: &str = r#"
    id, name, key_id, key_hash, environment, permissions, is_active,
    requests_per_minute, requests_per_hour, requests_per_day, burst_limit,
    usage_count, expires_at, last_used_at,
    revoked_at, revoked_by, revocation_reason,
    rotated_at, rotated_by, rotation_reason,
    created_by, created_at, updated_at, updated_by, version
"#;

/// PostgreSQL implementation of ApiKeyRepository
#[derive(Debug, Clone)]
pub struct PostgresApiKeyRepository {
    pool: PgPool,
}

impl PostgresApiKeyRepository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn select_where(clause: &str) -> String {
    format!("SELECT {} FROM api_keys WHERE {}", API_KEY_COLUMNS, clause)
}

#[async_trait]
impl ApiKeyRepository for PostgresApiKeyRepository {
    async fn get(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError> {
        let row = sqlx::query(&select_where("id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get API key: {}", e)))?;

        row.as_ref().map(row_to_api_key).transpose()
    }

    async fn get_by_key_id(&self, key_id: &str) -> Result<Option<ApiKey>, DomainError> {
        let row = sqlx::query(&select_where("key_id = $1"))
            .bind(key_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get API key by key ID: {}", e)))?;

        row.as_ref().map(row_to_api_key).transpose()
    }

    async fn create(&self, api_key: ApiKey) -> Result<ApiKey, DomainError> {
        let (revoked_at, revoked_by, revocation_reason) = revocation_of(&api_key);
        let (rotated_at, rotated_by, rotation_reason) = rotation_of(&api_key);
        let limits = api_key.rate_limit();

        sqlx::query(
            r#"
            INSERT INTO api_keys (
                id, name, key_id, key_hash, environment, permissions, is_active,
                requests_per_minute, requests_per_hour, requests_per_day, burst_limit,
                usage_count, expires_at, last_used_at,
                revoked_at, revoked_by, revocation_reason,
                rotated_at, rotated_by, rotation_reason,
                created_by, created_at, updated_at, updated_by, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                    $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25)
            "#,
        )
        .bind(api_key.id().as_uuid())
        .bind(api_key.name())
        .bind(api_key.key_id())
        .bind(api_key.key_hash())
        .bind(api_key.environment().as_str())
        .bind(api_key.permissions().to_strings())
        .bind(api_key.is_active())
        .bind(to_db_limit(limits.requests_per_minute))
        .bind(to_db_limit(limits.requests_per_hour))
        .bind(to_db_limit(limits.requests_per_day))
        .bind(to_db_limit(limits.burst_limit))
        .bind(to_db_count(api_key.usage_count()))
        .bind(api_key.expires_at())
        .bind(api_key.last_used_at())
        .bind(revoked_at)
        .bind(revoked_by)
        .bind(revocation_reason)
        .bind(rotated_at)
        .bind(rotated_by)
        .bind(rotation_reason)
        .bind(api_key.created_by())
        .bind(api_key.created_at())
        .bind(api_key.updated_at())
        .bind(api_key.updated_by())
        .bind(to_db_count(api_key.version()))
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, &api_key, "create"))?;

        Ok(api_key)
    }

    async fn update(&self, api_key: &ApiKey) -> Result<ApiKey, DomainError> {
        let (revoked_at, revoked_by, revocation_reason) = revocation_of(api_key);
        let (rotated_at, rotated_by, rotation_reason) = rotation_of(api_key);
        let limits = api_key.rate_limit();

        let sql = format!(
            r#"
            UPDATE api_keys
            SET name = $2, key_id = $3, key_hash = $4, permissions = $5, is_active = $6,
                requests_per_minute = $7, requests_per_hour = $8,
                requests_per_day = $9, burst_limit = $10,
                usage_count = GREATEST(usage_count, $11),
                expires_at = $12,
                last_used_at = GREATEST(last_used_at, $13),
                revoked_at = $14, revoked_by = $15, revocation_reason = $16,
                rotated_at = $17, rotated_by = $18, rotation_reason = $19,
                updated_at = $20, updated_by = $21,
                version = version + 1
            WHERE id = $1 AND version = $22
            RETURNING {}
            "#,
            API_KEY_COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(api_key.id().as_uuid())
            .bind(api_key.name())
            .bind(api_key.key_id())
            .bind(api_key.key_hash())
            .bind(api_key.permissions().to_strings())
            .bind(api_key.is_active())
            .bind(to_db_limit(limits.requests_per_minute))
            .bind(to_db_limit(limits.requests_per_hour))
            .bind(to_db_limit(limits.requests_per_day))
            .bind(to_db_limit(limits.burst_limit))
            .bind(to_db_count(api_key.usage_count()))
            .bind(api_key.expires_at())
            .bind(api_key.last_used_at())
            .bind(revoked_at)
            .bind(revoked_by)
            .bind(revocation_reason)
            .bind(rotated_at)
            .bind(rotated_by)
            .bind(rotation_reason)
            .bind(api_key.updated_at())
            .bind(api_key.updated_by())
            .bind(to_db_count(api_key.version()))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| write_error(e, api_key, "update"))?;

        if let Some(row) = row {
            return row_to_api_key(&row);
        }

        // No row matched: either the key is gone or another writer got there first
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM api_keys WHERE id = $1)")
            .bind(api_key.id().as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to update API key: {}", e)))?;

        if exists {
            Err(DomainError::conflict(format!(
                "API key '{}' was modified concurrently",
                api_key.id()
            )))
        } else {
            Err(DomainError::not_found(format!(
                "API key '{}' not found",
                api_key.id()
            )))
        }
    }

    async fn delete(&self, id: &ApiKeyId) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM api_keys WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to delete API key: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, active_only: bool) -> Result<Vec<ApiKey>, DomainError> {
        let sql = if active_only {
            format!(
                "SELECT {} FROM api_keys WHERE is_active = TRUE ORDER BY created_at",
                API_KEY_COLUMNS
            )
        } else {
            format!("SELECT {} FROM api_keys ORDER BY created_at", API_KEY_COLUMNS)
        };

        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to list API keys: {}", e)))?;

        rows.iter().map(row_to_api_key).collect()
    }

    async fn record_usage(&self, id: &ApiKeyId, at: DateTime<Utc>) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE api_keys
            SET usage_count = usage_count + 1,
                last_used_at = GREATEST(last_used_at, $2)
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to record API key usage: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("API key '{}' not found", id)));
        }

        Ok(())
    }
}

type AuditFields<'a> = (Option<DateTime<Utc>>, Option<&'a str>, Option<&'a str>);

fn revocation_of(api_key: &ApiKey) -> AuditFields<'_> {
    (
        api_key.revoked_at(),
        api_key.revoked_by(),
        api_key.revocation_reason(),
    )
}

fn rotation_of(api_key: &ApiKey) -> AuditFields<'_> {
    (
        api_key.rotated_at(),
        api_key.rotated_by(),
        api_key.rotation_reason(),
    )
}

fn write_error(e: sqlx::Error, api_key: &ApiKey, action: &str) -> DomainError {
    let unique_violation = e
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());

    if unique_violation {
        DomainError::conflict(format!(
            "API key with key ID '{}' already exists",
            api_key.key_id()
        ))
    } else {
        DomainError::storage(format!("Failed to {} API key: {}", action, e))
    }
}

fn to_db_limit(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn from_db_limit(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

fn to_db_count(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_db_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn row_to_api_key(row: &PgRow) -> Result<ApiKey, DomainError> {
    let id: Uuid = row.get("id");
    let environment: String = row.get("environment");
    let permissions: Vec<String> = row.get("permissions");

    let environment: KeyEnvironment = environment
        .parse()
        .map_err(|e| DomainError::storage(format!("Invalid environment in database: {}", e)))?;
    let permissions = PermissionSet::parse(permissions)
        .map_err(|e| DomainError::storage(format!("Invalid permission in database: {}", e)))?;

    let rate_limit = RateLimitConfig::new(
        from_db_limit(row.get("requests_per_minute")),
        from_db_limit(row.get("requests_per_hour")),
        from_db_limit(row.get("requests_per_day")),
        from_db_limit(row.get("burst_limit")),
    );

    Ok(ApiKey::restore(
        ApiKeyId::from(id),
        row.get("name"),
        row.get("key_id"),
        row.get("key_hash"),
        environment,
        permissions,
        row.get("is_active"),
        rate_limit,
        from_db_count(row.get("usage_count")),
        row.get("expires_at"),
        row.get("last_used_at"),
        (
            row.get("revoked_at"),
            row.get("revoked_by"),
            row.get("revocation_reason"),
        ),
        (
            row.get("rotated_at"),
            row.get("rotated_by"),
            row.get("rotation_reason"),
        ),
        row.get("created_by"),
        row.get("created_at"),
        row.get("updated_at"),
        row.get("updated_by"),
        from_db_count(row.get("version")),
    ))
}
