//! Versioned PostgreSQL schema for API keys and admin accounts

use sqlx::postgres::PgPool;
use tracing::info;

use crate::domain::DomainError;

/// One reversible schema step
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub up: &'static str,
    pub down: &'static str,
}

/// Applied versions are recorded here
const LEDGER_DDL: &str = r#"
    CREATE TABLE IF NOT EXISTS schema_history (
        version BIGINT PRIMARY KEY,
        description TEXT NOT NULL,
        applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "api_keys",
        up: r#"
            CREATE TABLE IF NOT EXISTS api_keys (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                key_id VARCHAR(64) NOT NULL UNIQUE,
                key_hash TEXT NOT NULL,
                environment VARCHAR(16) NOT NULL,
                permissions TEXT[] NOT NULL DEFAULT '{}',
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                requests_per_minute INTEGER NOT NULL,
                requests_per_hour INTEGER NOT NULL,
                requests_per_day INTEGER NOT NULL,
                burst_limit INTEGER NOT NULL,
                usage_count BIGINT NOT NULL DEFAULT 0,
                expires_at TIMESTAMPTZ,
                last_used_at TIMESTAMPTZ,
                revoked_at TIMESTAMPTZ,
                revoked_by TEXT,
                revocation_reason TEXT,
                rotated_at TIMESTAMPTZ,
                rotated_by TEXT,
                rotation_reason TEXT,
                created_by TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                updated_by TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_api_keys_is_active ON api_keys(is_active);
            CREATE INDEX IF NOT EXISTS idx_api_keys_created_at ON api_keys(created_at);
        "#,
        down: "DROP TABLE IF EXISTS api_keys;",
    },
    Migration {
        version: 2,
        description: "admins",
        up: r#"
            CREATE TABLE IF NOT EXISTS admins (
                id UUID PRIMARY KEY,
                email VARCHAR(254) NOT NULL UNIQUE,
                name TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                last_login_at TIMESTAMPTZ
            );
        "#,
        down: "DROP TABLE IF EXISTS admins;",
    },
    Migration {
        version: 3,
        description: "api_keys_version",
        up: "ALTER TABLE api_keys ADD COLUMN IF NOT EXISTS version BIGINT NOT NULL DEFAULT 0;",
        down: "ALTER TABLE api_keys DROP COLUMN IF EXISTS version;",
    },
];

/// The full schema in ascending version order
pub fn schema_migrations() -> &'static [Migration] {
    MIGRATIONS
}

fn storage_err(context: &str) -> impl FnOnce(sqlx::Error) -> DomainError + '_ {
    move |e| DomainError::storage(format!("{}: {}", context, e))
}

async fn applied_versions(pool: &PgPool) -> Result<Vec<i64>, DomainError> {
    sqlx::raw_sql(LEDGER_DDL)
        .execute(pool)
        .await
        .map_err(storage_err("Failed to create schema_history"))?;

    sqlx::query_scalar::<_, i64>("SELECT version FROM schema_history ORDER BY version")
        .fetch_all(pool)
        .await
        .map_err(storage_err("Failed to read schema_history"))
}

/// Applies every pending migration inside its own transaction, returning how many ran
pub async fn run_migrations(pool: &PgPool) -> Result<usize, DomainError> {
    let applied = applied_versions(pool).await?;
    let mut count = 0;

    for migration in MIGRATIONS.iter().filter(|m| !applied.contains(&m.version)) {
        let mut tx = pool.begin().await.map_err(storage_err("Failed to begin migration"))?;

        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .map_err(storage_err(migration.description))?;
        sqlx::query("INSERT INTO schema_history (version, description) VALUES ($1, $2)")
            .bind(migration.version)
            .bind(migration.description)
            .execute(&mut *tx)
            .await
            .map_err(storage_err("Failed to record migration"))?;

        tx.commit().await.map_err(storage_err("Failed to commit migration"))?;

        info!(version = migration.version, description = migration.description, "Migration applied");
        count += 1;
    }

    Ok(count)
}

/// Reverts the newest applied migration, returning its version
pub async fn revert_last_migration(pool: &PgPool) -> Result<Option<i64>, DomainError> {
    let Some(&version) = applied_versions(pool).await?.last() else {
        return Ok(None);
    };

    let migration = MIGRATIONS
        .iter()
        .find(|m| m.version == version)
        .ok_or_else(|| DomainError::storage(format!("Unknown migration version {}", version)))?;

    let mut tx = pool.begin().await.map_err(storage_err("Failed to begin revert"))?;

    sqlx::raw_sql(migration.down)
        .execute(&mut *tx)
        .await
        .map_err(storage_err(migration.description))?;
    sqlx::query("DELETE FROM schema_history WHERE version = $1")
        .bind(version)
        .execute(&mut *tx)
        .await
        .map_err(storage_err("Failed to remove migration record"))?;

    tx.commit().await.map_err(storage_err("Failed to commit revert"))?;

    info!(version, "Migration reverted");
    Ok(Some(version))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_strictly_ascending() {
        let versions: Vec<i64> = schema_migrations().iter().map(|m| m.version).collect();

        assert!(versions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(versions.first(), Some(&1));
    }

    #[test]
    fn test_every_step_is_reversible() {
        for migration in schema_migrations() {
            let reverses = (migration.up.contains("CREATE TABLE")
                && migration.down.contains("DROP TABLE"))
                || (migration.up.contains("ADD COLUMN") && migration.down.contains("DROP COLUMN"));
            assert!(reverses, "migration {} has no matching down step", migration.version);
        }
    }

    #[test]
    fn test_key_id_and_email_are_unique() {
        let migrations = schema_migrations();

        assert!(migrations[0].up.contains("key_id VARCHAR(64) NOT NULL UNIQUE"));
        assert!(migrations[1].up.contains("email VARCHAR(254) NOT NULL UNIQUE"));
    }
}
