//! Migrate command - applies the PostgreSQL schema

use std::time::Duration;

use anyhow::Context;
use clap::Args;
use tracing::info;

use crate::config::AppConfig;
use crate::infrastructure::logging;
use crate::infrastructure::storage::{
    connect_pool, revert_last_migration, run_migrations, PostgresConfig,
};

#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Revert the most recently applied migration instead
    #[arg(long)]
    pub revert: bool,

    /// Database URL; defaults to `storage.database_url`
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
}

/// Apply or revert migrations against the configured database
pub async fn run(args: MigrateArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    logging::init_logging(&config.logging);

    let url = args
        .database_url
        .unwrap_or_else(|| config.storage.database_url.clone());
    let pool = connect_pool(
        &PostgresConfig::new(url)
            .with_max_connections(config.storage.max_connections.clamp(1, 2))
            .with_acquire_timeout(Duration::from_secs(10)),
    )
    .await?;

    if args.revert {
        match revert_last_migration(&pool).await? {
            Some(version) => info!(version, "Reverted migration"),
            None => info!("No migrations to revert"),
        }
    } else {
        let applied = run_migrations(&pool).await?;
        info!(applied, "Migrations complete");
    }

    pool.close().await;

    Ok(())
}
