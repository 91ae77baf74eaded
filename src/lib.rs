//! BZK admin API
//!
//! Back-office service for the chemical-products catalogue:
//! - API key issuance and authorization with per-key permissions and rate limits
//! - Admin accounts with Argon2 passwords and JWT sessions
//! - Short-lived draft quotations scoped to their author
//! - Push and email notification dispatch through a signed webhook relay

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use api::state::AppState;
use config::{RateLimitBackend, StorageBackend};
use domain::admin::AdminRepository;
use domain::api_key::ApiKeyRepository;
use domain::notification::NotificationSender;
use infrastructure::{
    admin::{AdminService, Argon2Hasher, InMemoryAdminRepository, PostgresAdminRepository},
    api_key::{
        ApiKeyService, InMemoryApiKeyRepository, InMemoryRateLimiter, PostgresApiKeyRepository,
        RateLimiter, RedisRateLimiter,
    },
    auth::{JwtConfig, JwtService},
    notification::{
        LoggingNotificationSender, NotificationDispatcher, RetryPolicy, WebhookNotificationSender,
    },
    quotation::{DraftStoreConfig, MokaDraftStore},
    storage::{connect_pool, run_migrations, PostgresConfig},
};

const DEFAULT_JWT_SECRET: &str = "change-me-in-production";

/// Build the application state from configuration
///
/// Selects the storage and rate limit backends, creates the bootstrap admin
/// when configured and wires the notification relay.
pub async fn create_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let (api_key_repository, admin_repository) = create_repositories(config).await?;
    let rate_limiter = create_rate_limiter(config).await?;

    let default_rate_limit = config.api_keys.default_rate_limit();
    default_rate_limit
        .validate()
        .context("Invalid default rate limits in api_keys config")?;

    let api_key_service = ApiKeyService::new(api_key_repository)
        .with_rate_limiter(rate_limiter)
        .with_default_rate_limit(default_rate_limit)
        .with_default_environment(config.api_keys.environment);

    if config.auth.jwt_secret == DEFAULT_JWT_SECRET {
        warn!("auth.jwt_secret is the built-in default; set APP__AUTH__JWT_SECRET");
    }

    let admin_service = AdminService::new(
        admin_repository,
        Arc::new(Argon2Hasher::new()),
        Arc::new(JwtService::new(JwtConfig::new(
            config.auth.jwt_secret.clone(),
            config.auth.jwt_expiration_hours,
        ))),
    );
    bootstrap_admin(config, &admin_service).await?;

    let draft_store = MokaDraftStore::with_config(
        DraftStoreConfig::default()
            .with_ttl(Duration::from_secs(config.drafts.ttl_secs))
            .with_max_capacity(config.drafts.max_capacity),
    );

    let dispatcher = create_notification_dispatcher(config)?;

    Ok(AppState::new(
        Arc::new(api_key_service),
        Arc::new(admin_service),
        Arc::new(draft_store),
        Arc::new(dispatcher),
    ))
}

async fn create_repositories(
    config: &AppConfig,
) -> anyhow::Result<(Arc<dyn ApiKeyRepository>, Arc<dyn AdminRepository>)> {
    info!("Storage backend: {:?}", config.storage.backend);

    match config.storage.backend {
        StorageBackend::Memory => Ok((
            Arc::new(InMemoryApiKeyRepository::new()),
            Arc::new(InMemoryAdminRepository::new()),
        )),
        StorageBackend::Postgres => {
            let pool = connect_pool(
                &PostgresConfig::new(config.storage.database_url.clone())
                    .with_max_connections(config.storage.max_connections),
            )
            .await?;

            let applied = run_migrations(&pool).await?;
            info!(applied, "Database schema is up to date");

            Ok((
                Arc::new(PostgresApiKeyRepository::new(pool.clone())),
                Arc::new(PostgresAdminRepository::new(pool)),
            ))
        }
    }
}

async fn create_rate_limiter(config: &AppConfig) -> anyhow::Result<Arc<dyn RateLimiter>> {
    info!("Rate limit backend: {:?}", config.rate_limit.backend);

    match config.rate_limit.backend {
        RateLimitBackend::Memory => Ok(Arc::new(InMemoryRateLimiter::new())),
        RateLimitBackend::Redis => Ok(Arc::new(
            RedisRateLimiter::connect(&config.rate_limit.redis_url)
                .await?
                .with_key_prefix(&config.rate_limit.redis_key_prefix),
        )),
    }
}

async fn bootstrap_admin(config: &AppConfig, admin_service: &AdminService) -> anyhow::Result<()> {
    match (
        &config.auth.bootstrap_admin_email,
        &config.auth.bootstrap_admin_password,
    ) {
        (Some(email), Some(password)) => {
            admin_service
                .bootstrap(email, password)
                .await
                .context("Failed to create bootstrap admin")?;
        }
        (Some(_), None) | (None, Some(_)) => {
            warn!("Bootstrap admin needs both email and password; skipping");
        }
        (None, None) => {}
    }

    Ok(())
}

fn create_notification_dispatcher(config: &AppConfig) -> anyhow::Result<NotificationDispatcher> {
    let settings = &config.notifications;

    let sender: Arc<dyn NotificationSender> = match &settings.relay_url {
        Some(url) => {
            info!(relay_url = %url, "Notifications delivered through webhook relay");
            let mut sender =
                WebhookNotificationSender::new(url, Duration::from_secs(settings.timeout_secs))?;
            if let Some(secret) = &settings.signing_secret {
                sender = sender.with_signing_secret(secret);
            }
            Arc::new(sender)
        }
        None => {
            info!("No notification relay configured, notifications will be logged");
            Arc::new(LoggingNotificationSender::new())
        }
    };

    Ok(NotificationDispatcher::new(sender).with_policy(RetryPolicy {
        max_attempts: settings.max_attempts.max(1),
        base_delay: Duration::from_millis(settings.base_delay_ms),
        max_delay: Duration::from_millis(settings.max_delay_ms),
    }))
}
