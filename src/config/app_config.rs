use serde::Deserialize;

use crate::domain::api_key::{KeyEnvironment, RateLimitConfig};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub rate_limit: RateLimitBackendConfig,
    pub auth: AuthConfig,
    pub api_keys: ApiKeysConfig,
    pub drafts: DraftsConfig,
    pub notifications: NotificationsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database_url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitBackend {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitBackendConfig {
    pub backend: RateLimitBackend,
    pub redis_url: String,
    /// Namespace for the per-key sorted sets
    pub redis_key_prefix: String,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_hours: u64,
    pub bootstrap_admin_email: Option<String>,
    pub bootstrap_admin_password: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[hidden]")
            .field("jwt_expiration_hours", &self.jwt_expiration_hours)
            .field("bootstrap_admin_email", &self.bootstrap_admin_email)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiKeysConfig {
    /// Environment of keys created without an explicit one
    pub environment: KeyEnvironment,
    pub requests_per_minute: u32,
    pub requests_per_hour: u32,
    pub requests_per_day: u32,
    pub burst_limit: u32,
}

impl ApiKeysConfig {
    pub fn default_rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig::new(
            self.requests_per_minute,
            self.requests_per_hour,
            self.requests_per_day,
            self.burst_limit,
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DraftsConfig {
    pub ttl_secs: u64,
    pub max_capacity: u64,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Relay endpoint; notifications are only logged when unset
    pub relay_url: Option<String>,
    pub signing_secret: Option<String>,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for NotificationsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationsConfig")
            .field("relay_url", &self.relay_url)
            .field("signing_secret", &self.signing_secret.as_ref().map(|_| "[hidden]"))
            .field("max_attempts", &self.max_attempts)
            .field("base_delay_ms", &self.base_delay_ms)
            .field("max_delay_ms", &self.max_delay_ms)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_url: "postgres://localhost/bzk_admin".to_string(),
            max_connections: 10,
        }
    }
}

impl Default for RateLimitBackendConfig {
    fn default() -> Self {
        Self {
            backend: RateLimitBackend::default(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            redis_key_prefix: "bzk:ratelimit".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_hours: 24,
            bootstrap_admin_email: None,
            bootstrap_admin_password: None,
        }
    }
}

impl Default for ApiKeysConfig {
    fn default() -> Self {
        let limits = RateLimitConfig::default();

        Self {
            environment: KeyEnvironment::default(),
            requests_per_minute: limits.requests_per_minute,
            requests_per_hour: limits.requests_per_hour,
            requests_per_day: limits.requests_per_day,
            burst_limit: limits.burst_limit,
        }
    }
}

impl Default for DraftsConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 24 * 3600,
            max_capacity: 10_000,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            relay_url: None,
            signing_secret: None,
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 5_000,
            timeout_secs: 10,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
