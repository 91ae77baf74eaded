//! Application configuration

mod app_config;

pub use app_config::{
    ApiKeysConfig, AppConfig, AuthConfig, DraftsConfig, LogFormat, LoggingConfig,
    NotificationsConfig, RateLimitBackend, RateLimitBackendConfig, ServerConfig, StorageBackend,
    StorageConfig,
};
