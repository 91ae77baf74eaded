//! API Key domain
//!
//! Domain types and traits for API key management: key records, permission
//! scopes, rate limit thresholds and authorization outcomes.

mod decision;
mod entity;
mod permission;
mod repository;
mod validation;

pub use decision::{AuthorizationDecision, DenyReason, RateLimitWindow};
pub use entity::{ApiKey, ApiKeyId, KeyEnvironment, RateLimitConfig};
pub use permission::{Permission, PermissionSet};
pub use repository::ApiKeyRepository;
pub use validation::{
    validate_api_key_name, validate_permission, ApiKeyValidationError, MAX_API_KEY_NAME_LENGTH,
};

#[cfg(test)]
pub use repository::MockApiKeyRepository;
