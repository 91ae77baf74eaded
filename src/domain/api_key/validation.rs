//! API key validation utilities

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Errors that can occur while validating API key input
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiKeyValidationError {
    #[error("API key ID '{0}' is not a valid UUID")]
    InvalidId(String),

    #[error("API key name cannot be empty")]
    EmptyName,

    #[error("API key name exceeds maximum length of {0} characters")]
    NameTooLong(usize),

    #[error("Invalid permission '{0}'. Expected '<resource>:<action>' using lowercase letters, digits, '_' or '-'")]
    InvalidPermission(String),

    #[error("At least one permission is required")]
    NoPermissions,

    #[error("Rate limit '{0}' must be a positive integer")]
    NonPositiveRateLimit(&'static str),

    #[error("Unknown key environment '{0}'. Expected 'live' or 'test'")]
    UnknownEnvironment(String),

    #[error("Expiration must be in the future")]
    ExpiryInPast,
}

pub const MAX_API_KEY_NAME_LENGTH: usize = 100;

/// `<resource>:<action>` with lowercase segments
static PERMISSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*:[a-z0-9][a-z0-9_-]*$").unwrap());

/// Validate a permission scope string
pub fn validate_permission(permission: &str) -> Result<(), ApiKeyValidationError> {
    if PERMISSION_PATTERN.is_match(permission) {
        Ok(())
    } else {
        Err(ApiKeyValidationError::InvalidPermission(permission.to_string()))
    }
}

/// Validate an API key display name
pub fn validate_api_key_name(name: &str) -> Result<(), ApiKeyValidationError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ApiKeyValidationError::EmptyName);
    }

    if trimmed.chars().count() > MAX_API_KEY_NAME_LENGTH {
        return Err(ApiKeyValidationError::NameTooLong(MAX_API_KEY_NAME_LENGTH));
    }

    Ok(())
}
