//! Domain layer - Core business types and the traits infrastructure implements

pub mod admin;
pub mod api_key;
pub mod clock;
pub mod error;
pub mod notification;
pub mod quotation;

pub use api_key::{ApiKey, ApiKeyId, ApiKeyRepository, AuthorizationDecision, DenyReason};
pub use error::DomainError;
