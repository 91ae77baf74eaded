//! Request extractors for authentication

pub mod admin_auth;
pub mod auth;

pub use admin_auth::RequireAdmin;
pub use auth::{bearer_token, PresentedApiKey};
