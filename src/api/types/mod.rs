//! Shared request/response types for the HTTP layer

pub mod error;
pub mod json;

pub use error::{ApiError, ApiErrorCode, ApiErrorResponse};
pub use json::{parse_optional_body, Json};
