//! Admin domain - back-office accounts that manage API keys

mod entity;
mod repository;
mod validation;

pub use entity::{normalize_email, AdminId, AdminUser};
pub use repository::AdminRepository;
pub use validation::{
    validate_admin_name, validate_email, validate_password, AdminValidationError,
    MIN_PASSWORD_LENGTH,
};

#[cfg(test)]
pub use repository::MockAdminRepository;
