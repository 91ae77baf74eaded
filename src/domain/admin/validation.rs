//! Admin account validation utilities

use thiserror::Error;

/// Errors that can occur during admin validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AdminValidationError {
    #[error("Admin ID '{0}' is not a valid UUID")]
    InvalidId(String),

    #[error("Email cannot be empty")]
    EmptyEmail,

    #[error("Email '{0}' is not a valid address")]
    InvalidEmail(String),

    #[error("Email exceeds maximum length of {0} characters")]
    EmailTooLong(usize),

    #[error("Name cannot be empty")]
    EmptyName,

    #[error("Name exceeds maximum length of {0} characters")]
    NameTooLong(usize),

    #[error("Password is too short. Minimum length is {0} characters")]
    PasswordTooShort(usize),

    #[error("Password exceeds maximum length of {0} characters")]
    PasswordTooLong(usize),
}

const MAX_EMAIL_LENGTH: usize = 254;
const MAX_NAME_LENGTH: usize = 100;
pub const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

/// Validate an admin email address
///
/// Only the shape `local@domain` is checked; the address is compared
/// case-insensitively everywhere else.
pub fn validate_email(email: &str) -> Result<(), AdminValidationError> {
    let email = email.trim();

    if email.is_empty() {
        return Err(AdminValidationError::EmptyEmail);
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(AdminValidationError::EmailTooLong(MAX_EMAIL_LENGTH));
    }

    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.contains(char::is_whitespace) =>
        {
            Ok(())
        }
        _ => Err(AdminValidationError::InvalidEmail(email.to_string())),
    }
}

/// Validate an admin display name
pub fn validate_admin_name(name: &str) -> Result<(), AdminValidationError> {
    let name = name.trim();

    if name.is_empty() {
        return Err(AdminValidationError::EmptyName);
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(AdminValidationError::NameTooLong(MAX_NAME_LENGTH));
    }

    Ok(())
}

/// Validate a password before hashing
pub fn validate_password(password: &str) -> Result<(), AdminValidationError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AdminValidationError::PasswordTooShort(MIN_PASSWORD_LENGTH));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AdminValidationError::PasswordTooLong(MAX_PASSWORD_LENGTH));
    }

    Ok(())
}
