use thiserror::Error;

/// Failures shared by every service in the admin backend.
///
/// The first group is caused by the caller and maps onto 4xx responses;
/// the rest come from storage, cache or configuration and are never shown
/// to clients verbatim.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    Validation { message: String },

    /// Wrong email/password pair, or an unknown or disabled admin
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("{message}")]
    Conflict { message: String },

    #[error("misconfigured: {message}")]
    Configuration { message: String },

    #[error("internal failure: {message}")]
    Internal { message: String },

    /// Database or repository failure
    #[error("storage unavailable: {message}")]
    Storage { message: String },

    /// Rate limiter or draft cache failure
    #[error("cache unavailable: {message}")]
    Cache { message: String },
}

macro_rules! message_ctor {
    ($($name:ident => $variant:ident),+ $(,)?) => {
        impl DomainError {
            $(
                pub fn $name(message: impl Into<String>) -> Self {
                    Self::$variant { message: message.into() }
                }
            )+
        }
    };
}

message_ctor! {
    not_found => NotFound,
    validation => Validation,
    conflict => Conflict,
    configuration => Configuration,
    internal => Internal,
    storage => Storage,
    cache => Cache,
}

impl DomainError {
    /// True for failures that are the server's fault
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. } | Self::Internal { .. } | Self::Storage { .. } | Self::Cache { .. }
        )
    }
}
