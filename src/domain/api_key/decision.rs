//! Authorization outcomes

use serde::Serialize;

use super::entity::ApiKey;

/// Rate limit window a request is counted against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitWindow {
    Burst,
    Minute,
    Hour,
    Day,
}

impl RateLimitWindow {
    /// Windows in evaluation order, shortest first
    pub const ALL: [RateLimitWindow; 4] = [Self::Burst, Self::Minute, Self::Hour, Self::Day];

    pub fn duration_secs(&self) -> i64 {
        match self {
            Self::Burst => 1,
            Self::Minute => 60,
            Self::Hour => 3_600,
            Self::Day => 86_400,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Burst => "burst",
            Self::Minute => "per_minute",
            Self::Hour => "per_hour",
            Self::Day => "per_day",
        }
    }
}

impl std::fmt::Display for RateLimitWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a request was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// No record matches the presented key
    NotFound,
    /// The key was revoked or deactivated
    Inactive,
    /// The key is past its expiration time
    Expired,
    /// The key lacks the required scope
    PermissionDenied { required: String },
    /// The key exceeded one of its configured thresholds
    RateLimited {
        window: RateLimitWindow,
        limit: u32,
        retry_after_secs: u64,
    },
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "Invalid API key"),
            Self::Inactive => write!(f, "API key has been revoked or deactivated"),
            Self::Expired => write!(f, "API key has expired"),
            Self::PermissionDenied { required } => {
                write!(f, "API key lacks required permission '{}'", required)
            }
            Self::RateLimited {
                window,
                limit,
                retry_after_secs,
            } => write!(
                f,
                "Rate limit exceeded ({} limit of {}). Retry in {} seconds",
                window, limit, retry_after_secs
            ),
        }
    }
}

/// Result of authorizing a presented key for a permission
#[derive(Debug, Clone)]
pub enum AuthorizationDecision {
    Allow(Box<ApiKey>),
    Deny(DenyReason),
}

impl AuthorizationDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow(_))
    }

    pub fn deny_reason(&self) -> Option<&DenyReason> {
        match self {
            Self::Allow(_) => None,
            Self::Deny(reason) => Some(reason),
        }
    }

    pub fn into_api_key(self) -> Option<ApiKey> {
        match self {
            Self::Allow(key) => Some(*key),
            Self::Deny(_) => None,
        }
    }
}
