//! API key authorization probe

use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::middleware::PresentedApiKey;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::api_key::{ApiKey, AuthorizationDecision, KeyEnvironment, RateLimitConfig};

#[derive(Debug, Deserialize)]
pub struct AuthorizeRequest {
    pub permission: String,
}

/// Summary of the key that was allowed
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeResponse {
    pub allowed: bool,
    pub id: String,
    pub key_id: String,
    pub name: String,
    pub environment: KeyEnvironment,
    pub permissions: Vec<String>,
    pub rate_limit: RateLimitConfig,
    pub usage_count: u64,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&ApiKey> for AuthorizeResponse {
    fn from(key: &ApiKey) -> Self {
        Self {
            allowed: true,
            id: key.id().to_string(),
            key_id: key.key_id().to_string(),
            name: key.name().to_string(),
            environment: key.environment(),
            permissions: key.permissions().to_strings(),
            rate_limit: *key.rate_limit(),
            usage_count: key.usage_count(),
            last_used_at: key.last_used_at(),
            expires_at: key.expires_at(),
        }
    }
}

/// POST /v1/authorize
///
/// Checks the presented key against the requested permission and its rate
/// limits; an allowed call counts as one use of the key.
pub async fn authorize(
    State(state): State<AppState>,
    PresentedApiKey(secret): PresentedApiKey,
    Json(request): Json<AuthorizeRequest>,
) -> Result<Json<AuthorizeResponse>, ApiError> {
    match state
        .api_key_service
        .authorize(&secret, &request.permission)
        .await?
    {
        AuthorizationDecision::Allow(key) => Ok(Json(AuthorizeResponse::from(key.as_ref()))),
        AuthorizationDecision::Deny(reason) => Err(reason.into()),
    }
}
