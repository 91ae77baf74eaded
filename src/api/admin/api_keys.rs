//! API key management admin endpoints

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::api::middleware::RequireAdmin;
use crate::api::state::AppState;
use crate::api::types::{parse_optional_body, ApiError, Json};
use crate::domain::api_key::{ApiKey, ApiKeyId, KeyEnvironment, RateLimitConfig};
use crate::infrastructure::api_key::{CreateApiKeyRequest, IssuedApiKey, UpdateApiKeyRequest};

/// Request body for creating an API key
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKeyBody {
    pub name: String,
    pub permissions: Vec<String>,
    #[serde(default)]
    pub environment: Option<KeyEnvironment>,
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Request body for a partial update
///
/// `expiresAt: null` clears the expiration; an absent field leaves it as is.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateApiKeyBody {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub expires_at: Option<Option<DateTime<Utc>>>,
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
}

fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl From<UpdateApiKeyBody> for UpdateApiKeyRequest {
    fn from(body: UpdateApiKeyBody) -> Self {
        Self {
            name: body.name,
            permissions: body.permissions,
            is_active: body.is_active,
            expires_at: body.expires_at,
            rate_limit: body.rate_limit,
        }
    }
}

/// Optional reason for revoke, rotate and delete
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReasonBody {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListApiKeysQuery {
    #[serde(default)]
    pub active_only: bool,
}

/// API key as exposed to admins; never carries the hash
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyResponse {
    pub id: String,
    pub name: String,
    pub key_id: String,
    pub environment: KeyEnvironment,
    pub permissions: Vec<String>,
    pub is_active: bool,
    pub rate_limit: RateLimitConfig,
    pub usage_count: u64,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotated_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation_reason: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl From<&ApiKey> for ApiKeyResponse {
    fn from(key: &ApiKey) -> Self {
        Self {
            id: key.id().to_string(),
            name: key.name().to_string(),
            key_id: key.key_id().to_string(),
            environment: key.environment(),
            permissions: key.permissions().to_strings(),
            is_active: key.is_active(),
            rate_limit: *key.rate_limit(),
            usage_count: key.usage_count(),
            expires_at: key.expires_at(),
            last_used_at: key.last_used_at(),
            revoked_at: key.revoked_at(),
            revoked_by: key.revoked_by().map(String::from),
            revocation_reason: key.revocation_reason().map(String::from),
            rotated_at: key.rotated_at(),
            rotated_by: key.rotated_by().map(String::from),
            rotation_reason: key.rotation_reason().map(String::from),
            created_by: key.created_by().to_string(),
            created_at: key.created_at(),
            updated_at: key.updated_at(),
            updated_by: key.updated_by().map(String::from),
        }
    }
}

/// Issued key together with its plaintext secret, shown exactly once
#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyWithSecretResponse {
    #[serde(flatten)]
    pub api_key: ApiKeyResponse,
    pub secret: String,
}

impl From<IssuedApiKey> for ApiKeyWithSecretResponse {
    fn from(issued: IssuedApiKey) -> Self {
        Self {
            api_key: ApiKeyResponse::from(&issued.api_key),
            secret: issued.secret,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListApiKeysResponse {
    pub api_keys: Vec<ApiKeyResponse>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteApiKeyResponse {
    pub deleted: bool,
    pub id: String,
}

fn parse_id(id: &str) -> Result<ApiKeyId, ApiError> {
    ApiKeyId::parse(id).map_err(|_| ApiError::not_found(format!("API key '{}' not found", id)))
}

/// GET /admin/api-keys
pub async fn list_api_keys(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Query(query): Query<ListApiKeysQuery>,
) -> Result<Json<ListApiKeysResponse>, ApiError> {
    debug!(active_only = query.active_only, "Admin listing API keys");

    let keys = state.api_key_service.list(query.active_only).await?;

    let api_keys: Vec<ApiKeyResponse> = keys.iter().map(ApiKeyResponse::from).collect();
    let total = api_keys.len();

    Ok(Json(ListApiKeysResponse { api_keys, total }))
}

/// POST /admin/api-keys
pub async fn create_api_key(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Json(body): Json<CreateApiKeyBody>,
) -> Result<(StatusCode, Json<ApiKeyWithSecretResponse>), ApiError> {
    debug!(name = %body.name, "Admin creating API key");

    let environment = body
        .environment
        .unwrap_or_else(|| state.api_key_service.default_environment());

    let issued = state
        .api_key_service
        .create(CreateApiKeyRequest {
            name: body.name,
            permissions: body.permissions,
            created_by: admin.actor(),
            environment,
            rate_limit: body.rate_limit,
            expires_at: body.expires_at,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(issued.into())))
}

/// GET /admin/api-keys/{id}
pub async fn get_api_key(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<ApiKeyResponse>, ApiError> {
    let key = state
        .api_key_service
        .get(&parse_id(&id)?)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("API key '{}' not found", id)))?;

    Ok(Json(ApiKeyResponse::from(&key)))
}

/// PATCH /admin/api-keys/{id}
pub async fn update_api_key(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    Json(body): Json<UpdateApiKeyBody>,
) -> Result<Json<ApiKeyResponse>, ApiError> {
    let key = state
        .api_key_service
        .update(&parse_id(&id)?, body.into(), &admin.actor())
        .await?;

    Ok(Json(ApiKeyResponse::from(&key)))
}

/// DELETE /admin/api-keys/{id}
pub async fn delete_api_key(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<DeleteApiKeyResponse>, ApiError> {
    let ReasonBody { reason } = parse_optional_body(&body)?;

    let deleted = state
        .api_key_service
        .delete(&parse_id(&id)?, &admin.actor(), reason.as_deref())
        .await?;

    if !deleted {
        return Err(ApiError::not_found(format!("API key '{}' not found", id)));
    }

    Ok(Json(DeleteApiKeyResponse { deleted, id }))
}

/// POST /admin/api-keys/{id}/revoke
pub async fn revoke_api_key(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<ApiKeyResponse>, ApiError> {
    let ReasonBody { reason } = parse_optional_body(&body)?;

    let key = state
        .api_key_service
        .revoke(&parse_id(&id)?, &admin.actor(), reason)
        .await?;

    Ok(Json(ApiKeyResponse::from(&key)))
}

/// POST /admin/api-keys/{id}/rotate
pub async fn rotate_api_key(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<ApiKeyWithSecretResponse>, ApiError> {
    let ReasonBody { reason } = parse_optional_body(&body)?;

    let issued = state
        .api_key_service
        .rotate(&parse_id(&id)?, &admin.actor(), reason)
        .await?;

    Ok(Json(issued.into()))
}
