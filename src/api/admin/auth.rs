//! Admin authentication endpoints
//!
//! Login issues a session JWT; every other admin route expects it as a
//! bearer token.

use axum::{extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::middleware::RequireAdmin;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::admin::AdminUser;
use crate::domain::DomainError;
use crate::infrastructure::admin::{CreateAdminRequest, LoginResult};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_in_hours: u64,
    pub admin: AdminResponse,
}

impl From<LoginResult> for LoginResponse {
    fn from(result: LoginResult) -> Self {
        Self {
            token: result.token,
            expires_in_hours: result.expires_in_hours,
            admin: AdminResponse::from(&result.admin),
        }
    }
}

/// Admin profile (safe to expose)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<&AdminUser> for AdminResponse {
    fn from(admin: &AdminUser) -> Self {
        Self {
            id: admin.id().to_string(),
            email: admin.email().to_string(),
            name: admin.name().to_string(),
            is_active: admin.is_active(),
            created_at: admin.created_at(),
            last_login_at: admin.last_login_at(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateAdminBody {
    pub email: String,
    pub name: String,
    pub password: String,
}

/// POST /admin/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let result = state
        .admin_service
        .login(&request.email, &request.password)
        .await?;

    Ok(Json(result.into()))
}

/// GET /admin/auth/me
pub async fn me(RequireAdmin(admin): RequireAdmin) -> Json<AdminResponse> {
    Json(AdminResponse::from(&admin))
}

/// POST /admin/auth/password
pub async fn change_password(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .admin_service
        .change_password(admin.id(), &request.current_password, &request.new_password)
        .await
        .map_err(|e| match e {
            DomainError::InvalidCredentials => {
                ApiError::unauthorized("Current password is incorrect")
            }
            other => ApiError::from(other),
        })?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /admin/admins
pub async fn create_admin(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Json(body): Json<CreateAdminBody>,
) -> Result<(StatusCode, Json<AdminResponse>), ApiError> {
    let admin = state
        .admin_service
        .create_admin(CreateAdminRequest {
            email: body.email,
            name: body.name,
            password: body.password,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(AdminResponse::from(&admin))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::admin::AdminId;

    #[test]
    fn test_admin_response_hides_password_hash() {
        let admin = AdminUser::new(
            AdminId::generate(),
            "Ops@BZK.example",
            "Ops",
            "$argon2id$v=19$secret",
        );

        let json = serde_json::to_value(AdminResponse::from(&admin)).unwrap();

        assert_eq!(json["email"], "ops@bzk.example");
        assert_eq!(json["isActive"], true);
        assert!(!json.to_string().contains("argon2"));
    }

    #[test]
    fn test_change_password_request_is_camel_case() {
        let request: ChangePasswordRequest = serde_json::from_str(
            r#"{"currentPassword": "old-password", "newPassword": "new-password"}"#,
        )
        .unwrap();

        assert_eq!(request.current_password, "old-password");
        assert_eq!(request.new_password, "new-password");
    }
}
