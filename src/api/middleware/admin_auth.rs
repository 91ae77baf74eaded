//! Admin authentication via session JWT

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::debug;

use super::auth::bearer_token;
use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::admin::AdminUser;

/// Extractor that requires an authenticated, active admin
///
/// The session token is read from `Authorization: Bearer <jwt>`.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AdminUser);

impl RequireAdmin {
    /// Identifier recorded in audit fields
    pub fn actor(&self) -> String {
        format!("admin:{}", self.0.id())
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?.ok_or_else(|| {
            ApiError::unauthorized(
                "Authentication required. Provide a session token via 'Authorization: Bearer <token>'",
            )
        })?;

        let admin = state
            .admin_service
            .authenticate_token(&token)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Invalid or expired session token"))?;

        debug!(admin_id = %admin.id(), "Admin authenticated");

        Ok(RequireAdmin(admin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::admin::AdminId;

    #[test]
    fn test_actor_identifier() {
        let admin = AdminUser::new(AdminId::generate(), "ops@bzk.example", "Ops", "hash");
        let expected = format!("admin:{}", admin.id());

        assert_eq!(RequireAdmin(admin).actor(), expected);
    }
}
