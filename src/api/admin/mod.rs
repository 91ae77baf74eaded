//! Admin API endpoints
//!
//! Everything except login requires an admin session token.

pub mod api_keys;
pub mod auth;
pub mod notifications;
pub mod quotations;

use axum::{
    routing::{get, post},
    Router,
};

use super::state::AppState;

/// Create admin API router
pub fn create_admin_router() -> Router<AppState> {
    Router::new()
        // Session
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/auth/password", post(auth::change_password))
        .route("/admins", post(auth::create_admin))
        // API key management
        .route(
            "/api-keys",
            get(api_keys::list_api_keys).post(api_keys::create_api_key),
        )
        .route(
            "/api-keys/{id}",
            get(api_keys::get_api_key)
                .patch(api_keys::update_api_key)
                .delete(api_keys::delete_api_key),
        )
        .route("/api-keys/{id}/revoke", post(api_keys::revoke_api_key))
        .route("/api-keys/{id}/rotate", post(api_keys::rotate_api_key))
        // Draft quotations
        .route(
            "/quotations/drafts",
            get(quotations::list_drafts)
                .post(quotations::create_draft)
                .delete(quotations::clear_drafts),
        )
        .route(
            "/quotations/drafts/{id}",
            get(quotations::get_draft)
                .put(quotations::replace_draft)
                .delete(quotations::delete_draft),
        )
        // Notifications
        .route("/notifications", post(notifications::dispatch_notifications))
}
