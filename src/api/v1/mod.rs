//! API-key authenticated v1 endpoints

pub mod authorize;

use axum::{routing::post, Router};

use super::state::AppState;

/// Create v1 API router
pub fn create_v1_router() -> Router<AppState> {
    Router::new().route("/authorize", post(authorize::authorize))
}
