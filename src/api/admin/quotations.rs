//! Draft quotation endpoints, scoped to the calling admin

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Serialize;

use crate::api::middleware::RequireAdmin;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::quotation::{DraftContent, DraftId, DraftQuotation, DraftValidationError};

/// Draft with its computed total
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftResponse {
    #[serde(flatten)]
    pub draft: DraftQuotation,
    pub total_cents: u64,
}

impl From<DraftQuotation> for DraftResponse {
    fn from(draft: DraftQuotation) -> Self {
        let total_cents = draft.total_cents();
        Self { draft, total_cents }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListDraftsResponse {
    pub drafts: Vec<DraftResponse>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClearDraftsResponse {
    pub removed: usize,
}

impl From<DraftValidationError> for ApiError {
    fn from(err: DraftValidationError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

fn parse_id(id: &str) -> Result<DraftId, ApiError> {
    DraftId::parse(id).map_err(|_| not_found(id))
}

fn not_found(id: &str) -> ApiError {
    ApiError::not_found(format!("Draft '{}' not found", id))
}

/// GET /admin/quotations/drafts
pub async fn list_drafts(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<ListDraftsResponse>, ApiError> {
    let drafts: Vec<DraftResponse> = state
        .draft_store
        .list(admin.id())
        .await?
        .into_iter()
        .map(DraftResponse::from)
        .collect();
    let total = drafts.len();

    Ok(Json(ListDraftsResponse { drafts, total }))
}

/// POST /admin/quotations/drafts
pub async fn create_draft(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(content): Json<DraftContent>,
) -> Result<(StatusCode, Json<DraftResponse>), ApiError> {
    let draft = DraftQuotation::new(DraftId::generate(), *admin.id(), content, Utc::now())?;
    let saved = state.draft_store.save(draft).await?;

    Ok((StatusCode::CREATED, Json(saved.into())))
}

/// GET /admin/quotations/drafts/{id}
pub async fn get_draft(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<DraftResponse>, ApiError> {
    let draft = state
        .draft_store
        .get(admin.id(), &parse_id(&id)?)
        .await?
        .ok_or_else(|| not_found(&id))?;

    Ok(Json(draft.into()))
}

/// PUT /admin/quotations/drafts/{id}
pub async fn replace_draft(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    Json(content): Json<DraftContent>,
) -> Result<Json<DraftResponse>, ApiError> {
    let mut draft = state
        .draft_store
        .get(admin.id(), &parse_id(&id)?)
        .await?
        .ok_or_else(|| not_found(&id))?;

    draft.replace_content(content, Utc::now())?;
    let saved = state.draft_store.save(draft).await?;

    Ok(Json(saved.into()))
}

/// DELETE /admin/quotations/drafts/{id}
pub async fn delete_draft(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.draft_store.delete(admin.id(), &parse_id(&id)?).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(&id))
    }
}

/// DELETE /admin/quotations/drafts
pub async fn clear_drafts(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<ClearDraftsResponse>, ApiError> {
    let removed = state.draft_store.clear(admin.id()).await?;

    Ok(Json(ClearDraftsResponse { removed }))
}
