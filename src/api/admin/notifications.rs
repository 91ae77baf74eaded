//! Notification dispatch endpoint

use std::collections::BTreeMap;

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::middleware::RequireAdmin;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::notification::{DeliveryReport, Notification, NotificationChannel};

/// Upper bound on notifications accepted in one request
const MAX_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationRequest {
    pub channel: NotificationChannel,
    pub recipient: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl From<NotificationRequest> for Notification {
    fn from(request: NotificationRequest) -> Self {
        let mut notification = Notification::new(
            request.channel,
            request.recipient,
            request.title,
            request.body,
        );
        notification.data = request.data;
        notification
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchRequest {
    pub notifications: Vec<NotificationRequest>,
}

#[derive(Debug, Serialize)]
pub struct DispatchResponse {
    pub reports: Vec<DeliveryReport>,
    pub delivered: usize,
    pub failed: usize,
}

/// Build the batch, rejecting it as a whole if any entry is invalid
fn build_batch(request: DispatchRequest) -> Result<Vec<Notification>, ApiError> {
    if request.notifications.is_empty() {
        return Err(ApiError::bad_request("At least one notification is required"));
    }

    if request.notifications.len() > MAX_BATCH_SIZE {
        return Err(ApiError::bad_request(format!(
            "At most {} notifications can be dispatched at once",
            MAX_BATCH_SIZE
        )));
    }

    request
        .notifications
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let notification = Notification::from(entry);
            notification
                .validate()
                .map_err(|e| ApiError::bad_request(format!("notifications[{}]: {}", index, e)))?;
            Ok(notification)
        })
        .collect()
}

/// POST /admin/notifications
pub async fn dispatch_notifications(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(request): Json<DispatchRequest>,
) -> Result<Json<DispatchResponse>, ApiError> {
    let batch = build_batch(request)?;

    info!(admin_id = %admin.id(), count = batch.len(), "Dispatching notifications");

    let reports = state.notification_dispatcher.dispatch_batch(&batch).await;
    let delivered = reports.iter().filter(|r| r.is_delivered()).count();
    let failed = reports.len() - delivered;

    Ok(Json(DispatchResponse {
        reports,
        delivered,
        failed,
    }))
}
