//! Probe endpoints: `/health`, `/ready` and `/live`

use std::future::Future;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use super::state::AppState;
use crate::api::types::Json;
use crate::domain::admin::AdminId;
use crate::domain::DomainError;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Up,
    Down,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentProbe {
    pub component: &'static str,
    pub status: ProbeStatus,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    pub status: ProbeStatus,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ComponentProbe>,
}

impl ProbeReport {
    fn from_components(components: Vec<ComponentProbe>) -> Self {
        let status = if components.iter().all(|c| c.status == ProbeStatus::Up) {
            ProbeStatus::Up
        } else {
            ProbeStatus::Down
        };

        Self {
            status,
            version: VERSION,
            components,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self.status {
            ProbeStatus::Up => StatusCode::OK,
            ProbeStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Always up once the process serves requests
pub async fn health_check() -> impl IntoResponse {
    Json(ProbeReport::from_components(Vec::new()))
}

/// Touches the key store and the draft store; 503 when either fails
pub async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    let components = vec![
        probe("api_key_storage", async {
            state.api_key_service.list(true).await.map(|_| ())
        })
        .await,
        probe("draft_store", async {
            let nobody = AdminId::generate();
            state.draft_store.list(&nobody).await.map(|_| ())
        })
        .await,
    ];

    let report = ProbeReport::from_components(components);
    (report.status_code(), Json(report))
}

pub async fn live_check() -> StatusCode {
    StatusCode::OK
}

async fn probe<F>(component: &'static str, check: F) -> ComponentProbe
where
    F: Future<Output = Result<(), DomainError>>,
{
    let started = Instant::now();
    let outcome = check.await;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    match outcome {
        Ok(()) => ComponentProbe {
            component,
            status: ProbeStatus::Up,
            elapsed_ms,
            detail: None,
        },
        Err(e) => {
            tracing::warn!(component, error = %e, "Readiness probe failed");
            ComponentProbe {
                component,
                status: ProbeStatus::Down,
                elapsed_ms,
                detail: Some(e.to_string()),
            }
        }
    }
}
