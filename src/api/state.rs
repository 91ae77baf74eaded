//! Application state for shared services

use std::sync::Arc;

use crate::domain::quotation::DraftStore;
use crate::infrastructure::admin::AdminService;
use crate::infrastructure::api_key::ApiKeyService;
use crate::infrastructure::notification::NotificationDispatcher;

/// Services shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub api_key_service: Arc<ApiKeyService>,
    pub admin_service: Arc<AdminService>,
    pub draft_store: Arc<dyn DraftStore>,
    pub notification_dispatcher: Arc<NotificationDispatcher>,
}

impl AppState {
    pub fn new(
        api_key_service: Arc<ApiKeyService>,
        admin_service: Arc<AdminService>,
        draft_store: Arc<dyn DraftStore>,
        notification_dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            api_key_service,
            admin_service,
            draft_store,
            notification_dispatcher,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("draft_store", &self.draft_store)
            .field("notification_dispatcher", &self.notification_dispatcher)
            .finish_non_exhaustive()
    }
}
