//! Sender used when no relay is configured

use async_trait::async_trait;
use tracing::info;

use crate::domain::notification::{Notification, NotificationSender, SendError};

/// Logs notifications instead of delivering them
#[derive(Debug, Clone, Default)]
pub struct LoggingNotificationSender;

impl LoggingNotificationSender {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSender for LoggingNotificationSender {
    async fn send(&self, notification: &Notification) -> Result<(), SendError> {
        info!(
            notification_id = %notification.id,
            channel = notification.channel.as_str(),
            title = %notification.title,
            "Notification logged (no relay configured)"
        );
        Ok(())
    }
}
