//! Notification sender trait and delivery outcomes

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use super::entity::Notification;

#[cfg(test)]
use mockall::automock;

/// Failure of a single delivery attempt
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    /// Transient failure; the attempt may be repeated
    #[error("retryable delivery failure: {0}")]
    Retryable(String),

    /// The relay rejected the notification; repeating will not help
    #[error("permanent delivery failure: {0}")]
    Permanent(String),
}

impl SendError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }
}

/// Transport that hands a notification to its channel
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), SendError>;
}

/// Final state of a delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Delivered,
    Failed,
}

/// Outcome of dispatching one notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReport {
    pub notification_id: String,
    pub status: DeliveryStatus,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl DeliveryReport {
    pub fn is_delivered(&self) -> bool {
        self.status == DeliveryStatus::Delivered
    }
}
