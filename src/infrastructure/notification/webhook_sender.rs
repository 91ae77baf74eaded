//! Notification sender that posts to an HTTP relay
//!
//! The relay fronts the actual push and email providers. Each request body
//! is the notification JSON, signed with HMAC-SHA256 when a secret is set.

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::{Client, StatusCode};
use sha2::Sha256;
use tracing::{debug, warn};

use crate::domain::notification::{Notification, NotificationSender, SendError};
use crate::domain::DomainError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying `sha256=<hex digest>` of the body
pub const SIGNATURE_HEADER: &str = "X-Signature";

/// Relay-backed sender
#[derive(Debug, Clone)]
pub struct WebhookNotificationSender {
    client: Client,
    relay_url: String,
    signing_secret: Option<String>,
}

impl WebhookNotificationSender {
    pub fn new(relay_url: impl Into<String>, timeout: Duration) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            relay_url: relay_url.into(),
            signing_secret: None,
        })
    }

    pub fn with_signing_secret(mut self, secret: impl Into<String>) -> Self {
        self.signing_secret = Some(secret.into());
        self
    }
}

/// HMAC-SHA256 of `payload`, hex encoded
pub fn sign_payload(secret: &str, payload: &[u8]) -> Result<String, SendError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| SendError::Permanent(format!("Invalid signing key: {}", e)))?;
    mac.update(payload);

    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn classify_status(status: StatusCode) -> Option<SendError> {
    if status.is_success() {
        None
    } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        Some(SendError::Retryable(format!("Relay responded with {}", status)))
    } else {
        Some(SendError::Permanent(format!("Relay responded with {}", status)))
    }
}

#[async_trait]
impl NotificationSender for WebhookNotificationSender {
    async fn send(&self, notification: &Notification) -> Result<(), SendError> {
        let payload = serde_json::to_vec(notification)
            .map_err(|e| SendError::Permanent(format!("Failed to serialize notification: {}", e)))?;

        let mut request = self
            .client
            .post(&self.relay_url)
            .header("Content-Type", "application/json")
            .header("X-Notification-Id", notification.id.as_str());

        if let Some(secret) = &self.signing_secret {
            let signature = sign_payload(secret, &payload)?;
            request = request.header(SIGNATURE_HEADER, format!("sha256={}", signature));
        }

        let response = request.body(payload).send().await.map_err(|e| {
            let message = if e.is_timeout() {
                "Request timed out".to_string()
            } else if e.is_connect() {
                "Connection failed".to_string()
            } else {
                format!("Request failed: {}", e)
            };
            warn!(notification_id = %notification.id, error = %message, "Relay request failed");
            SendError::Retryable(message)
        })?;

        match classify_status(response.status()) {
            None => {
                debug!(
                    notification_id = %notification.id,
                    channel = notification.channel.as_str(),
                    "Notification accepted by relay"
                );
                Ok(())
            }
            Some(err) => {
                warn!(notification_id = %notification.id, error = %err, "Relay rejected notification");
                Err(err)
            }
        }
    }
}
