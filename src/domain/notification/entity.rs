//! Notification entity

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delivery channel of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    /// Mobile push; the recipient is a device token
    Push,
    /// The recipient is an email address
    Email,
}

impl NotificationChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Email => "email",
        }
    }
}

/// A message to deliver to one recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub channel: NotificationChannel,
    pub recipient: String,
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
}

impl Notification {
    pub fn new(
        channel: NotificationChannel,
        recipient: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            channel,
            recipient: recipient.into(),
            title: title.into(),
            body: body.into(),
            data: BTreeMap::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Check the fields a relay needs before it can deliver
    pub fn validate(&self) -> Result<(), String> {
        if self.recipient.trim().is_empty() {
            return Err("Recipient cannot be empty".to_string());
        }

        if self.channel == NotificationChannel::Email && !self.recipient.contains('@') {
            return Err(format!("'{}' is not an email address", self.recipient));
        }

        if self.title.trim().is_empty() && self.body.trim().is_empty() {
            return Err("Title and body cannot both be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        let ok = Notification::new(NotificationChannel::Email, "buyer@acme.example", "Quote", "Ready");
        assert!(ok.validate().is_ok());

        let bad_email = Notification::new(NotificationChannel::Email, "device-token", "Quote", "");
        assert!(bad_email.validate().is_err());

        let empty = Notification::new(NotificationChannel::Push, "token-1", " ", "");
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_serialization() {
        let notification = Notification::new(NotificationChannel::Push, "token-1", "Hi", "There")
            .with_data("quotationId", "q-1");
        let json = serde_json::to_value(&notification).unwrap();

        assert_eq!(json["channel"], "push");
        assert_eq!(json["data"]["quotationId"], "q-1");
    }
}
