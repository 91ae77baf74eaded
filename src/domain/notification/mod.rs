//! Notification domain - push and email messages handed to a delivery relay

mod entity;
mod sender;

pub use entity::{Notification, NotificationChannel};
pub use sender::{DeliveryReport, DeliveryStatus, NotificationSender, SendError};

#[cfg(test)]
pub use sender::MockNotificationSender;
