//! Notification delivery: relay and logging senders plus the retrying dispatcher

mod dispatcher;
mod logging_sender;
mod webhook_sender;

pub use dispatcher::{NotificationDispatcher, RetryPolicy};
pub use logging_sender::LoggingNotificationSender;
pub use webhook_sender::{sign_payload, WebhookNotificationSender, SIGNATURE_HEADER};
