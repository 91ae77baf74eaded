//! Notification dispatcher with bounded retry

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{info, warn};

use crate::domain::notification::{
    DeliveryReport, DeliveryStatus, Notification, NotificationSender, SendError,
};

/// Retry schedule for deliveries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry following failed attempt `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Delivers notifications through a sender, retrying transient failures
#[derive(Clone)]
pub struct NotificationDispatcher {
    sender: Arc<dyn NotificationSender>,
    policy: RetryPolicy,
}

impl fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("policy", &self.policy)
            .finish()
    }
}

impl NotificationDispatcher {
    pub fn new(sender: Arc<dyn NotificationSender>) -> Self {
        Self {
            sender,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Deliver one notification
    ///
    /// Retryable failures are repeated up to `max_attempts`; a permanent
    /// failure stops immediately. Invalid notifications are never sent.
    pub async fn dispatch(&self, notification: &Notification) -> DeliveryReport {
        if let Err(reason) = notification.validate() {
            warn!(notification_id = %notification.id, error = %reason, "Invalid notification");
            return failed(notification, 0, reason);
        }

        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.sender.send(notification).await {
                Ok(()) => {
                    info!(
                        notification_id = %notification.id,
                        attempts = attempt,
                        "Notification delivered"
                    );
                    return DeliveryReport {
                        notification_id: notification.id.clone(),
                        status: DeliveryStatus::Delivered,
                        attempts: attempt,
                        last_error: None,
                    };
                }
                Err(SendError::Retryable(reason)) if attempt < max_attempts => {
                    let delay = self.policy.delay_after(attempt);
                    warn!(
                        notification_id = %notification.id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %reason,
                        "Notification delivery failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    warn!(
                        notification_id = %notification.id,
                        attempts = attempt,
                        error = %err,
                        "Notification delivery failed"
                    );
                    return failed(notification, attempt, err.to_string());
                }
            }
        }
    }

    /// Deliver a batch concurrently, one report per notification in input order
    pub async fn dispatch_batch(&self, notifications: &[Notification]) -> Vec<DeliveryReport> {
        join_all(notifications.iter().map(|n| self.dispatch(n))).await
    }
}

fn failed(notification: &Notification, attempts: u32, error: String) -> DeliveryReport {
    DeliveryReport {
        notification_id: notification.id.clone(),
        status: DeliveryStatus::Failed,
        attempts,
        last_error: Some(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::notification::{MockNotificationSender, NotificationChannel};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    fn notification() -> Notification {
        Notification::new(NotificationChannel::Push, "device-token-1", "Order shipped", "On its way")
    }

    #[test]
    fn test_backoff_is_exponential_and_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
        };

        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
        assert_eq!(policy.delay_after(5), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(40), Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_delivered_first_try() {
        let mut sender = MockNotificationSender::new();
        sender.expect_send().times(1).returning(|_| Ok(()));

        let dispatcher = NotificationDispatcher::new(Arc::new(sender)).with_policy(fast_policy(3));
        let report = dispatcher.dispatch(&notification()).await;

        assert!(report.is_delivered());
        assert_eq!(report.attempts, 1);
        assert!(report.last_error.is_none());
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let mut sender = MockNotificationSender::new();
        let mut calls = 0;
        sender.expect_send().times(3).returning(move |_| {
            calls += 1;
            if calls < 3 {
                Err(SendError::Retryable("relay unavailable".to_string()))
            } else {
                Ok(())
            }
        });

        let dispatcher = NotificationDispatcher::new(Arc::new(sender)).with_policy(fast_policy(5));
        let report = dispatcher.dispatch(&notification()).await;

        assert!(report.is_delivered());
        assert_eq!(report.attempts, 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let mut sender = MockNotificationSender::new();
        sender
            .expect_send()
            .times(3)
            .returning(|_| Err(SendError::Retryable("timeout".to_string())));

        let dispatcher = NotificationDispatcher::new(Arc::new(sender)).with_policy(fast_policy(3));
        let report = dispatcher.dispatch(&notification()).await;

        assert_eq!(report.status, DeliveryStatus::Failed);
        assert_eq!(report.attempts, 3);
        assert!(report.last_error.unwrap().contains("timeout"));
    }

    #[tokio::test]
    async fn test_permanent_failure_stops_immediately() {
        let mut sender = MockNotificationSender::new();
        sender
            .expect_send()
            .times(1)
            .returning(|_| Err(SendError::Permanent("unknown device token".to_string())));

        let dispatcher = NotificationDispatcher::new(Arc::new(sender)).with_policy(fast_policy(5));
        let report = dispatcher.dispatch(&notification()).await;

        assert_eq!(report.status, DeliveryStatus::Failed);
        assert_eq!(report.attempts, 1);
    }

    #[tokio::test]
    async fn test_invalid_notification_is_not_sent() {
        let mut sender = MockNotificationSender::new();
        sender.expect_send().never();

        let dispatcher = NotificationDispatcher::new(Arc::new(sender));
        let invalid = Notification::new(NotificationChannel::Email, "not-an-address", "Hi", "There");
        let report = dispatcher.dispatch(&invalid).await;

        assert_eq!(report.status, DeliveryStatus::Failed);
        assert_eq!(report.attempts, 0);
    }

    #[tokio::test]
    async fn test_batch_reports_in_order() {
        let mut sender = MockNotificationSender::new();
        sender.expect_send().returning(|n| {
            if n.recipient == "bad-token" {
                Err(SendError::Permanent("rejected".to_string()))
            } else {
                Ok(())
            }
        });

        let dispatcher = NotificationDispatcher::new(Arc::new(sender)).with_policy(fast_policy(2));
        let batch = vec![
            Notification::new(NotificationChannel::Push, "good-token", "A", "a"),
            Notification::new(NotificationChannel::Push, "bad-token", "B", "b"),
        ];

        let reports = dispatcher.dispatch_batch(&batch).await;

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].notification_id, batch[0].id);
        assert!(reports[0].is_delivered());
        assert!(!reports[1].is_delivered());
    }
}
