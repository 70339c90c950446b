//! Fire-and-forget notification sink
//!
//! Delivery failures are logged and never reach the caller.

use serde::Serialize;
use tracing::{info, warn};

/// Recipient used for events addressed to the unassigned provider pool
pub const PROVIDER_POOL: &str = "providers";

/// Kinds of events the service emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
    JobCreated,
    JobAccepted,
    PaymentReleased,
    ContributionVerified,
    ContributionRejected,
}

impl NotificationEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationEvent::JobCreated => "job_created",
            NotificationEvent::JobAccepted => "job_accepted",
            NotificationEvent::PaymentReleased => "payment_released",
            NotificationEvent::ContributionVerified => "contribution_verified",
            NotificationEvent::ContributionRejected => "contribution_rejected",
        }
    }
}

/// Sink accepting `(recipient, event, message)` without awaiting delivery
pub trait Notifier: Send + Sync {
    fn notify(&self, recipient: &str, event: NotificationEvent, message: &str);
}

/// Writes notifications to the log
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, recipient: &str, event: NotificationEvent, message: &str) {
        info!(
            recipient,
            event = event.as_str(),
            "[notify] {}",
            message
        );
    }
}

#[derive(Debug, Serialize)]
struct NotificationPayload<'a> {
    recipient_id: &'a str,
    event_type: NotificationEvent,
    message: &'a str,
}

/// POSTs notifications to an HTTP endpoint on a background task
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
    url: String,
}

impl HttpNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

impl Notifier for HttpNotifier {
    fn notify(&self, recipient: &str, event: NotificationEvent, message: &str) {
        let body = match serde_json::to_value(NotificationPayload {
            recipient_id: recipient,
            event_type: event,
            message,
        }) {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to encode notification: {}", e);
                return;
            }
        };

        let client = self.client.clone();
        let url = self.url.clone();
        tokio::spawn(async move {
            match client.post(&url).json(&body).send().await {
                Ok(resp) if resp.status().is_success() => {}
                Ok(resp) => warn!("Notification endpoint answered {}", resp.status()),
                Err(e) => warn!("Failed to deliver notification: {}", e),
            }
        });
    }
}
