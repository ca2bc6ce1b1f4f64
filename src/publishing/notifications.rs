//! Notification contract.
//!
//! Delivery transports (email, chat, webhooks) live outside the core; the
//! publishing manager talks to a `NotificationSink` and keeps pending
//! notifications in the repository so a restart never loses one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    PrePublish,
    Published,
    Failed,
    Cancelled,
    Edited,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::PrePublish => "pre_publish",
            NotificationType::Published => "published",
            NotificationType::Failed => "failed",
            NotificationType::Cancelled => "cancelled",
            NotificationType::Edited => "edited",
        }
    }

    pub fn parse(s: &str) -> Option<NotificationType> {
        match s {
            "pre_publish" => Some(NotificationType::PrePublish),
            "published" => Some(NotificationType::Published),
            "failed" => Some(NotificationType::Failed),
            "cancelled" => Some(NotificationType::Cancelled),
            "edited" => Some(NotificationType::Edited),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEnvelope {
    pub schedule_id: String,
    pub notification_type: NotificationType,
    pub title: String,
    pub recipients: Vec<String>,
}

/// A notification registered for future delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingNotification {
    pub id: String,
    pub schedule_id: String,
    pub notification_type: NotificationType,
    pub send_at: DateTime<Utc>,
    pub title: String,
    pub recipients: Vec<String>,
    pub sent: bool,
}

impl PendingNotification {
    pub fn new(envelope: &NotificationEnvelope, send_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            schedule_id: envelope.schedule_id.clone(),
            notification_type: envelope.notification_type,
            send_at,
            title: envelope.title.clone(),
            recipients: envelope.recipients.clone(),
            sent: false,
        }
    }
}

#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver immediately.
    async fn send_notification(&self, envelope: &NotificationEnvelope) -> CoreResult<()>;

    /// Delegate future delivery to the transport; returns a handle.
    async fn schedule_notification(
        &self,
        envelope: &NotificationEnvelope,
        at: DateTime<Utc>,
    ) -> CoreResult<String>;
}
