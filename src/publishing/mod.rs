//! Due-time publishing with retry and notifications.

pub mod backoff;
pub mod manager;
pub mod notifications;

pub use manager::{PlatformPublisher, PublishingManager};
pub use notifications::{NotificationEnvelope, NotificationSink, NotificationType};
