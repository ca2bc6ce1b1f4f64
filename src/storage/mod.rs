//! Repository contracts.
//!
//! Narrow persistence seams for schedules, publishing state and decision
//! audits. Each write is atomic for its entity; reads observe the writer's
//! own preceding writes.

pub mod memory;
pub mod sqlite;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decision::engine::DecisionRecord;
use crate::error::CoreResult;
use crate::models::Platform;
use crate::publishing::notifications::PendingNotification;
use crate::scheduling::types::{ScheduleStatus, ScheduledContent};

/// Filter for schedule listings; `None` fields match everything
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleFilter {
    pub brand_id: Option<String>,
    pub status: Option<ScheduleStatus>,
    pub platform: Option<Platform>,
    pub campaign_id: Option<String>,
}

#[async_trait::async_trait]
pub trait SchedulingRepository: Send + Sync {
    async fn create(&self, schedule: &ScheduledContent) -> CoreResult<()>;

    async fn update(&self, schedule: &ScheduledContent) -> CoreResult<()>;

    async fn delete(&self, id: &str) -> CoreResult<()>;

    async fn get(&self, id: &str) -> CoreResult<Option<ScheduledContent>>;

    async fn list(&self, filter: &ScheduleFilter) -> CoreResult<Vec<ScheduledContent>>;

    /// Schedules for a brand inside [start, end), ordered by
    /// (scheduled_time, id).
    async fn list_in_range(
        &self,
        brand_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CoreResult<Vec<ScheduledContent>>;

    /// Non-terminal schedules of the brand sharing at least one platform,
    /// within ±window of `around`. Ordering must be deterministic:
    /// (scheduled_time, id).
    async fn list_conflicting(
        &self,
        brand_id: &str,
        platforms: &[Platform],
        around: DateTime<Utc>,
        window: chrono::Duration,
    ) -> CoreResult<Vec<ScheduledContent>>;

    /// Count of active (non-cancelled, non-failed) schedules for a brand and
    /// platform inside [start, end). Used for platform-limit enforcement.
    async fn count_for_platform(
        &self,
        brand_id: &str,
        platform: Platform,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CoreResult<u32>;
}

#[async_trait::async_trait]
pub trait PublishingRepository: Send + Sync {
    /// Atomic status transition; returns false when the current status is
    /// not `from` (another worker owns the schedule).
    async fn compare_and_set_status(
        &self,
        id: &str,
        from: ScheduleStatus,
        to: ScheduleStatus,
    ) -> CoreResult<bool>;

    /// Persist publishing-owned fields: status, retry_count,
    /// next_attempt_at, notifications_sent, failure_reason.
    async fn update_publish_state(&self, schedule: &ScheduledContent) -> CoreResult<()>;

    /// Bounded page of schedules due for publishing at `now`:
    /// status = scheduled, scheduled_time ≤ now, next_attempt_at ≤ now.
    async fn due_for_publishing(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> CoreResult<Vec<ScheduledContent>>;

    async fn register_notification(&self, notification: &PendingNotification) -> CoreResult<()>;

    /// Unsent notifications with send_at ≤ now, ordered by send_at.
    async fn due_notifications(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> CoreResult<Vec<PendingNotification>>;

    async fn mark_notification_sent(&self, id: &str) -> CoreResult<()>;
}

#[async_trait::async_trait]
pub trait DecisionRepository: Send + Sync {
    async fn record_decision(&self, record: &DecisionRecord) -> CoreResult<()>;

    async fn get_decision(&self, id: &str) -> CoreResult<Option<DecisionRecord>>;

    async fn list_recent(&self, limit: usize) -> CoreResult<Vec<DecisionRecord>>;
}
