//! In-memory repositories.
//!
//! Default store for tests and single-process runs. State lives in
//! parking_lot-guarded maps; no lock is held across an await.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

use crate::decision::engine::DecisionRecord;
use crate::error::{CoreError, CoreResult};
use crate::models::Platform;
use crate::publishing::notifications::PendingNotification;
use crate::scheduling::types::{ScheduleStatus, ScheduledContent};
use crate::storage::{
    DecisionRepository, PublishingRepository, ScheduleFilter, SchedulingRepository,
};

#[derive(Default)]
pub struct MemoryStore {
    schedules: RwLock<HashMap<String, ScheduledContent>>,
    notifications: RwLock<HashMap<String, PendingNotification>>,
    decisions: RwLock<Vec<DecisionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted_by_time(mut rows: Vec<ScheduledContent>) -> Vec<ScheduledContent> {
        rows.sort_by(|a, b| {
            a.scheduled_time
                .cmp(&b.scheduled_time)
                .then_with(|| a.id.cmp(&b.id))
        });
        rows
    }
}

#[async_trait::async_trait]
impl SchedulingRepository for MemoryStore {
    async fn create(&self, schedule: &ScheduledContent) -> CoreResult<()> {
        let mut schedules = self.schedules.write();
        if schedules.contains_key(&schedule.id) {
            return Err(CoreError::Storage(format!(
                "schedule {} already exists",
                schedule.id
            )));
        }
        schedules.insert(schedule.id.clone(), schedule.clone());
        Ok(())
    }

    async fn update(&self, schedule: &ScheduledContent) -> CoreResult<()> {
        let mut schedules = self.schedules.write();
        if !schedules.contains_key(&schedule.id) {
            return Err(CoreError::not_found("schedule", &schedule.id));
        }
        schedules.insert(schedule.id.clone(), schedule.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        self.schedules
            .write()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| CoreError::not_found("schedule", id))
    }

    async fn get(&self, id: &str) -> CoreResult<Option<ScheduledContent>> {
        Ok(self.schedules.read().get(id).cloned())
    }

    async fn list(&self, filter: &ScheduleFilter) -> CoreResult<Vec<ScheduledContent>> {
        let rows: Vec<ScheduledContent> = self
            .schedules
            .read()
            .values()
            .filter(|s| {
                filter
                    .brand_id
                    .as_ref()
                    .map(|b| &s.brand_id == b)
                    .unwrap_or(true)
                    && filter.status.map(|st| s.status == st).unwrap_or(true)
                    && filter
                        .platform
                        .map(|p| s.platforms.contains(&p))
                        .unwrap_or(true)
                    && filter
                        .campaign_id
                        .as_ref()
                        .map(|c| s.campaign_id.as_ref() == Some(c))
                        .unwrap_or(true)
            })
            .cloned()
            .collect();
        Ok(Self::sorted_by_time(rows))
    }

    async fn list_in_range(
        &self,
        brand_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CoreResult<Vec<ScheduledContent>> {
        let rows: Vec<ScheduledContent> = self
            .schedules
            .read()
            .values()
            .filter(|s| {
                s.brand_id == brand_id && s.scheduled_time >= start && s.scheduled_time < end
            })
            .cloned()
            .collect();
        Ok(Self::sorted_by_time(rows))
    }

    async fn list_conflicting(
        &self,
        brand_id: &str,
        platforms: &[Platform],
        around: DateTime<Utc>,
        window: Duration,
    ) -> CoreResult<Vec<ScheduledContent>> {
        let start = around - window;
        let end = around + window;
        let rows: Vec<ScheduledContent> = self
            .schedules
            .read()
            .values()
            .filter(|s| {
                s.brand_id == brand_id
                    && !s.status.is_terminal()
                    && s.status != ScheduleStatus::Failed
                    && s.scheduled_time >= start
                    && s.scheduled_time <= end
                    && s.platforms.iter().any(|p| platforms.contains(p))
            })
            .cloned()
            .collect();
        Ok(Self::sorted_by_time(rows))
    }

    async fn count_for_platform(
        &self,
        brand_id: &str,
        platform: Platform,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CoreResult<u32> {
        let count = self
            .schedules
            .read()
            .values()
            .filter(|s| {
                s.brand_id == brand_id
                    && s.platforms.contains(&platform)
                    && s.scheduled_time >= start
                    && s.scheduled_time < end
                    && !matches!(s.status, ScheduleStatus::Cancelled | ScheduleStatus::Failed)
            })
            .count();
        Ok(count as u32)
    }
}

#[async_trait::async_trait]
impl PublishingRepository for MemoryStore {
    async fn compare_and_set_status(
        &self,
        id: &str,
        from: ScheduleStatus,
        to: ScheduleStatus,
    ) -> CoreResult<bool> {
        let mut schedules = self.schedules.write();
        let schedule = schedules
            .get_mut(id)
            .ok_or_else(|| CoreError::not_found("schedule", id))?;
        if schedule.status != from {
            return Ok(false);
        }
        schedule.status = to;
        Ok(true)
    }

    async fn update_publish_state(&self, schedule: &ScheduledContent) -> CoreResult<()> {
        let mut schedules = self.schedules.write();
        let stored = schedules
            .get_mut(&schedule.id)
            .ok_or_else(|| CoreError::not_found("schedule", &schedule.id))?;
        stored.status = schedule.status;
        stored.retry_count = schedule.retry_count;
        stored.next_attempt_at = schedule.next_attempt_at;
        stored.notifications_sent = schedule.notifications_sent.clone();
        stored.failure_reason = schedule.failure_reason.clone();
        stored.updated_at = schedule.updated_at;
        Ok(())
    }

    async fn due_for_publishing(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> CoreResult<Vec<ScheduledContent>> {
        let rows: Vec<ScheduledContent> = self
            .schedules
            .read()
            .values()
            .filter(|s| {
                s.status == ScheduleStatus::Scheduled
                    && s.scheduled_time <= now
                    && s.next_attempt_at.map(|t| t <= now).unwrap_or(true)
            })
            .cloned()
            .collect();
        Ok(Self::sorted_by_time(rows).into_iter().take(limit).collect())
    }

    async fn register_notification(&self, notification: &PendingNotification) -> CoreResult<()> {
        self.notifications
            .write()
            .insert(notification.id.clone(), notification.clone());
        Ok(())
    }

    async fn due_notifications(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> CoreResult<Vec<PendingNotification>> {
        let mut rows: Vec<PendingNotification> = self
            .notifications
            .read()
            .values()
            .filter(|n| !n.sent && n.send_at <= now)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.send_at.cmp(&b.send_at).then_with(|| a.id.cmp(&b.id)));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn mark_notification_sent(&self, id: &str) -> CoreResult<()> {
        let mut notifications = self.notifications.write();
        let notification = notifications
            .get_mut(id)
            .ok_or_else(|| CoreError::not_found("notification", id))?;
        notification.sent = true;
        Ok(())
    }
}

#[async_trait::async_trait]
impl DecisionRepository for MemoryStore {
    async fn record_decision(&self, record: &DecisionRecord) -> CoreResult<()> {
        self.decisions.write().push(record.clone());
        Ok(())
    }

    async fn get_decision(&self, id: &str) -> CoreResult<Option<DecisionRecord>> {
        Ok(self
            .decisions
            .read()
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn list_recent(&self, limit: usize) -> CoreResult<Vec<DecisionRecord>> {
        let decisions = self.decisions.read();
        Ok(decisions.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::types::{ContentType, SchedulePriority};

    fn schedule(id: &str, brand: &str, at: DateTime<Utc>) -> ScheduledContent {
        ScheduledContent {
            id: id.to_string(),
            brand_id: brand.to_string(),
            content_id: None,
            title: format!("post {id}"),
            content: "body".to_string(),
            platforms: vec![Platform::Instagram],
            content_type: ContentType::Post,
            scheduled_time: at,
            timezone: "UTC".to_string(),
            status: ScheduleStatus::Scheduled,
            priority: SchedulePriority::Normal,
            campaign_id: None,
            tags: vec![],
            created_by: "tester".to_string(),
            created_at: at,
            updated_at: at,
            retry_count: 0,
            max_retries: 3,
            next_attempt_at: None,
            notifications_sent: vec![],
            failure_reason: None,
        }
    }

    #[tokio::test]
    async fn conflicting_listing_is_deterministically_ordered() {
        let store = MemoryStore::new();
        let base = Utc::now();
        // Same timestamp: order must fall back to id
        store.create(&schedule("b", "brand", base)).await.unwrap();
        store.create(&schedule("a", "brand", base)).await.unwrap();
        store
            .create(&schedule("c", "brand", base + Duration::minutes(5)))
            .await
            .unwrap();

        let rows = store
            .list_conflicting("brand", &[Platform::Instagram], base, Duration::minutes(30))
            .await
            .unwrap();
        let ids: Vec<&str> = rows.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn cas_claims_exactly_once() {
        let store = MemoryStore::new();
        let base = Utc::now();
        store.create(&schedule("s1", "brand", base)).await.unwrap();

        let first = store
            .compare_and_set_status("s1", ScheduleStatus::Scheduled, ScheduleStatus::Publishing)
            .await
            .unwrap();
        let second = store
            .compare_and_set_status("s1", ScheduleStatus::Scheduled, ScheduleStatus::Publishing)
            .await
            .unwrap();
        assert!(first);
        assert!(!second);
    }

    #[tokio::test]
    async fn due_query_respects_next_attempt() {
        let store = MemoryStore::new();
        let base = Utc::now();
        let mut row = schedule("s1", "brand", base - Duration::minutes(5));
        row.next_attempt_at = Some(base + Duration::minutes(10));
        store.create(&row).await.unwrap();

        assert!(store.due_for_publishing(base, 10).await.unwrap().is_empty());
        let later = base + Duration::minutes(11);
        assert_eq!(store.due_for_publishing(later, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn notifications_round_trip() {
        use crate::publishing::notifications::{
            NotificationEnvelope, NotificationType, PendingNotification,
        };
        let store = MemoryStore::new();
        let base = Utc::now();
        let envelope = NotificationEnvelope {
            schedule_id: "s1".to_string(),
            notification_type: NotificationType::PrePublish,
            title: "going out soon".to_string(),
            recipients: vec!["ops".to_string()],
        };
        let pending = PendingNotification::new(&envelope, base - Duration::minutes(1));
        store.register_notification(&pending).await.unwrap();

        let due = store.due_notifications(base, 10).await.unwrap();
        assert_eq!(due.len(), 1);
        store.mark_notification_sent(&due[0].id).await.unwrap();
        assert!(store.due_notifications(base, 10).await.unwrap().is_empty());
    }
}
