//! Scheduling engine.
//!
//! Owns `ScheduledContent` end to end: creation with conflict and limit
//! checks, bulk distribution, guarded edits and cancellation, calendar
//! views and optimal-time suggestions. The publishing manager only ever
//! touches publish-state fields.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Timelike, Utc};
use uuid::Uuid;

use crate::clock::SharedClock;
use crate::config::PlatformLimitsConfig;
use crate::error::{CoreError, CoreResult};
use crate::models::Platform;
use crate::publishing::notifications::{
    NotificationEnvelope, NotificationType, PendingNotification,
};
use crate::scheduling::calendar::{parse_timezone, view_bounds};
use crate::scheduling::conflicts::{detect_conflicts, LimitUsage, SIMILARITY_WINDOW_DAYS};
use crate::scheduling::optimal::OptimalTimingService;
use crate::scheduling::types::{
    BulkItemFailure, BulkSchedulingOutcome, BulkSchedulingRequest, CalendarView, CalendarViewType,
    ConflictSeverity, ConflictType, ContentType, DistributionStrategy, OptimalPostingTime,
    PlatformUsage, SchedulePriority, ScheduleStatus, ScheduledContent, SchedulingConflict,
    SchedulingRequest,
};
use crate::storage::{PublishingRepository, SchedulingRepository};

/// Edits are frozen this close to the publish slot
const EDIT_FREEZE_MINUTES: i64 = 5;
/// Conflicting-set query window around the candidate slot
const NEAR_WINDOW_HOURS: i64 = 2;
/// Optimal slots surfaced on a calendar view
const CALENDAR_SUGGESTIONS: usize = 5;

/// Partial update for an existing schedule; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct ScheduleUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub platforms: Option<Vec<Platform>>,
    pub tags: Option<Vec<String>>,
    pub priority: Option<SchedulePriority>,
}

pub struct SchedulingEngine {
    repo: Arc<dyn SchedulingRepository>,
    publishing: Arc<dyn PublishingRepository>,
    timing: Arc<dyn OptimalTimingService>,
    limits: PlatformLimitsConfig,
    default_max_retries: u32,
    clock: SharedClock,
}

impl SchedulingEngine {
    pub fn new(
        repo: Arc<dyn SchedulingRepository>,
        publishing: Arc<dyn PublishingRepository>,
        timing: Arc<dyn OptimalTimingService>,
        limits: PlatformLimitsConfig,
        default_max_retries: u32,
        clock: SharedClock,
    ) -> Self {
        Self {
            repo,
            publishing,
            timing,
            limits,
            default_max_retries,
            clock,
        }
    }

    /// Create one schedule.
    pub async fn schedule_content(
        &self,
        request: SchedulingRequest,
    ) -> CoreResult<ScheduledContent> {
        let now = self.clock.now();
        self.validate_request(&request, now)?;

        let candidate = self.build_schedule(&request, now);
        let conflicts = self.detect_for(&candidate).await?;

        // Platform limits bind even when the caller allows conflicts
        if let Some(limit) = conflicts
            .iter()
            .find(|c| c.conflict_type == ConflictType::PlatformLimit)
        {
            return Err(CoreError::Conflict(limit.description.clone()));
        }
        if !request.allow_conflicts {
            if let Some(high) = conflicts
                .iter()
                .find(|c| c.severity == ConflictSeverity::High)
            {
                return Err(CoreError::Conflict(format!(
                    "{}: {}",
                    high.conflict_type.as_str(),
                    high.description
                )));
            }
        }

        self.repo.create(&candidate).await?;
        tracing::info!(
            schedule_id = %candidate.id,
            brand = %candidate.brand_id,
            at = %candidate.scheduled_time,
            "content scheduled"
        );

        if let Some(minutes) = request.pre_publish_minutes {
            let send_at = candidate.scheduled_time - Duration::minutes(minutes);
            // Only register reminders that are still in the future
            if send_at > now {
                let envelope = NotificationEnvelope {
                    schedule_id: candidate.id.clone(),
                    notification_type: NotificationType::PrePublish,
                    title: format!("'{}' publishes in {minutes} minutes", candidate.title),
                    recipients: vec![candidate.created_by.clone()],
                };
                self.publishing
                    .register_notification(&PendingNotification::new(&envelope, send_at))
                    .await?;
            }
        }

        Ok(candidate)
    }

    /// Bulk scheduling with per-item error partitioning.
    pub async fn bulk_schedule_content(
        &self,
        bulk: BulkSchedulingRequest,
    ) -> CoreResult<BulkSchedulingOutcome> {
        if bulk.requests.is_empty() {
            return Ok(BulkSchedulingOutcome {
                scheduled: Vec::new(),
                conflicts: Vec::new(),
                failed: Vec::new(),
            });
        }
        if bulk.window_end <= bulk.window_start {
            return Err(CoreError::Validation(
                "bulk window must be non-empty".into(),
            ));
        }

        let times = self.distribution_times(&bulk).await?;

        let mut outcome = BulkSchedulingOutcome {
            scheduled: Vec::new(),
            conflicts: Vec::new(),
            failed: Vec::new(),
        };
        for (index, request) in bulk.requests.iter().enumerate() {
            let mut item = request.clone();
            item.scheduled_time = times[index];
            match self.schedule_content(item).await {
                Ok(schedule) => outcome.scheduled.push(schedule),
                Err(CoreError::Conflict(reason)) => outcome.conflicts.push(BulkItemFailure {
                    index,
                    title: request.title.clone(),
                    reason,
                }),
                Err(err) => outcome.failed.push(BulkItemFailure {
                    index,
                    title: request.title.clone(),
                    reason: err.to_string(),
                }),
            }
        }
        Ok(outcome)
    }

    /// Guarded partial update.
    pub async fn update_scheduled_content(
        &self,
        id: &str,
        update: ScheduleUpdate,
    ) -> CoreResult<ScheduledContent> {
        let now = self.clock.now();
        let mut schedule = self
            .repo
            .get(id)
            .await?
            .ok_or_else(|| CoreError::not_found("schedule", id))?;

        match schedule.status {
            ScheduleStatus::Publishing | ScheduleStatus::Published => {
                return Err(CoreError::State(format!(
                    "cannot edit a {} schedule",
                    schedule.status.as_str()
                )));
            }
            ScheduleStatus::Cancelled => {
                return Err(CoreError::State("cannot edit a cancelled schedule".into()));
            }
            _ => {}
        }
        if schedule.scheduled_time - now < Duration::minutes(EDIT_FREEZE_MINUTES) {
            return Err(CoreError::State(format!(
                "schedule publishes in under {EDIT_FREEZE_MINUTES} minutes"
            )));
        }

        let time_changed = update
            .scheduled_time
            .map(|t| t != schedule.scheduled_time)
            .unwrap_or(false);
        let platforms_changed = update
            .platforms
            .as_ref()
            .map(|p| *p != schedule.platforms)
            .unwrap_or(false);

        if let Some(title) = update.title {
            schedule.title = title;
        }
        if let Some(content) = update.content {
            schedule.content = content;
        }
        if let Some(time) = update.scheduled_time {
            if time <= now {
                return Err(CoreError::Validation(
                    "new scheduled time must be in the future".into(),
                ));
            }
            schedule.scheduled_time = time;
        }
        if let Some(platforms) = update.platforms {
            if platforms.is_empty() {
                return Err(CoreError::Validation(
                    "a schedule needs at least one platform".into(),
                ));
            }
            schedule.platforms = platforms;
        }
        if let Some(tags) = update.tags {
            schedule.tags = tags;
        }
        if let Some(priority) = update.priority {
            schedule.priority = priority;
        }

        if time_changed || platforms_changed {
            let conflicts = self.detect_for(&schedule).await?;
            if let Some(high) = conflicts
                .iter()
                .find(|c| c.severity == ConflictSeverity::High)
            {
                return Err(CoreError::Conflict(format!(
                    "{}: {}",
                    high.conflict_type.as_str(),
                    high.description
                )));
            }
        }

        schedule.updated_at = now;
        self.repo.update(&schedule).await?;

        let envelope = NotificationEnvelope {
            schedule_id: schedule.id.clone(),
            notification_type: NotificationType::Edited,
            title: format!("'{}' was edited", schedule.title),
            recipients: vec![schedule.created_by.clone()],
        };
        self.publishing
            .register_notification(&PendingNotification::new(&envelope, now))
            .await?;

        Ok(schedule)
    }

    /// Cancel a schedule that has not started publishing.
    pub async fn cancel_scheduled_content(&self, id: &str, reason: &str) -> CoreResult<()> {
        let now = self.clock.now();
        let mut schedule = self
            .repo
            .get(id)
            .await?
            .ok_or_else(|| CoreError::not_found("schedule", id))?;

        if matches!(
            schedule.status,
            ScheduleStatus::Published | ScheduleStatus::Cancelled | ScheduleStatus::Publishing
        ) {
            return Err(CoreError::State(format!(
                "cannot cancel a {} schedule",
                schedule.status.as_str()
            )));
        }

        schedule.status = ScheduleStatus::Cancelled;
        schedule.updated_at = now;
        self.repo.update(&schedule).await?;
        tracing::info!(schedule_id = %schedule.id, reason, "schedule cancelled");

        let envelope = NotificationEnvelope {
            schedule_id: schedule.id.clone(),
            notification_type: NotificationType::Cancelled,
            title: format!("'{}' cancelled: {reason}", schedule.title),
            recipients: vec![schedule.created_by.clone()],
        };
        self.publishing
            .register_notification(&PendingNotification::new(&envelope, now))
            .await?;
        Ok(())
    }

    /// Aggregated calendar view for a brand.
    pub async fn get_calendar_view(
        &self,
        brand_id: &str,
        view_type: CalendarViewType,
        start: DateTime<Utc>,
        timezone: &str,
    ) -> CoreResult<CalendarView> {
        let (start, end) = view_bounds(view_type, start, timezone)?;
        let schedules = self.repo.list_in_range(brand_id, start, end).await?;

        // Pairwise conflicts inside the view, deduplicated across mirrored pairs
        let mut seen: HashSet<String> = HashSet::new();
        let mut conflicts: Vec<SchedulingConflict> = Vec::new();
        for schedule in &schedules {
            for conflict in detect_conflicts(schedule, &schedules, &schedules, &[], &self.limits) {
                let mut ids = conflict.conflicting_schedule_ids.clone();
                ids.push(schedule.id.clone());
                ids.sort();
                let key = format!("{}:{}", conflict.conflict_type.as_str(), ids.join(","));
                if seen.insert(key) {
                    conflicts.push(conflict);
                }
            }
        }

        let platforms: Vec<Platform> = Platform::ALL
            .iter()
            .copied()
            .filter(|p| self.limits.limits.contains_key(p))
            .collect();
        let optimal_times = self
            .timing
            .suggest(
                brand_id,
                &platforms,
                ContentType::Post,
                start,
                end,
                CALENDAR_SUGGESTIONS,
            )
            .await?;

        let day_start = start
            .with_hour(0)
            .and_then(|t| t.with_minute(0))
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(start);
        let mut platform_usage = Vec::new();
        for platform in &platforms {
            let limit = self.limits.limit(*platform);
            let scheduled_today = self
                .repo
                .count_for_platform(brand_id, *platform, day_start, day_start + Duration::days(1))
                .await?;
            platform_usage.push(PlatformUsage {
                platform: *platform,
                scheduled_today,
                daily_limit: limit.daily_limit,
                hourly_limit: limit.hourly_limit,
            });
        }

        Ok(CalendarView {
            brand_id: brand_id.to_string(),
            view_type,
            timezone: timezone.to_string(),
            start_date: start,
            end_date: end,
            schedules,
            conflicts,
            optimal_times,
            platform_usage,
        })
    }

    /// Deterministic conflict check for a schedule as it stands.
    pub async fn check_scheduling_conflicts(
        &self,
        schedule: &ScheduledContent,
    ) -> CoreResult<Vec<SchedulingConflict>> {
        self.detect_for(schedule).await
    }

    pub async fn suggest_optimal_times(
        &self,
        brand_id: &str,
        platforms: &[Platform],
        content_type: ContentType,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
        count: usize,
    ) -> CoreResult<Vec<OptimalPostingTime>> {
        self.timing
            .suggest(brand_id, platforms, content_type, range_start, range_end, count)
            .await
    }

    pub async fn get_schedule(&self, id: &str) -> CoreResult<ScheduledContent> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| CoreError::not_found("schedule", id))
    }

    // -- internals ----------------------------------------------------------

    fn validate_request(&self, request: &SchedulingRequest, now: DateTime<Utc>) -> CoreResult<()> {
        if request.brand_id.trim().is_empty() {
            return Err(CoreError::Validation("brand_id is required".into()));
        }
        if request.title.trim().is_empty() {
            return Err(CoreError::Validation("title is required".into()));
        }
        if request.platforms.is_empty() {
            return Err(CoreError::Validation(
                "at least one platform is required".into(),
            ));
        }
        parse_timezone(&request.timezone)?;
        if request.scheduled_time <= now {
            return Err(CoreError::Validation(format!(
                "scheduled time {} is not in the future",
                request.scheduled_time
            )));
        }
        Ok(())
    }

    fn build_schedule(&self, request: &SchedulingRequest, now: DateTime<Utc>) -> ScheduledContent {
        ScheduledContent {
            id: Uuid::new_v4().to_string(),
            brand_id: request.brand_id.clone(),
            content_id: request.content_id.clone(),
            title: request.title.clone(),
            content: request.content.clone(),
            platforms: request.platforms.clone(),
            content_type: request.content_type,
            scheduled_time: request.scheduled_time,
            timezone: request.timezone.clone(),
            status: ScheduleStatus::Scheduled,
            priority: request.priority,
            campaign_id: request.campaign_id.clone(),
            tags: request.tags.clone(),
            created_by: request.created_by.clone(),
            created_at: now,
            updated_at: now,
            retry_count: 0,
            max_retries: request.max_retries.unwrap_or(self.default_max_retries),
            next_attempt_at: None,
            notifications_sent: Vec::new(),
            failure_reason: None,
        }
    }

    async fn detect_for(&self, candidate: &ScheduledContent) -> CoreResult<Vec<SchedulingConflict>> {
        let near = self
            .repo
            .list_conflicting(
                &candidate.brand_id,
                &candidate.platforms,
                candidate.scheduled_time,
                Duration::hours(NEAR_WINDOW_HOURS),
            )
            .await?;
        let week = self
            .repo
            .list_in_range(
                &candidate.brand_id,
                candidate.scheduled_time - Duration::days(SIMILARITY_WINDOW_DAYS),
                candidate.scheduled_time + Duration::days(SIMILARITY_WINDOW_DAYS),
            )
            .await?;
        let usage = self.limit_usage(candidate).await?;
        Ok(detect_conflicts(
            candidate,
            &near,
            &week,
            &usage,
            &self.limits,
        ))
    }

    /// Per-platform counts at the candidate's slot, with the next free slot
    /// for the suggested resolution.
    async fn limit_usage(&self, candidate: &ScheduledContent) -> CoreResult<Vec<LimitUsage>> {
        let slot = candidate.scheduled_time;
        let day_start = slot
            .with_hour(0)
            .and_then(|t| t.with_minute(0))
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(slot);
        let hour_start = slot
            .with_minute(0)
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(slot);

        let mut usage = Vec::with_capacity(candidate.platforms.len());
        for platform in &candidate.platforms {
            let daily_count = self
                .repo
                .count_for_platform(
                    &candidate.brand_id,
                    *platform,
                    day_start,
                    day_start + Duration::days(1),
                )
                .await?;
            let hourly_count = self
                .repo
                .count_for_platform(
                    &candidate.brand_id,
                    *platform,
                    hour_start,
                    hour_start + Duration::hours(1),
                )
                .await?;
            let limit = self.limits.limit(*platform);
            let next_available = if daily_count >= limit.daily_limit {
                day_start + Duration::days(1)
            } else {
                hour_start + Duration::hours(1)
            };
            usage.push(LimitUsage {
                platform: *platform,
                daily_count,
                hourly_count,
                next_available,
            });
        }
        Ok(usage)
    }

    async fn distribution_times(
        &self,
        bulk: &BulkSchedulingRequest,
    ) -> CoreResult<Vec<DateTime<Utc>>> {
        let n = bulk.requests.len();
        match bulk.strategy {
            DistributionStrategy::Custom => {
                Ok(bulk.requests.iter().map(|r| r.scheduled_time).collect())
            }
            DistributionStrategy::Even => {
                let total_ms = (bulk.window_end - bulk.window_start).num_milliseconds();
                Ok((0..n)
                    .map(|i| {
                        bulk.window_start
                            + Duration::milliseconds(total_ms * i as i64 / n as i64)
                    })
                    .collect())
            }
            DistributionStrategy::Optimal => {
                let platforms: Vec<Platform> = {
                    let mut set: Vec<Platform> = bulk
                        .requests
                        .iter()
                        .flat_map(|r| r.platforms.iter().copied())
                        .collect::<HashSet<_>>()
                        .into_iter()
                        .collect();
                    set.sort_by_key(|p| p.as_str());
                    set
                };
                let suggestions = self
                    .timing
                    .suggest(
                        &bulk.requests[0].brand_id,
                        &platforms,
                        bulk.requests[0].content_type,
                        bulk.window_start,
                        bulk.window_end,
                        n,
                    )
                    .await?;
                // Pair suggestion i with input i; fall back to even spacing
                // when the service returns fewer slots than inputs
                let total_ms = (bulk.window_end - bulk.window_start).num_milliseconds();
                Ok((0..n)
                    .map(|i| {
                        suggestions.get(i).map(|s| s.time).unwrap_or_else(|| {
                            bulk.window_start
                                + Duration::milliseconds(total_ms * i as i64 / n as i64)
                        })
                    })
                    .collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::scheduling::optimal::HeuristicTimingService;
    use crate::storage::memory::MemoryStore;
    use chrono::TimeZone;

    struct Harness {
        engine: SchedulingEngine,
        store: Arc<MemoryStore>,
        clock: ManualClock,
        now: DateTime<Utc>,
    }

    fn harness() -> Harness {
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap();
        let clock = ManualClock::new(now);
        let store = Arc::new(MemoryStore::new());
        let engine = SchedulingEngine::new(
            store.clone(),
            store.clone(),
            Arc::new(HeuristicTimingService::new()),
            PlatformLimitsConfig::default(),
            3,
            Arc::new(clock.clone()),
        );
        Harness {
            engine,
            store,
            clock,
            now,
        }
    }

    fn request(title: &str, at: DateTime<Utc>) -> SchedulingRequest {
        SchedulingRequest {
            brand_id: "brand".to_string(),
            content_id: None,
            title: title.to_string(),
            content: "body".to_string(),
            platforms: vec![Platform::Instagram],
            content_type: ContentType::Post,
            scheduled_time: at,
            timezone: "UTC".to_string(),
            priority: SchedulePriority::Normal,
            campaign_id: None,
            tags: vec![],
            created_by: "tester".to_string(),
            allow_conflicts: false,
            max_retries: None,
            pre_publish_minutes: None,
        }
    }

    #[tokio::test]
    async fn time_overlap_blocks_unless_allowed() {
        let h = harness();
        let slot = h.now + Duration::hours(2);
        h.engine
            .schedule_content(request("spring drop teaser", slot))
            .await
            .unwrap();

        // 10 minutes later on the same platform: high-severity overlap
        let mut second = request("summer lookbook reveal", slot + Duration::minutes(10));
        let err = h.engine.schedule_content(second.clone()).await.unwrap_err();
        assert_eq!(err.kind(), "conflict");

        second.allow_conflicts = true;
        let accepted = h.engine.schedule_content(second).await.unwrap();

        let conflicts = h
            .engine
            .check_scheduling_conflicts(&accepted)
            .await
            .unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::TimeOverlap);
        assert_eq!(conflicts[0].severity, ConflictSeverity::High);
    }

    #[tokio::test]
    async fn bulk_even_distribution_hits_exact_offsets() {
        let h = harness();
        let start = h.now + Duration::hours(1);
        let end = start + Duration::hours(12);
        let bulk = BulkSchedulingRequest {
            requests: vec![
                request("post one", start),
                request("post two", start),
                request("post three", start),
                request("post four", start),
            ],
            strategy: DistributionStrategy::Even,
            window_start: start,
            window_end: end,
        };

        let outcome = h.engine.bulk_schedule_content(bulk).await.unwrap();
        assert_eq!(outcome.scheduled.len(), 4);
        assert!(outcome.conflicts.is_empty());
        assert!(outcome.failed.is_empty());

        for (i, schedule) in outcome.scheduled.iter().enumerate() {
            let expected = start + Duration::hours(3 * i as i64);
            let delta = (schedule.scheduled_time - expected).num_seconds().abs();
            assert!(delta <= 1, "offset {i} drifted by {delta}s");
        }
    }

    #[tokio::test]
    async fn bulk_partition_sums_to_input_size() {
        let h = harness();
        let slot = h.now + Duration::hours(2);
        let bulk = BulkSchedulingRequest {
            requests: vec![
                request("alpha launch", slot),
                // Same slot and platform: conflicts with the first
                request("beta launch", slot + Duration::minutes(5)),
                // Time in the past: plain validation failure
                request("gamma launch", h.now - Duration::hours(1)),
            ],
            strategy: DistributionStrategy::Custom,
            window_start: h.now,
            window_end: h.now + Duration::days(1),
        };

        let outcome = h.engine.bulk_schedule_content(bulk).await.unwrap();
        assert_eq!(outcome.scheduled.len(), 1);
        assert_eq!(outcome.conflicts.len(), 1);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.conflicts[0].index, 1);
        assert_eq!(outcome.failed[0].index, 2);
    }

    #[tokio::test]
    async fn edit_guard_freezes_final_minutes() {
        let h = harness();
        let slot = h.now + Duration::hours(1);
        let schedule = h
            .engine
            .schedule_content(request("evening post", slot))
            .await
            .unwrap();

        // 4 minutes before the slot: frozen
        h.clock.set(slot - Duration::minutes(4));
        let err = h
            .engine
            .update_scheduled_content(
                &schedule.id,
                ScheduleUpdate {
                    title: Some("late tweak".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "state");

        // 6 minutes before: still editable
        h.clock.set(slot - Duration::minutes(6));
        let updated = h
            .engine
            .update_scheduled_content(
                &schedule.id,
                ScheduleUpdate {
                    title: Some("final title".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "final title");
    }

    #[tokio::test]
    async fn cancel_guards_active_states() {
        let h = harness();
        let slot = h.now + Duration::hours(1);
        let schedule = h
            .engine
            .schedule_content(request("cancellable", slot))
            .await
            .unwrap();

        h.engine
            .cancel_scheduled_content(&schedule.id, "campaign pulled")
            .await
            .unwrap();
        let stored = h.engine.get_schedule(&schedule.id).await.unwrap();
        assert_eq!(stored.status, ScheduleStatus::Cancelled);

        // Absorbing: cancelling again is a state error
        let err = h
            .engine
            .cancel_scheduled_content(&schedule.id, "again")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "state");
    }

    #[tokio::test]
    async fn publishing_schedule_cannot_be_edited_or_cancelled() {
        use crate::storage::PublishingRepository;
        let h = harness();
        let slot = h.now + Duration::hours(1);
        let schedule = h
            .engine
            .schedule_content(request("in flight", slot))
            .await
            .unwrap();
        h.store
            .compare_and_set_status(
                &schedule.id,
                ScheduleStatus::Scheduled,
                ScheduleStatus::Publishing,
            )
            .await
            .unwrap();

        assert_eq!(
            h.engine
                .update_scheduled_content(&schedule.id, ScheduleUpdate::default())
                .await
                .unwrap_err()
                .kind(),
            "state"
        );
        assert_eq!(
            h.engine
                .cancel_scheduled_content(&schedule.id, "too late")
                .await
                .unwrap_err()
                .kind(),
            "state"
        );
    }

    #[tokio::test]
    async fn platform_limit_binds_even_with_allow_conflicts() {
        let h = harness();
        // Instagram hourly limit is 3: fill one hour
        let base = h.now + Duration::hours(3);
        for i in 0..3 {
            let mut r = request(&format!("filler {i}"), base + Duration::minutes(i * 20));
            r.allow_conflicts = true;
            h.engine.schedule_content(r).await.unwrap();
        }

        let mut overflow = request("one too many", base + Duration::minutes(45));
        overflow.allow_conflicts = true;
        let err = h.engine.schedule_content(overflow).await.unwrap_err();
        assert_eq!(err.kind(), "conflict");
        assert!(err.to_string().contains("hourly"));
    }

    #[tokio::test]
    async fn pre_publish_notification_is_registered_when_future() {
        use crate::storage::PublishingRepository;
        let h = harness();
        let slot = h.now + Duration::hours(2);
        let mut r = request("reminder please", slot);
        r.pre_publish_minutes = Some(30);
        let schedule = h.engine.schedule_content(r).await.unwrap();

        let due = h
            .store
            .due_notifications(slot - Duration::minutes(30), 10)
            .await
            .unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].schedule_id, schedule.id);
        assert_eq!(due[0].notification_type, NotificationType::PrePublish);

        // Reminder already in the past: nothing registered
        let mut r = request("too late to remind", h.now + Duration::minutes(10));
        r.allow_conflicts = true;
        r.scheduled_time = h.now + Duration::minutes(10);
        r.pre_publish_minutes = Some(30);
        r.platforms = vec![Platform::Reddit];
        h.engine.schedule_content(r).await.unwrap();
        let due = h
            .store
            .due_notifications(h.now + Duration::hours(3), 10)
            .await
            .unwrap();
        // Only the first reminder exists
        assert_eq!(due.len(), 1);
    }

    #[tokio::test]
    async fn calendar_view_aggregates_week() {
        let h = harness();
        let monday = h.now;
        h.engine
            .schedule_content(request("monday post", monday + Duration::hours(4)))
            .await
            .unwrap();
        let mut other = request("thursday post", monday + Duration::days(3));
        other.platforms = vec![Platform::Facebook];
        h.engine.schedule_content(other).await.unwrap();

        let view = h
            .engine
            .get_calendar_view("brand", CalendarViewType::Week, monday, "Europe/Berlin")
            .await
            .unwrap();

        assert_eq!(view.end_date - view.start_date, Duration::weeks(1));
        assert_eq!(view.schedules.len(), 2);
        assert!(view.conflicts.is_empty());
        assert!(!view.optimal_times.is_empty());
        assert!(view
            .platform_usage
            .iter()
            .any(|u| u.platform == Platform::Instagram && u.scheduled_today == 1));
        assert_eq!(view.timezone, "Europe/Berlin");
    }

    #[tokio::test]
    async fn optimal_bulk_respects_input_order_and_window() {
        let h = harness();
        let start = h.now + Duration::hours(1);
        let end = start + Duration::days(1);
        let bulk = BulkSchedulingRequest {
            requests: vec![request("first", start), {
                let mut r = request("second", start);
                r.platforms = vec![Platform::Facebook];
                r
            }],
            strategy: DistributionStrategy::Optimal,
            window_start: start,
            window_end: end,
        };

        let outcome = h.engine.bulk_schedule_content(bulk).await.unwrap();
        let total = outcome.scheduled.len() + outcome.conflicts.len() + outcome.failed.len();
        assert_eq!(total, 2);
        for schedule in &outcome.scheduled {
            assert!(schedule.scheduled_time >= start && schedule.scheduled_time < end);
        }
    }
}
