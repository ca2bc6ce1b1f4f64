//! Publishing manager.
//!
//! Periodic due-time dispatch over the publishing repository. A schedule is
//! claimed with a status CAS so only one worker ever publishes it, then each
//! platform is validated and published. Transient failures back off
//! exponentially until `max_retries` is spent; content and auth failures
//! never retry. Every outcome emits a notification exactly once.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock::SharedClock;
use crate::config::PublishingConfig;
use crate::error::CoreResult;
use crate::metrics::PublishingMetrics;
use crate::models::Platform;
use crate::publishing::backoff::BackoffCalculator;
use crate::publishing::notifications::{NotificationEnvelope, NotificationSink, NotificationType};
use crate::scheduling::types::{ScheduleStatus, ScheduledContent};
use crate::storage::PublishingRepository;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentValidation {
    pub valid: bool,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublishErrorCode {
    ValidationFailed,
    RateLimited,
    Unavailable,
    AuthFailed,
    Unknown,
}

impl PublishErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishErrorCode::ValidationFailed => "VALIDATION_FAILED",
            PublishErrorCode::RateLimited => "RATE_LIMITED",
            PublishErrorCode::Unavailable => "UNAVAILABLE",
            PublishErrorCode::AuthFailed => "AUTH_FAILED",
            PublishErrorCode::Unknown => "UNKNOWN",
        }
    }

    /// Terminal codes never retry.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PublishErrorCode::ValidationFailed | PublishErrorCode::AuthFailed
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishError {
    pub code: PublishErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishOutcome {
    pub platform_post_id: String,
    /// Initial metrics as reported by the platform at publish time
    pub initial_metrics: serde_json::Value,
}

/// Per-platform publishing seam; the network clients live outside the core.
#[async_trait::async_trait]
pub trait PlatformPublisher: Send + Sync {
    async fn validate_content(
        &self,
        schedule: &ScheduledContent,
        platform: Platform,
    ) -> ContentValidation;

    async fn publish_content(
        &self,
        schedule: &ScheduledContent,
        platform: Platform,
    ) -> Result<PublishOutcome, PublishError>;
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TickSummary {
    pub published: usize,
    pub partial: usize,
    pub failed: usize,
    pub retried: usize,
    pub skipped: usize,
    pub notifications_delivered: usize,
}

enum PlatformResult {
    Success { platform: Platform, post_id: String },
    Terminal { platform: Platform, message: String },
    Transient { platform: Platform, message: String },
}

pub struct PublishingManager {
    repo: Arc<dyn PublishingRepository>,
    publisher: Arc<dyn PlatformPublisher>,
    sink: Arc<dyn NotificationSink>,
    backoff: BackoffCalculator,
    config: PublishingConfig,
    metrics: Arc<PublishingMetrics>,
    clock: SharedClock,
}

impl PublishingManager {
    pub fn new(
        repo: Arc<dyn PublishingRepository>,
        publisher: Arc<dyn PlatformPublisher>,
        sink: Arc<dyn NotificationSink>,
        config: PublishingConfig,
        clock: SharedClock,
    ) -> Self {
        Self {
            repo,
            publisher,
            sink,
            backoff: BackoffCalculator::new(config.backoff.clone()),
            config,
            metrics: Arc::new(PublishingMetrics::new()),
            clock,
        }
    }

    pub fn metrics(&self) -> Arc<PublishingMetrics> {
        self.metrics.clone()
    }

    /// Periodic dispatch loop. Runs until the task is aborted.
    pub async fn run_loop(self: Arc<Self>) {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(self.config.tick_seconds));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match self.tick().await {
                Ok(summary) => {
                    if summary.published + summary.failed + summary.retried > 0 {
                        tracing::info!(
                            published = summary.published,
                            failed = summary.failed,
                            retried = summary.retried,
                            "publishing tick"
                        );
                    }
                }
                Err(err) => tracing::error!(error = %err, "publishing tick failed"),
            }
        }
    }

    /// One dispatch pass: deliver due notifications, then publish due
    /// schedules (bounded page).
    pub async fn tick(&self) -> CoreResult<TickSummary> {
        let now = self.clock.now();
        let mut summary = TickSummary::default();

        summary.notifications_delivered = self.pump_notifications(now).await?;

        let due = self
            .repo
            .due_for_publishing(now, self.config.due_page_size)
            .await?;
        for schedule in due {
            self.process_due(schedule, &mut summary).await?;
        }
        Ok(summary)
    }

    async fn pump_notifications(&self, now: chrono::DateTime<chrono::Utc>) -> CoreResult<usize> {
        let due = self
            .repo
            .due_notifications(now, self.config.due_page_size)
            .await?;
        let mut delivered = 0usize;
        for pending in due {
            let envelope = NotificationEnvelope {
                schedule_id: pending.schedule_id.clone(),
                notification_type: pending.notification_type,
                title: pending.title.clone(),
                recipients: pending.recipients.clone(),
            };
            match self.sink.send_notification(&envelope).await {
                Ok(()) => {
                    self.repo.mark_notification_sent(&pending.id).await?;
                    self.metrics
                        .record_notification(pending.notification_type.as_str());
                    delivered += 1;
                }
                Err(err) => {
                    // Left unsent; the next tick retries delivery
                    tracing::warn!(
                        notification_id = %pending.id,
                        error = %err,
                        "notification delivery failed"
                    );
                }
            }
        }
        Ok(delivered)
    }

    async fn process_due(
        &self,
        schedule: ScheduledContent,
        summary: &mut TickSummary,
    ) -> CoreResult<()> {
        // Claim: only one worker may hold `publishing`
        let claimed = self
            .repo
            .compare_and_set_status(
                &schedule.id,
                ScheduleStatus::Scheduled,
                ScheduleStatus::Publishing,
            )
            .await?;
        if !claimed {
            summary.skipped += 1;
            return Ok(());
        }

        let mut schedule = schedule;
        schedule.status = ScheduleStatus::Publishing;

        let mut results = Vec::with_capacity(schedule.platforms.len());
        for platform in schedule.platforms.clone() {
            results.push(self.publish_platform(&schedule, platform).await);
        }

        let successes: Vec<&PlatformResult> = results
            .iter()
            .filter(|r| matches!(r, PlatformResult::Success { .. }))
            .collect();
        let transients: Vec<String> = results
            .iter()
            .filter_map(|r| match r {
                PlatformResult::Transient { platform, message } => {
                    Some(format!("{}: {message}", platform.as_str()))
                }
                _ => None,
            })
            .collect();
        let terminals: Vec<String> = results
            .iter()
            .filter_map(|r| match r {
                PlatformResult::Terminal { platform, message } => {
                    Some(format!("{}: {message}", platform.as_str()))
                }
                _ => None,
            })
            .collect();

        let now = self.clock.now();
        schedule.updated_at = now;

        if !successes.is_empty() {
            // Mixed outcomes still count as published; failures are recorded
            if transients.is_empty() && terminals.is_empty() {
                schedule.status = ScheduleStatus::Published;
                schedule.failure_reason = None;
                self.metrics.record_published();
                summary.published += 1;
            } else {
                schedule.status = ScheduleStatus::Published;
                schedule.failure_reason = Some("Partial publishing success".to_string());
                self.metrics.record_partial();
                summary.partial += 1;
                summary.published += 1;
            }
            self.repo.update_publish_state(&schedule).await?;
            self.notify_outcome(&mut schedule, NotificationType::Published)
                .await?;
            return Ok(());
        }

        if !transients.is_empty() {
            // Invariant: retry_count never exceeds max_retries
            if schedule.retry_count >= schedule.max_retries {
                schedule.status = ScheduleStatus::Failed;
                schedule.failure_reason = Some(format!(
                    "max retries ({}) exhausted: {}",
                    schedule.max_retries,
                    transients.join("; ")
                ));
                self.metrics.record_failed();
                summary.failed += 1;
                self.repo.update_publish_state(&schedule).await?;
                self.notify_outcome(&mut schedule, NotificationType::Failed)
                    .await?;
            } else {
                schedule.retry_count += 1;
                self.metrics.record_retry();
                let delay = self.backoff.delay_for(schedule.retry_count);
                schedule.status = ScheduleStatus::Scheduled;
                schedule.next_attempt_at = Some(now + delay);
                schedule.failure_reason = Some(transients.join("; "));
                summary.retried += 1;
                tracing::warn!(
                    schedule_id = %schedule.id,
                    retry = schedule.retry_count,
                    next_attempt_in_secs = delay.num_seconds(),
                    "transient publish failure, backing off"
                );
                self.repo.update_publish_state(&schedule).await?;
            }
            return Ok(());
        }

        // Terminal failures on every platform: no retry
        schedule.status = ScheduleStatus::Failed;
        schedule.failure_reason = Some(terminals.join("; "));
        self.metrics.record_failed();
        summary.failed += 1;
        self.repo.update_publish_state(&schedule).await?;
        self.notify_outcome(&mut schedule, NotificationType::Failed)
            .await?;
        Ok(())
    }

    async fn publish_platform(
        &self,
        schedule: &ScheduledContent,
        platform: Platform,
    ) -> PlatformResult {
        let validation = self.publisher.validate_content(schedule, platform).await;
        if !validation.valid {
            self.metrics.record_validation_rejection();
            return PlatformResult::Terminal {
                platform,
                message: format!(
                    "{}: {}",
                    PublishErrorCode::ValidationFailed.as_str(),
                    validation.issues.join(", ")
                ),
            };
        }

        match self.publisher.publish_content(schedule, platform).await {
            Ok(outcome) => {
                tracing::info!(
                    schedule_id = %schedule.id,
                    platform = platform.as_str(),
                    post_id = %outcome.platform_post_id,
                    "platform publish succeeded"
                );
                PlatformResult::Success {
                    platform,
                    post_id: outcome.platform_post_id,
                }
            }
            Err(err) if err.code.is_terminal() => PlatformResult::Terminal {
                platform,
                message: format!("{}: {}", err.code.as_str(), err.message),
            },
            Err(err) => PlatformResult::Transient {
                platform,
                message: format!("{}: {}", err.code.as_str(), err.message),
            },
        }
    }

    /// Outcome notifications are emitted exactly once per type.
    async fn notify_outcome(
        &self,
        schedule: &mut ScheduledContent,
        notification_type: NotificationType,
    ) -> CoreResult<()> {
        let marker = notification_type.as_str().to_string();
        if schedule.notifications_sent.contains(&marker) {
            return Ok(());
        }
        let envelope = NotificationEnvelope {
            schedule_id: schedule.id.clone(),
            notification_type,
            title: format!("'{}' {}", schedule.title, marker),
            recipients: vec![schedule.created_by.clone()],
        };
        if let Err(err) = self.sink.send_notification(&envelope).await {
            tracing::warn!(schedule_id = %schedule.id, error = %err,
                "outcome notification failed");
            return Ok(());
        }
        self.metrics.record_notification(notification_type.as_str());
        schedule.notifications_sent.push(marker);
        self.repo.update_publish_state(schedule).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::config::BackoffConfig;
    use crate::error::CoreError;
    use crate::scheduling::types::{ContentType, SchedulePriority};
    use crate::storage::memory::MemoryStore;
    use crate::storage::SchedulingRepository;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use parking_lot::Mutex;

    /// Scripted per-platform publisher: pops one behavior per publish call.
    #[derive(Default)]
    struct ScriptedPublisher {
        script: Mutex<Vec<Result<PublishOutcome, PublishError>>>,
        invalid_platforms: Mutex<Vec<Platform>>,
        calls: Mutex<usize>,
    }

    impl ScriptedPublisher {
        fn push_ok(&self, post_id: &str) {
            self.script.lock().push(Ok(PublishOutcome {
                platform_post_id: post_id.to_string(),
                initial_metrics: serde_json::json!({"impressions": 0}),
            }));
        }

        fn push_err(&self, code: PublishErrorCode) {
            self.script.lock().push(Err(PublishError {
                code,
                message: "scripted".to_string(),
            }));
        }
    }

    #[async_trait::async_trait]
    impl PlatformPublisher for ScriptedPublisher {
        async fn validate_content(
            &self,
            _schedule: &ScheduledContent,
            platform: Platform,
        ) -> ContentValidation {
            if self.invalid_platforms.lock().contains(&platform) {
                ContentValidation {
                    valid: false,
                    issues: vec!["caption too long".to_string()],
                }
            } else {
                ContentValidation {
                    valid: true,
                    issues: vec![],
                }
            }
        }

        async fn publish_content(
            &self,
            _schedule: &ScheduledContent,
            _platform: Platform,
        ) -> Result<PublishOutcome, PublishError> {
            *self.calls.lock() += 1;
            self.script.lock().remove(0)
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<NotificationEnvelope>>,
        fail_next: Mutex<bool>,
    }

    #[async_trait::async_trait]
    impl NotificationSink for RecordingSink {
        async fn send_notification(&self, envelope: &NotificationEnvelope) -> CoreResult<()> {
            if *self.fail_next.lock() {
                *self.fail_next.lock() = false;
                return Err(CoreError::TransientUpstream("sink down".into()));
            }
            self.sent.lock().push(envelope.clone());
            Ok(())
        }

        async fn schedule_notification(
            &self,
            _envelope: &NotificationEnvelope,
            _at: DateTime<Utc>,
        ) -> CoreResult<String> {
            Ok("handle".to_string())
        }
    }

    struct Harness {
        manager: PublishingManager,
        store: Arc<MemoryStore>,
        publisher: Arc<ScriptedPublisher>,
        sink: Arc<RecordingSink>,
        clock: ManualClock,
        now: DateTime<Utc>,
    }

    fn harness(max_retries: u32) -> Harness {
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
        let clock = ManualClock::new(now);
        let store = Arc::new(MemoryStore::new());
        let publisher = Arc::new(ScriptedPublisher::default());
        let sink = Arc::new(RecordingSink::default());
        let config = PublishingConfig {
            tick_seconds: 30,
            due_page_size: 10,
            default_max_retries: max_retries,
            backoff: BackoffConfig {
                base_secs: 60,
                max_secs: 3_600,
                multiplier: 2.0,
                jitter_factor: 0.0,
            },
        };
        let manager = PublishingManager::new(
            store.clone(),
            publisher.clone(),
            sink.clone(),
            config,
            Arc::new(clock.clone()),
        );
        Harness {
            manager,
            store,
            publisher,
            sink,
            clock,
            now,
        }
    }

    fn due_schedule(
        id: &str,
        at: DateTime<Utc>,
        platforms: Vec<Platform>,
        max_retries: u32,
    ) -> ScheduledContent {
        ScheduledContent {
            id: id.to_string(),
            brand_id: "brand".to_string(),
            content_id: None,
            title: format!("post {id}"),
            content: "body".to_string(),
            platforms,
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
            max_retries,
            next_attempt_at: None,
            notifications_sent: vec![],
            failure_reason: None,
        }
    }

    #[tokio::test]
    async fn successful_publish_emits_published_notification() {
        let h = harness(3);
        let schedule = due_schedule("s1", h.now - Duration::minutes(1), vec![Platform::Instagram], 3);
        SchedulingRepository::create(&*h.store, &schedule).await.unwrap();
        h.publisher.push_ok("ig-123");

        let summary = h.manager.tick().await.unwrap();
        assert_eq!(summary.published, 1);

        let stored = SchedulingRepository::get(&*h.store, "s1").await.unwrap().unwrap();
        assert_eq!(stored.status, ScheduleStatus::Published);
        assert_eq!(stored.notifications_sent, ["published"]);

        let sent = h.sink.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].notification_type, NotificationType::Published);
    }

    #[tokio::test]
    async fn retry_ladder_exhausts_then_fails_once() {
        let h = harness(3);
        let schedule = due_schedule("s1", h.now - Duration::minutes(1), vec![Platform::Instagram], 3);
        SchedulingRepository::create(&*h.store, &schedule).await.unwrap();

        // Three rate-limited ticks: stays scheduled, retry_count climbs
        for expected_retry in 1..=3u32 {
            h.publisher.push_err(PublishErrorCode::RateLimited);
            h.manager.tick().await.unwrap();
            let stored = SchedulingRepository::get(&*h.store, "s1").await.unwrap().unwrap();
            assert_eq!(stored.status, ScheduleStatus::Scheduled, "tick {expected_retry}");
            assert_eq!(stored.retry_count, expected_retry);
            assert!(stored.retry_count <= stored.max_retries);
            // Jump past the backoff so the next tick sees it due again
            let next = stored.next_attempt_at.expect("backoff registered");
            h.clock.set(next + Duration::seconds(1));
        }

        // Fourth failure exhausts the retry allowance
        h.publisher.push_err(PublishErrorCode::RateLimited);
        h.manager.tick().await.unwrap();
        let stored = SchedulingRepository::get(&*h.store, "s1").await.unwrap().unwrap();
        assert_eq!(stored.status, ScheduleStatus::Failed);
        assert_eq!(stored.retry_count, 3);
        assert!(stored
            .failure_reason
            .as_deref()
            .unwrap()
            .contains("max retries"));

        let failed_notifications: Vec<_> = h
            .sink
            .sent
            .lock()
            .iter()
            .filter(|e| e.notification_type == NotificationType::Failed)
            .cloned()
            .collect();
        assert_eq!(failed_notifications.len(), 1);

        // Terminal: further ticks never touch it again
        h.clock.advance(Duration::hours(2));
        let summary = h.manager.tick().await.unwrap();
        assert_eq!(summary.published + summary.failed + summary.retried, 0);
    }

    #[tokio::test]
    async fn backoff_delays_grow_between_retries() {
        let h = harness(5);
        let schedule = due_schedule("s1", h.now - Duration::minutes(1), vec![Platform::Instagram], 5);
        SchedulingRepository::create(&*h.store, &schedule).await.unwrap();

        h.publisher.push_err(PublishErrorCode::Unavailable);
        h.manager.tick().await.unwrap();
        let first = SchedulingRepository::get(&*h.store, "s1").await.unwrap().unwrap();
        let first_delay = first.next_attempt_at.unwrap() - h.clock.now();
        assert_eq!(first_delay, Duration::seconds(60));

        h.clock.set(first.next_attempt_at.unwrap() + Duration::seconds(1));
        h.publisher.push_err(PublishErrorCode::Unavailable);
        h.manager.tick().await.unwrap();
        let second = SchedulingRepository::get(&*h.store, "s1").await.unwrap().unwrap();
        let second_delay = second.next_attempt_at.unwrap() - h.clock.now();
        assert_eq!(second_delay, Duration::seconds(120));
    }

    #[tokio::test]
    async fn content_validation_failure_is_terminal() {
        let h = harness(3);
        let schedule = due_schedule("s1", h.now - Duration::minutes(1), vec![Platform::Instagram], 3);
        SchedulingRepository::create(&*h.store, &schedule).await.unwrap();
        h.publisher.invalid_platforms.lock().push(Platform::Instagram);

        h.manager.tick().await.unwrap();
        let stored = SchedulingRepository::get(&*h.store, "s1").await.unwrap().unwrap();
        assert_eq!(stored.status, ScheduleStatus::Failed);
        assert_eq!(stored.retry_count, 0);
        assert!(stored
            .failure_reason
            .as_deref()
            .unwrap()
            .contains("VALIDATION_FAILED"));
        // The publish call itself never happened
        assert_eq!(*h.publisher.calls.lock(), 0);
    }

    #[tokio::test]
    async fn mixed_outcome_is_partial_success() {
        let h = harness(3);
        let schedule = due_schedule(
            "s1",
            h.now - Duration::minutes(1),
            vec![Platform::Instagram, Platform::Facebook],
            3,
        );
        SchedulingRepository::create(&*h.store, &schedule).await.unwrap();
        h.publisher.push_ok("ig-1");
        h.publisher.push_err(PublishErrorCode::AuthFailed);

        let summary = h.manager.tick().await.unwrap();
        assert_eq!(summary.partial, 1);

        let stored = SchedulingRepository::get(&*h.store, "s1").await.unwrap().unwrap();
        assert_eq!(stored.status, ScheduleStatus::Published);
        assert_eq!(
            stored.failure_reason.as_deref(),
            Some("Partial publishing success")
        );
    }

    #[tokio::test]
    async fn claimed_schedule_is_skipped_by_other_workers() {
        let h = harness(3);
        let mut schedule =
            due_schedule("s1", h.now - Duration::minutes(1), vec![Platform::Instagram], 3);
        schedule.status = ScheduleStatus::Publishing;
        SchedulingRepository::create(&*h.store, &schedule).await.unwrap();

        let summary = h.manager.tick().await.unwrap();
        // Not due (status is publishing), so nothing happens at all
        assert_eq!(summary.skipped + summary.published + summary.failed, 0);
    }

    #[tokio::test]
    async fn due_page_is_bounded() {
        let mut h = harness(3);
        h.manager.config.due_page_size = 2;
        for i in 0..5 {
            let schedule = due_schedule(
                &format!("s{i}"),
                h.now - Duration::minutes(5),
                vec![Platform::Instagram],
                3,
            );
            SchedulingRepository::create(&*h.store, &schedule).await.unwrap();
            h.publisher.push_ok(&format!("post-{i}"));
        }

        let summary = h.manager.tick().await.unwrap();
        assert_eq!(summary.published, 2);
    }

    #[tokio::test]
    async fn pending_notifications_are_pumped_and_retried() {
        use crate::publishing::notifications::PendingNotification;
        let h = harness(3);
        let envelope = NotificationEnvelope {
            schedule_id: "s1".to_string(),
            notification_type: NotificationType::PrePublish,
            title: "going out soon".to_string(),
            recipients: vec!["ops".to_string()],
        };
        h.store
            .register_notification(&PendingNotification::new(
                &envelope,
                h.now - Duration::minutes(1),
            ))
            .await
            .unwrap();

        // First delivery attempt fails; the notification stays pending
        *h.sink.fail_next.lock() = true;
        let summary = h.manager.tick().await.unwrap();
        assert_eq!(summary.notifications_delivered, 0);

        let summary = h.manager.tick().await.unwrap();
        assert_eq!(summary.notifications_delivered, 1);
        assert_eq!(h.sink.sent.lock().len(), 1);

        // Delivered exactly once
        let summary = h.manager.tick().await.unwrap();
        assert_eq!(summary.notifications_delivered, 0);
    }
}
