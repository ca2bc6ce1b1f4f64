//! Scheduling domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Platform;

/// Content categories a schedule can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Post,
    Story,
    Reel,
    Video,
    Article,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Post => "post",
            ContentType::Story => "story",
            ContentType::Reel => "reel",
            ContentType::Video => "video",
            ContentType::Article => "article",
        }
    }
}

/// Schedule lifecycle. `Published` and `Cancelled` are absorbing;
/// `Publishing` is transient and held by at most one publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Draft,
    Scheduled,
    Publishing,
    Published,
    Failed,
    Cancelled,
}

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Draft => "draft",
            ScheduleStatus::Scheduled => "scheduled",
            ScheduleStatus::Publishing => "publishing",
            ScheduleStatus::Published => "published",
            ScheduleStatus::Failed => "failed",
            ScheduleStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<ScheduleStatus> {
        match s {
            "draft" => Some(ScheduleStatus::Draft),
            "scheduled" => Some(ScheduleStatus::Scheduled),
            "publishing" => Some(ScheduleStatus::Publishing),
            "published" => Some(ScheduleStatus::Published),
            "failed" => Some(ScheduleStatus::Failed),
            "cancelled" => Some(ScheduleStatus::Cancelled),
            _ => None,
        }
    }

    /// No transition ever leaves these states
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScheduleStatus::Published | ScheduleStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulePriority {
    Low,
    Normal,
    High,
}

impl Default for SchedulePriority {
    fn default() -> Self {
        SchedulePriority::Normal
    }
}

/// A scheduled piece of content. Owned by the scheduling engine; the
/// publishing manager only mutates status, retry_count, notifications_sent
/// and failure_reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledContent {
    pub id: String,
    pub brand_id: String,
    pub content_id: Option<String>,
    pub title: String,
    pub content: String,
    pub platforms: Vec<Platform>,
    pub content_type: ContentType,
    pub scheduled_time: DateTime<Utc>,
    /// IANA zone name the author scheduled in; stored for display, all
    /// arithmetic stays in UTC
    pub timezone: String,
    pub status: ScheduleStatus,
    pub priority: SchedulePriority,
    pub campaign_id: Option<String>,
    pub tags: Vec<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub retry_count: u32,
    pub max_retries: u32,
    /// Earliest next publish attempt after a transient failure
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub notifications_sent: Vec<String>,
    pub failure_reason: Option<String>,
}

/// Request to create one schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingRequest {
    pub brand_id: String,
    pub content_id: Option<String>,
    pub title: String,
    pub content: String,
    pub platforms: Vec<Platform>,
    pub content_type: ContentType,
    pub scheduled_time: DateTime<Utc>,
    pub timezone: String,
    #[serde(default)]
    pub priority: SchedulePriority,
    pub campaign_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_by: String,
    #[serde(default)]
    pub allow_conflicts: bool,
    pub max_retries: Option<u32>,
    /// Register a pre-publish notification this many minutes ahead
    pub pre_publish_minutes: Option<i64>,
}

/// How bulk requests are spread over the window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionStrategy {
    Even,
    Optimal,
    Custom,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkSchedulingRequest {
    pub requests: Vec<SchedulingRequest>,
    pub strategy: DistributionStrategy,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
}

/// Per-item partitioned outcome of a bulk request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkSchedulingOutcome {
    pub scheduled: Vec<ScheduledContent>,
    pub conflicts: Vec<BulkItemFailure>,
    pub failed: Vec<BulkItemFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkItemFailure {
    /// Index into the request list
    pub index: usize,
    pub title: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    TimeOverlap,
    PlatformLimit,
    ContentSimilarity,
    CampaignConflict,
}

impl ConflictType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictType::TimeOverlap => "time_overlap",
            ConflictType::PlatformLimit => "platform_limit",
            ConflictType::ContentSimilarity => "content_similarity",
            ConflictType::CampaignConflict => "campaign_conflict",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionAction {
    Reschedule,
    Merge,
    Cancel,
    Ignore,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedResolution {
    pub action: ResolutionAction,
    pub new_time: Option<DateTime<Utc>>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingConflict {
    pub conflict_type: ConflictType,
    pub severity: ConflictSeverity,
    pub description: String,
    pub conflicting_schedule_ids: Vec<String>,
    pub suggested_resolution: SuggestedResolution,
    pub auto_resolvable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarViewType {
    Day,
    Week,
    Month,
    Year,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimalPostingTime {
    pub platform: Platform,
    pub time: DateTime<Utc>,
    /// Composite of audience activity, competition and historical signals
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformUsage {
    pub platform: Platform,
    pub scheduled_today: u32,
    pub daily_limit: u32,
    pub hourly_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarView {
    pub brand_id: String,
    pub view_type: CalendarViewType,
    pub timezone: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub schedules: Vec<ScheduledContent>,
    pub conflicts: Vec<SchedulingConflict>,
    pub optimal_times: Vec<OptimalPostingTime>,
    pub platform_usage: Vec<PlatformUsage>,
}
