//! Conflict detection.
//!
//! Four deterministic detectors over a candidate schedule and the
//! repository's conflicting-set queries. Pure: the same inputs always
//! produce the same conflict set, in detector order.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

use crate::config::PlatformLimitsConfig;
use crate::models::Platform;
use crate::scheduling::types::{
    ConflictSeverity, ConflictType, ResolutionAction, ScheduledContent, SchedulingConflict,
    SuggestedResolution,
};

/// Overlap windows on a shared platform
const OVERLAP_HIGH_MINUTES: i64 = 15;
const OVERLAP_MEDIUM_MINUTES: i64 = 30;
/// Same-campaign spacing
const CAMPAIGN_WINDOW_MINUTES: i64 = 120;
/// Similarity look-around
pub const SIMILARITY_WINDOW_DAYS: i64 = 7;
const TITLE_JACCARD_THRESHOLD: f64 = 0.7;
const HASHTAG_JACCARD_THRESHOLD: f64 = 0.8;

/// Per-platform usage at the candidate's slot, assembled by the engine from
/// repository counts
#[derive(Debug, Clone)]
pub struct LimitUsage {
    pub platform: Platform,
    pub daily_count: u32,
    pub hourly_count: u32,
    /// Earliest slot the limits service reports as free
    pub next_available: DateTime<Utc>,
}

/// Run all detectors.
///
/// `near` is the conflicting-set query (same brand, shared platform, around
/// the slot); `week` the similarity window; both ordered by
/// (scheduled_time, id).
pub fn detect_conflicts(
    candidate: &ScheduledContent,
    near: &[ScheduledContent],
    week: &[ScheduledContent],
    usage: &[LimitUsage],
    limits: &PlatformLimitsConfig,
) -> Vec<SchedulingConflict> {
    let mut conflicts = Vec::new();

    if let Some(conflict) = detect_time_overlap(candidate, near) {
        conflicts.push(conflict);
    }
    conflicts.extend(detect_platform_limits(candidate, usage, limits));
    if let Some(conflict) = detect_content_similarity(candidate, week) {
        conflicts.push(conflict);
    }
    if let Some(conflict) = detect_campaign_conflict(candidate, near) {
        conflicts.push(conflict);
    }

    conflicts
}

fn shares_platform(a: &ScheduledContent, b: &ScheduledContent) -> bool {
    a.platforms.iter().any(|p| b.platforms.contains(p))
}

fn minutes_between(a: DateTime<Utc>, b: DateTime<Utc>) -> i64 {
    (a - b).num_minutes().abs()
}

fn detect_time_overlap(
    candidate: &ScheduledContent,
    near: &[ScheduledContent],
) -> Option<SchedulingConflict> {
    let mut ids = Vec::new();
    let mut severity = ConflictSeverity::Low;
    let mut latest: Option<DateTime<Utc>> = None;

    for other in near {
        if other.id == candidate.id || !shares_platform(candidate, other) {
            continue;
        }
        let gap = minutes_between(candidate.scheduled_time, other.scheduled_time);
        let this_severity = if gap < OVERLAP_HIGH_MINUTES {
            ConflictSeverity::High
        } else if gap < OVERLAP_MEDIUM_MINUTES {
            ConflictSeverity::Medium
        } else {
            continue;
        };
        severity = severity.max(this_severity);
        latest = Some(latest.map_or(other.scheduled_time, |t: DateTime<Utc>| {
            t.max(other.scheduled_time)
        }));
        ids.push(other.id.clone());
    }

    if ids.is_empty() {
        return None;
    }

    let new_time = latest.map(|t| t + Duration::minutes(OVERLAP_MEDIUM_MINUTES));
    Some(SchedulingConflict {
        conflict_type: ConflictType::TimeOverlap,
        severity,
        description: format!(
            "{} schedule(s) on a shared platform within {OVERLAP_MEDIUM_MINUTES} minutes",
            ids.len()
        ),
        conflicting_schedule_ids: ids,
        suggested_resolution: SuggestedResolution {
            action: ResolutionAction::Reschedule,
            new_time,
            reason: "space posts on the same platform further apart".to_string(),
        },
        auto_resolvable: severity < ConflictSeverity::High,
    })
}

fn detect_platform_limits(
    candidate: &ScheduledContent,
    usage: &[LimitUsage],
    limits: &PlatformLimitsConfig,
) -> Vec<SchedulingConflict> {
    let mut conflicts = Vec::new();
    for sample in usage {
        if !candidate.platforms.contains(&sample.platform) {
            continue;
        }
        // Missing platforms fall back to the default limit table
        let limit = limits.limit(sample.platform);
        let daily_full = sample.daily_count >= limit.daily_limit;
        let hourly_full = sample.hourly_count >= limit.hourly_limit;
        if !daily_full && !hourly_full {
            continue;
        }
        let which = if daily_full { "daily" } else { "hourly" };
        conflicts.push(SchedulingConflict {
            conflict_type: ConflictType::PlatformLimit,
            severity: ConflictSeverity::High,
            description: format!(
                "{} {which} limit reached ({}/{} daily, {}/{} hourly)",
                sample.platform.as_str(),
                sample.daily_count,
                limit.daily_limit,
                sample.hourly_count,
                limit.hourly_limit
            ),
            conflicting_schedule_ids: Vec::new(),
            suggested_resolution: SuggestedResolution {
                action: ResolutionAction::Reschedule,
                new_time: Some(sample.next_available),
                reason: format!("next free {} slot", sample.platform.as_str()),
            },
            auto_resolvable: true,
        });
    }
    conflicts
}

fn token_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|t| {
            t.trim_matches(|c: char| c.is_ascii_punctuation())
                .to_string()
        })
        .filter(|t| !t.is_empty())
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    intersection / union
}

fn detect_content_similarity(
    candidate: &ScheduledContent,
    week: &[ScheduledContent],
) -> Option<SchedulingConflict> {
    let title_tokens = token_set(&candidate.title);
    let tag_set: HashSet<String> = candidate.tags.iter().map(|t| t.to_lowercase()).collect();
    let window = Duration::days(SIMILARITY_WINDOW_DAYS);

    let mut ids = Vec::new();
    for other in week {
        if other.id == candidate.id
            || minutes_between(candidate.scheduled_time, other.scheduled_time)
                > window.num_minutes()
        {
            continue;
        }
        let title_similarity = jaccard(&title_tokens, &token_set(&other.title));
        let other_tags: HashSet<String> = other.tags.iter().map(|t| t.to_lowercase()).collect();
        let tag_similarity = jaccard(&tag_set, &other_tags);
        if title_similarity > TITLE_JACCARD_THRESHOLD || tag_similarity > HASHTAG_JACCARD_THRESHOLD
        {
            ids.push(other.id.clone());
        }
    }

    if ids.is_empty() {
        return None;
    }
    Some(SchedulingConflict {
        conflict_type: ConflictType::ContentSimilarity,
        severity: ConflictSeverity::Low,
        description: format!("{} similar post(s) within {SIMILARITY_WINDOW_DAYS} days", ids.len()),
        conflicting_schedule_ids: ids,
        suggested_resolution: SuggestedResolution {
            action: ResolutionAction::Merge,
            new_time: None,
            reason: "near-duplicate content; consider merging or varying".to_string(),
        },
        auto_resolvable: false,
    })
}

fn detect_campaign_conflict(
    candidate: &ScheduledContent,
    near: &[ScheduledContent],
) -> Option<SchedulingConflict> {
    let campaign = candidate.campaign_id.as_ref()?;
    let mut ids = Vec::new();
    let mut latest: Option<DateTime<Utc>> = None;

    for other in near {
        if other.id == candidate.id || other.campaign_id.as_ref() != Some(campaign) {
            continue;
        }
        if minutes_between(candidate.scheduled_time, other.scheduled_time)
            < CAMPAIGN_WINDOW_MINUTES
        {
            latest = Some(latest.map_or(other.scheduled_time, |t: DateTime<Utc>| {
                t.max(other.scheduled_time)
            }));
            ids.push(other.id.clone());
        }
    }

    if ids.is_empty() {
        return None;
    }
    Some(SchedulingConflict {
        conflict_type: ConflictType::CampaignConflict,
        severity: ConflictSeverity::Medium,
        description: format!(
            "campaign '{campaign}' already posts within {CAMPAIGN_WINDOW_MINUTES} minutes"
        ),
        conflicting_schedule_ids: ids,
        suggested_resolution: SuggestedResolution {
            action: ResolutionAction::Reschedule,
            new_time: latest.map(|t| t + Duration::minutes(CAMPAIGN_WINDOW_MINUTES)),
            reason: "keep campaign posts spaced out".to_string(),
        },
        auto_resolvable: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::types::{ContentType, SchedulePriority, ScheduleStatus};

    fn schedule(id: &str, at: DateTime<Utc>) -> ScheduledContent {
        ScheduledContent {
            id: id.to_string(),
            brand_id: "brand".to_string(),
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

    fn no_usage() -> Vec<LimitUsage> {
        Vec::new()
    }

    #[test]
    fn overlap_within_15_minutes_is_high() {
        let base = Utc::now();
        let candidate = schedule("new", base);
        let near = vec![schedule("old", base + Duration::minutes(10))];
        let conflicts = detect_conflicts(
            &candidate,
            &near,
            &[],
            &no_usage(),
            &PlatformLimitsConfig::default(),
        );

        assert_eq!(conflicts.len(), 1);
        let conflict = &conflicts[0];
        assert_eq!(conflict.conflict_type, ConflictType::TimeOverlap);
        assert_eq!(conflict.severity, ConflictSeverity::High);
        assert_eq!(conflict.conflicting_schedule_ids, ["old"]);
        assert!(!conflict.auto_resolvable);
    }

    #[test]
    fn overlap_between_15_and_30_minutes_is_medium() {
        let base = Utc::now();
        let candidate = schedule("new", base);
        let near = vec![schedule("old", base + Duration::minutes(20))];
        let conflicts = detect_conflicts(
            &candidate,
            &near,
            &[],
            &no_usage(),
            &PlatformLimitsConfig::default(),
        );
        assert_eq!(conflicts[0].severity, ConflictSeverity::Medium);
        assert!(conflicts[0].auto_resolvable);
    }

    #[test]
    fn no_overlap_on_disjoint_platforms() {
        let base = Utc::now();
        let candidate = schedule("new", base);
        let mut other = schedule("old", base + Duration::minutes(5));
        other.platforms = vec![Platform::Youtube];
        let conflicts = detect_conflicts(
            &candidate,
            &[other],
            &[],
            &no_usage(),
            &PlatformLimitsConfig::default(),
        );
        assert!(conflicts.is_empty());
    }

    #[test]
    fn platform_limit_produces_high_with_next_slot() {
        let base = Utc::now();
        let candidate = schedule("new", base);
        let next = base + Duration::hours(1);
        let usage = vec![LimitUsage {
            platform: Platform::Instagram,
            daily_count: 2,
            hourly_count: 3,
            next_available: next,
        }];
        let conflicts = detect_conflicts(
            &candidate,
            &[],
            &[],
            &usage,
            &PlatformLimitsConfig::default(),
        );

        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::PlatformLimit);
        assert_eq!(conflicts[0].severity, ConflictSeverity::High);
        assert_eq!(conflicts[0].suggested_resolution.new_time, Some(next));
    }

    #[test]
    fn similar_titles_within_week_are_low() {
        let base = Utc::now();
        let mut candidate = schedule("new", base);
        candidate.title = "summer glow serum launch announcement".to_string();
        let mut other = schedule("old", base + Duration::days(2));
        other.title = "summer glow serum launch announcement again".to_string();
        let conflicts = detect_conflicts(
            &candidate,
            &[],
            &[other],
            &no_usage(),
            &PlatformLimitsConfig::default(),
        );

        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::ContentSimilarity);
        assert_eq!(conflicts[0].severity, ConflictSeverity::Low);
    }

    #[test]
    fn matching_hashtags_trigger_similarity() {
        let base = Utc::now();
        let mut candidate = schedule("new", base);
        candidate.title = "something fresh".to_string();
        candidate.tags = vec!["glow".into(), "serum".into(), "sale".into()];
        let mut other = schedule("old", base + Duration::days(1));
        other.title = "entirely different words".to_string();
        other.tags = vec!["glow".into(), "serum".into(), "sale".into()];
        let conflicts = detect_conflicts(
            &candidate,
            &[],
            &[other],
            &no_usage(),
            &PlatformLimitsConfig::default(),
        );
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::ContentSimilarity);
    }

    #[test]
    fn campaign_posts_too_close_are_medium() {
        let base = Utc::now();
        let mut candidate = schedule("new", base);
        candidate.campaign_id = Some("camp-1".to_string());
        // Different platform so the overlap detector stays quiet
        candidate.platforms = vec![Platform::Reddit];
        let mut other = schedule("old", base + Duration::minutes(90));
        other.campaign_id = Some("camp-1".to_string());
        let conflicts = detect_conflicts(
            &candidate,
            &[other],
            &[],
            &no_usage(),
            &PlatformLimitsConfig::default(),
        );

        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::CampaignConflict);
        assert_eq!(conflicts[0].severity, ConflictSeverity::Medium);
    }

    #[test]
    fn detection_is_deterministic() {
        let base = Utc::now();
        let candidate = schedule("new", base);
        let near = vec![
            schedule("a", base + Duration::minutes(10)),
            schedule("b", base + Duration::minutes(25)),
        ];
        let run = || {
            detect_conflicts(
                &candidate,
                &near,
                &[],
                &no_usage(),
                &PlatformLimitsConfig::default(),
            )
        };
        let first = serde_json::to_string(&run()).unwrap();
        let second = serde_json::to_string(&run()).unwrap();
        assert_eq!(first, second);
    }
}
