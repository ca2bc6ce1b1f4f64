//! Optimal posting-time suggestions.
//!
//! The real audience/competition/history signals come from an external
//! timing service; `HeuristicTimingService` is the bundled deterministic
//! default built on fixed per-platform activity curves.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};

use crate::error::{CoreError, CoreResult};
use crate::models::Platform;
use crate::scheduling::types::{ContentType, OptimalPostingTime};

#[async_trait::async_trait]
pub trait OptimalTimingService: Send + Sync {
    /// Top-`count` posting slots inside [range_start, range_end), ranked by
    /// score descending.
    async fn suggest(
        &self,
        brand_id: &str,
        platforms: &[Platform],
        content_type: ContentType,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
        count: usize,
    ) -> CoreResult<Vec<OptimalPostingTime>>;
}

/// Relative audience activity by UTC hour, per platform. Values in [0,1].
fn audience_activity(platform: Platform, hour: u32) -> f64 {
    // Coarse daypart curve: late morning and evening peaks, overnight lull
    let base: f64 = match hour {
        7..=9 => 0.7,
        10..=12 => 0.8,
        13..=16 => 0.6,
        17..=21 => 0.9,
        22..=23 => 0.5,
        _ => 0.2,
    };
    let tilt = match platform {
        Platform::Tiktok => {
            if (18..=23).contains(&hour) {
                0.1
            } else {
                0.0
            }
        }
        Platform::Instagram => {
            if (11..=13).contains(&hour) || (19..=21).contains(&hour) {
                0.1
            } else {
                0.0
            }
        }
        Platform::Facebook => {
            if (9..=11).contains(&hour) {
                0.05
            } else {
                0.0
            }
        }
        Platform::Youtube => {
            if (17..=22).contains(&hour) {
                0.1
            } else {
                0.0
            }
        }
        Platform::Reddit => {
            if (14..=18).contains(&hour) {
                0.05
            } else {
                0.0
            }
        }
        Platform::Rss => 0.0,
    };
    (base + tilt).min(1.0)
}

/// Competing-content pressure by hour: peak hours are crowded.
fn competition_penalty(hour: u32) -> f64 {
    match hour {
        11..=13 | 18..=20 => 0.3,
        9..=10 | 14..=17 | 21 => 0.15,
        _ => 0.0,
    }
}

/// Historical performance by weekday (Monday = 0). Video content skews to
/// the weekend.
fn historical_signal(content_type: ContentType, weekday: u32) -> f64 {
    let weekday_curve = match weekday {
        0 | 1 => 0.6,
        2 | 3 => 0.7,
        4 => 0.8,
        _ => 0.75,
    };
    match content_type {
        ContentType::Video | ContentType::Reel => {
            if weekday >= 4 {
                (weekday_curve + 0.15f64).min(1.0)
            } else {
                weekday_curve
            }
        }
        _ => weekday_curve,
    }
}

pub struct HeuristicTimingService;

impl HeuristicTimingService {
    pub fn new() -> Self {
        Self
    }

    fn score(platform: Platform, content_type: ContentType, slot: DateTime<Utc>) -> f64 {
        let hour = slot.hour();
        let weekday = slot.weekday().num_days_from_monday();
        let audience = audience_activity(platform, hour);
        let competition = 1.0 - competition_penalty(hour);
        let historical = historical_signal(content_type, weekday);
        0.6 * audience + 0.25 * competition + 0.15 * historical
    }
}

impl Default for HeuristicTimingService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl OptimalTimingService for HeuristicTimingService {
    async fn suggest(
        &self,
        _brand_id: &str,
        platforms: &[Platform],
        content_type: ContentType,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
        count: usize,
    ) -> CoreResult<Vec<OptimalPostingTime>> {
        if range_end <= range_start {
            return Err(CoreError::Validation(
                "suggestion range must be non-empty".into(),
            ));
        }

        // Hourly candidate slots, aligned to the hour
        let mut slot = range_start
            .with_minute(0)
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(range_start);
        if slot < range_start {
            slot += Duration::hours(1);
        }

        let mut suggestions = Vec::new();
        while slot < range_end {
            for platform in platforms {
                suggestions.push(OptimalPostingTime {
                    platform: *platform,
                    time: slot,
                    score: Self::score(*platform, content_type, slot),
                });
            }
            slot += Duration::hours(1);
        }

        // Score descending; ties broken by time then platform for stability
        suggestions.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.time.cmp(&b.time))
                .then_with(|| a.platform.as_str().cmp(b.platform.as_str()))
        });
        suggestions.truncate(count);
        Ok(suggestions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn returns_top_k_sorted_by_score() {
        let service = HeuristicTimingService::new();
        let start = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();
        let end = start + Duration::days(1);

        let suggestions = service
            .suggest(
                "brand",
                &[Platform::Instagram],
                ContentType::Post,
                start,
                end,
                5,
            )
            .await
            .unwrap();

        assert_eq!(suggestions.len(), 5);
        for pair in suggestions.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        for suggestion in &suggestions {
            assert!((0.0..=1.0).contains(&suggestion.score));
            assert!(suggestion.time >= start && suggestion.time < end);
        }
    }

    #[tokio::test]
    async fn deterministic_for_fixed_inputs() {
        let service = HeuristicTimingService::new();
        let start = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();
        let end = start + Duration::days(2);

        let a = service
            .suggest(
                "brand",
                &[Platform::Tiktok, Platform::Youtube],
                ContentType::Video,
                start,
                end,
                8,
            )
            .await
            .unwrap();
        let b = service
            .suggest(
                "brand",
                &[Platform::Tiktok, Platform::Youtube],
                ContentType::Video,
                start,
                end,
                8,
            )
            .await
            .unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[tokio::test]
    async fn empty_range_is_a_validation_error() {
        let service = HeuristicTimingService::new();
        let start = Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap();
        let err = service
            .suggest("brand", &[Platform::Rss], ContentType::Post, start, start, 3)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
    }
}
