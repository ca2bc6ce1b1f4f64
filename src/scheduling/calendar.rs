//! Calendar view bounds.
//!
//! The time zone is always an explicit caller parameter; it is validated and
//! carried on the view, while span arithmetic stays in UTC. Day and week
//! spans are fixed durations; month and year spans follow the calendar.

use chrono::{DateTime, Duration, Months, Utc};
use chrono_tz::Tz;

use crate::error::{CoreError, CoreResult};
use crate::scheduling::types::CalendarViewType;

/// Validate an IANA zone name.
pub fn parse_timezone(timezone: &str) -> CoreResult<Tz> {
    timezone
        .parse::<Tz>()
        .map_err(|_| CoreError::Validation(format!("unknown time zone '{timezone}'")))
}

/// Compute [start, end) for a view anchored at `start`.
pub fn view_bounds(
    view_type: CalendarViewType,
    start: DateTime<Utc>,
    timezone: &str,
) -> CoreResult<(DateTime<Utc>, DateTime<Utc>)> {
    parse_timezone(timezone)?;

    let end = match view_type {
        CalendarViewType::Day => start + Duration::days(1),
        CalendarViewType::Week => start + Duration::weeks(1),
        CalendarViewType::Month => start
            .checked_add_months(Months::new(1))
            .ok_or_else(|| CoreError::Validation("month span overflow".into()))?,
        CalendarViewType::Year => start
            .checked_add_months(Months::new(12))
            .ok_or_else(|| CoreError::Validation("year span overflow".into()))?,
    };
    Ok((start, end))
}
