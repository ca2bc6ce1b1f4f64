//! Sqlite-backed repositories.
//!
//! WAL mode, indexed hot queries, full entities stored as JSON next to the
//! columns the queries filter on. Timestamps are stored as epoch
//! milliseconds so range scans stay numeric. A single connection behind a
//! parking_lot mutex is plenty for a single-node deployment.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags};

use crate::decision::engine::DecisionRecord;
use crate::error::{CoreError, CoreResult};
use crate::models::Platform;
use crate::publishing::notifications::PendingNotification;
use crate::scheduling::types::{ScheduleStatus, ScheduledContent};
use crate::storage::{
    DecisionRepository, PublishingRepository, ScheduleFilter, SchedulingRepository,
};

const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA temp_store = MEMORY;

CREATE TABLE IF NOT EXISTS schedules (
    id TEXT PRIMARY KEY,
    brand_id TEXT NOT NULL,
    status TEXT NOT NULL,
    campaign_id TEXT,
    scheduled_time_ms INTEGER NOT NULL,
    next_attempt_ms INTEGER,
    payload_json TEXT NOT NULL
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_schedules_due
    ON schedules(status, scheduled_time_ms, id);

CREATE INDEX IF NOT EXISTS idx_schedules_brand_time
    ON schedules(brand_id, scheduled_time_ms, id);

CREATE TABLE IF NOT EXISTS notifications (
    id TEXT PRIMARY KEY,
    schedule_id TEXT NOT NULL,
    send_at_ms INTEGER NOT NULL,
    sent INTEGER NOT NULL DEFAULT 0,
    payload_json TEXT NOT NULL
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_notifications_due
    ON notifications(sent, send_at_ms, id);

CREATE TABLE IF NOT EXISTS decisions (
    id TEXT PRIMARY KEY,
    event_id TEXT NOT NULL,
    created_at_ms INTEGER NOT NULL,
    payload_json TEXT NOT NULL
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_decisions_created
    ON decisions(created_at_ms DESC);
"#;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> CoreResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        conn.execute_batch(SCHEMA_SQL)?;
        tracing::info!(path = %path.display(), "sqlite store ready");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn ms(time: DateTime<Utc>) -> i64 {
        time.timestamp_millis()
    }

    fn decode_schedule(payload: &str) -> CoreResult<ScheduledContent> {
        Ok(serde_json::from_str(payload)?)
    }

    fn write_schedule(conn: &Connection, schedule: &ScheduledContent) -> CoreResult<()> {
        let payload = serde_json::to_string(schedule)?;
        conn.execute(
            "INSERT INTO schedules
                 (id, brand_id, status, campaign_id, scheduled_time_ms, next_attempt_ms, payload_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                 brand_id = excluded.brand_id,
                 status = excluded.status,
                 campaign_id = excluded.campaign_id,
                 scheduled_time_ms = excluded.scheduled_time_ms,
                 next_attempt_ms = excluded.next_attempt_ms,
                 payload_json = excluded.payload_json",
            params![
                schedule.id,
                schedule.brand_id,
                schedule.status.as_str(),
                schedule.campaign_id,
                Self::ms(schedule.scheduled_time),
                schedule.next_attempt_at.map(Self::ms),
                payload,
            ],
        )?;
        Ok(())
    }

    fn query_schedules(
        conn: &Connection,
        sql: &str,
        bind: impl FnOnce(&mut rusqlite::Statement<'_>) -> rusqlite::Result<Vec<String>>,
    ) -> CoreResult<Vec<ScheduledContent>> {
        let mut statement = conn.prepare_cached(sql)?;
        let payloads = bind(&mut statement)?;
        payloads
            .iter()
            .map(|payload| Self::decode_schedule(payload))
            .collect()
    }
}

#[async_trait::async_trait]
impl SchedulingRepository for SqliteStore {
    async fn create(&self, schedule: &ScheduledContent) -> CoreResult<()> {
        let conn = self.conn.lock();
        let exists: bool = conn
            .prepare_cached("SELECT 1 FROM schedules WHERE id = ?1")?
            .exists(params![schedule.id])?;
        if exists {
            return Err(CoreError::Storage(format!(
                "schedule {} already exists",
                schedule.id
            )));
        }
        Self::write_schedule(&conn, schedule)
    }

    async fn update(&self, schedule: &ScheduledContent) -> CoreResult<()> {
        let conn = self.conn.lock();
        let exists: bool = conn
            .prepare_cached("SELECT 1 FROM schedules WHERE id = ?1")?
            .exists(params![schedule.id])?;
        if !exists {
            return Err(CoreError::not_found("schedule", &schedule.id));
        }
        Self::write_schedule(&conn, schedule)
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        let conn = self.conn.lock();
        let affected = conn.execute("DELETE FROM schedules WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(CoreError::not_found("schedule", id));
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> CoreResult<Option<ScheduledContent>> {
        let conn = self.conn.lock();
        let payload: Option<String> = conn
            .prepare_cached("SELECT payload_json FROM schedules WHERE id = ?1")?
            .query_row(params![id], |row| row.get(0))
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        payload.map(|p| Self::decode_schedule(&p)).transpose()
    }

    async fn list(&self, filter: &ScheduleFilter) -> CoreResult<Vec<ScheduledContent>> {
        let conn = self.conn.lock();
        let rows = Self::query_schedules(
            &conn,
            "SELECT payload_json FROM schedules ORDER BY scheduled_time_ms, id",
            |statement| {
                statement
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect()
            },
        )?;
        // Vec/option filters are applied over the decoded payloads
        Ok(rows
            .into_iter()
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
            .collect())
    }

    async fn list_in_range(
        &self,
        brand_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CoreResult<Vec<ScheduledContent>> {
        let conn = self.conn.lock();
        Self::query_schedules(
            &conn,
            "SELECT payload_json FROM schedules
             WHERE brand_id = ?1 AND scheduled_time_ms >= ?2 AND scheduled_time_ms < ?3
             ORDER BY scheduled_time_ms, id",
            |statement| {
                statement
                    .query_map(
                        params![brand_id, Self::ms(start), Self::ms(end)],
                        |row| row.get::<_, String>(0),
                    )?
                    .collect()
            },
        )
    }

    async fn list_conflicting(
        &self,
        brand_id: &str,
        platforms: &[Platform],
        around: DateTime<Utc>,
        window: Duration,
    ) -> CoreResult<Vec<ScheduledContent>> {
        let conn = self.conn.lock();
        let rows = Self::query_schedules(
            &conn,
            "SELECT payload_json FROM schedules
             WHERE brand_id = ?1
               AND scheduled_time_ms >= ?2 AND scheduled_time_ms <= ?3
               AND status NOT IN ('published', 'cancelled', 'failed')
             ORDER BY scheduled_time_ms, id",
            |statement| {
                statement
                    .query_map(
                        params![
                            brand_id,
                            Self::ms(around - window),
                            Self::ms(around + window)
                        ],
                        |row| row.get::<_, String>(0),
                    )?
                    .collect()
            },
        )?;
        Ok(rows
            .into_iter()
            .filter(|s| s.platforms.iter().any(|p| platforms.contains(p)))
            .collect())
    }

    async fn count_for_platform(
        &self,
        brand_id: &str,
        platform: Platform,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CoreResult<u32> {
        let conn = self.conn.lock();
        let rows = Self::query_schedules(
            &conn,
            "SELECT payload_json FROM schedules
             WHERE brand_id = ?1 AND scheduled_time_ms >= ?2 AND scheduled_time_ms < ?3
               AND status NOT IN ('cancelled', 'failed')
             ORDER BY scheduled_time_ms, id",
            |statement| {
                statement
                    .query_map(
                        params![brand_id, Self::ms(start), Self::ms(end)],
                        |row| row.get::<_, String>(0),
                    )?
                    .collect()
            },
        )?;
        Ok(rows
            .into_iter()
            .filter(|s| s.platforms.contains(&platform))
            .count() as u32)
    }
}

#[async_trait::async_trait]
impl PublishingRepository for SqliteStore {
    async fn compare_and_set_status(
        &self,
        id: &str,
        from: ScheduleStatus,
        to: ScheduleStatus,
    ) -> CoreResult<bool> {
        let conn = self.conn.lock();
        let payload: String = conn
            .prepare_cached("SELECT payload_json FROM schedules WHERE id = ?1")?
            .query_row(params![id], |row| row.get(0))
            .map_err(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => CoreError::not_found("schedule", id),
                other => other.into(),
            })?;
        let mut schedule = Self::decode_schedule(&payload)?;
        if schedule.status != from {
            return Ok(false);
        }
        schedule.status = to;
        let payload = serde_json::to_string(&schedule)?;
        // Guarded write: only flips when the stored status is still `from`
        let affected = conn.execute(
            "UPDATE schedules SET status = ?2, payload_json = ?3
             WHERE id = ?1 AND status = ?4",
            params![id, to.as_str(), payload, from.as_str()],
        )?;
        Ok(affected == 1)
    }

    async fn update_publish_state(&self, schedule: &ScheduledContent) -> CoreResult<()> {
        let conn = self.conn.lock();
        let payload: String = conn
            .prepare_cached("SELECT payload_json FROM schedules WHERE id = ?1")?
            .query_row(params![schedule.id], |row| row.get(0))
            .map_err(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => {
                    CoreError::not_found("schedule", &schedule.id)
                }
                other => other.into(),
            })?;
        let mut stored = Self::decode_schedule(&payload)?;
        stored.status = schedule.status;
        stored.retry_count = schedule.retry_count;
        stored.next_attempt_at = schedule.next_attempt_at;
        stored.notifications_sent = schedule.notifications_sent.clone();
        stored.failure_reason = schedule.failure_reason.clone();
        stored.updated_at = schedule.updated_at;
        Self::write_schedule(&conn, &stored)
    }

    async fn due_for_publishing(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> CoreResult<Vec<ScheduledContent>> {
        let conn = self.conn.lock();
        Self::query_schedules(
            &conn,
            "SELECT payload_json FROM schedules
             WHERE status = 'scheduled'
               AND scheduled_time_ms <= ?1
               AND (next_attempt_ms IS NULL OR next_attempt_ms <= ?1)
             ORDER BY scheduled_time_ms, id
             LIMIT ?2",
            |statement| {
                statement
                    .query_map(params![Self::ms(now), limit as i64], |row| {
                        row.get::<_, String>(0)
                    })?
                    .collect()
            },
        )
    }

    async fn register_notification(&self, notification: &PendingNotification) -> CoreResult<()> {
        let conn = self.conn.lock();
        let payload = serde_json::to_string(notification)?;
        conn.execute(
            "INSERT INTO notifications (id, schedule_id, send_at_ms, sent, payload_json)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                 send_at_ms = excluded.send_at_ms,
                 sent = excluded.sent,
                 payload_json = excluded.payload_json",
            params![
                notification.id,
                notification.schedule_id,
                Self::ms(notification.send_at),
                notification.sent as i64,
                payload,
            ],
        )?;
        Ok(())
    }

    async fn due_notifications(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> CoreResult<Vec<PendingNotification>> {
        let conn = self.conn.lock();
        let mut statement = conn.prepare_cached(
            "SELECT payload_json FROM notifications
             WHERE sent = 0 AND send_at_ms <= ?1
             ORDER BY send_at_ms, id
             LIMIT ?2",
        )?;
        let payloads: Vec<String> = statement
            .query_map(params![Self::ms(now), limit as i64], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        payloads
            .iter()
            .map(|p| Ok(serde_json::from_str(p)?))
            .collect()
    }

    async fn mark_notification_sent(&self, id: &str) -> CoreResult<()> {
        let conn = self.conn.lock();
        let payload: String = conn
            .prepare_cached("SELECT payload_json FROM notifications WHERE id = ?1")?
            .query_row(params![id], |row| row.get(0))
            .map_err(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => {
                    CoreError::not_found("notification", id)
                }
                other => other.into(),
            })?;
        let mut notification: PendingNotification = serde_json::from_str(&payload)?;
        notification.sent = true;
        let payload = serde_json::to_string(&notification)?;
        conn.execute(
            "UPDATE notifications SET sent = 1, payload_json = ?2 WHERE id = ?1",
            params![id, payload],
        )?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl DecisionRepository for SqliteStore {
    async fn record_decision(&self, record: &DecisionRecord) -> CoreResult<()> {
        let conn = self.conn.lock();
        let payload = serde_json::to_string(record)?;
        conn.execute(
            "INSERT OR REPLACE INTO decisions (id, event_id, created_at_ms, payload_json)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.id,
                record.event_id,
                Self::ms(record.created_at),
                payload
            ],
        )?;
        Ok(())
    }

    async fn get_decision(&self, id: &str) -> CoreResult<Option<DecisionRecord>> {
        let conn = self.conn.lock();
        let payload: Option<String> = conn
            .prepare_cached("SELECT payload_json FROM decisions WHERE id = ?1")?
            .query_row(params![id], |row| row.get(0))
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        payload
            .map(|p| Ok(serde_json::from_str(&p)?))
            .transpose()
    }

    async fn list_recent(&self, limit: usize) -> CoreResult<Vec<DecisionRecord>> {
        let conn = self.conn.lock();
        let mut statement = conn.prepare_cached(
            "SELECT payload_json FROM decisions ORDER BY created_at_ms DESC, id LIMIT ?1",
        )?;
        let payloads: Vec<String> = statement
            .query_map(params![limit as i64], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        payloads
            .iter()
            .map(|p| Ok(serde_json::from_str(p)?))
            .collect()
    }
}
