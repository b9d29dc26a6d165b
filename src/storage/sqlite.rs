//! SQLite-backed store
//!
//! One connection behind a mutex; every statement runs under the lock, which
//! gives the per-target atomicity the alert-state update requires.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::time::Duration;

use super::{prune_cutoff, Store, StoreError};
use crate::alerts::AlertState;
use crate::data::{HealthState, Observation, TargetId};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS observations (
    timestamp_ms INTEGER NOT NULL,
    target_id TEXT NOT NULL,
    http_status INTEGER,
    ttfb_secs REAL,
    total_secs REAL,
    size INTEGER,
    error TEXT
);
CREATE INDEX IF NOT EXISTS idx_observations_target_ts
    ON observations(target_id, timestamp_ms DESC);
CREATE TABLE IF NOT EXISTS alert_state (
    target_id TEXT PRIMARY KEY,
    last_health TEXT NOT NULL,
    settled_health TEXT NOT NULL,
    bad_since_ms INTEGER,
    last_notified_ms INTEGER,
    consecutive_bad INTEGER NOT NULL DEFAULT 0,
    consecutive_good INTEGER NOT NULL DEFAULT 0,
    settled_since_ms INTEGER
);
";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(conn)
    }

    /// Private in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        // databases created before settled_since was tracked
        let has_settled_since = conn
            .prepare("SELECT 1 FROM pragma_table_info('alert_state') WHERE name = 'settled_since_ms'")?
            .exists([])?;
        if !has_settled_since {
            conn.execute_batch("ALTER TABLE alert_state ADD COLUMN settled_since_ms INTEGER")?;
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

fn from_millis(target: &str, ms: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| StoreError::Corrupt {
        target: target.to_string(),
        reason: format!("timestamp {} out of range", ms),
    })
}

fn parse_health(target: &str, raw: &str) -> Result<HealthState, StoreError> {
    raw.parse().map_err(|e: crate::data::ParseHealthError| StoreError::Corrupt {
        target: target.to_string(),
        reason: e.to_string(),
    })
}

fn secs(d: Option<Duration>) -> Option<f64> {
    d.map(|d| d.as_secs_f64())
}

fn from_secs(v: Option<f64>) -> Option<Duration> {
    v.and_then(|s| Duration::try_from_secs_f64(s).ok())
}

struct ObservationRow {
    timestamp_ms: i64,
    target_id: String,
    http_status: Option<i64>,
    ttfb_secs: Option<f64>,
    total_secs: Option<f64>,
    size: Option<i64>,
    error: Option<String>,
}

impl ObservationRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            timestamp_ms: row.get(0)?,
            target_id: row.get(1)?,
            http_status: row.get(2)?,
            ttfb_secs: row.get(3)?,
            total_secs: row.get(4)?,
            size: row.get(5)?,
            error: row.get(6)?,
        })
    }

    fn into_observation(self) -> Result<Observation, StoreError> {
        let timestamp = from_millis(&self.target_id, self.timestamp_ms)?;
        Ok(Observation {
            timestamp,
            http_status: self.http_status.and_then(|s| u16::try_from(s).ok()),
            time_to_first_byte: from_secs(self.ttfb_secs),
            total_duration: from_secs(self.total_secs),
            size: self.size.and_then(|s| u64::try_from(s).ok()),
            error: self.error,
            body_excerpt: None,
            target: TargetId::from_raw(self.target_id),
        })
    }
}

struct AlertRow {
    target_id: String,
    last_health: String,
    settled_health: String,
    bad_since_ms: Option<i64>,
    last_notified_ms: Option<i64>,
    consecutive_bad: i64,
    consecutive_good: i64,
    settled_since_ms: Option<i64>,
}

impl AlertRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            target_id: row.get(0)?,
            last_health: row.get(1)?,
            settled_health: row.get(2)?,
            bad_since_ms: row.get(3)?,
            last_notified_ms: row.get(4)?,
            consecutive_bad: row.get(5)?,
            consecutive_good: row.get(6)?,
            settled_since_ms: row.get(7)?,
        })
    }

    fn into_state(self) -> Result<AlertState, StoreError> {
        let id = self.target_id.as_str();
        Ok(AlertState {
            last_health: parse_health(id, &self.last_health)?,
            settled_health: parse_health(id, &self.settled_health)?,
            settled_since: self.settled_since_ms.map(|ms| from_millis(id, ms)).transpose()?,
            bad_since: self.bad_since_ms.map(|ms| from_millis(id, ms)).transpose()?,
            last_notified: self.last_notified_ms.map(|ms| from_millis(id, ms)).transpose()?,
            consecutive_bad: u32::try_from(self.consecutive_bad).unwrap_or(u32::MAX),
            consecutive_good: u32::try_from(self.consecutive_good).unwrap_or(u32::MAX),
            target: TargetId::from_raw(self.target_id),
        })
    }
}

const ALERT_COLUMNS: &str = "target_id, last_health, settled_health, bad_since_ms, \
     last_notified_ms, consecutive_bad, consecutive_good, settled_since_ms";

const OBSERVATION_COLUMNS: &str =
    "timestamp_ms, target_id, http_status, ttfb_secs, total_secs, size, error";

impl Store for SqliteStore {
    fn get_last_probe_time(&self, target: &TargetId) -> Result<Option<DateTime<Utc>>, StoreError> {
        let conn = self.conn.lock();
        let ms: Option<i64> = conn.query_row(
            "SELECT MAX(timestamp_ms) FROM observations WHERE target_id = ?1",
            params![target.as_str()],
            |row| row.get(0),
        )?;
        ms.map(|ms| from_millis(target.as_str(), ms)).transpose()
    }

    fn save_observation(&self, observation: &Observation) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            &format!(
                "INSERT INTO observations ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                OBSERVATION_COLUMNS
            ),
            params![
                to_millis(observation.timestamp),
                observation.target.as_str(),
                observation.http_status,
                secs(observation.time_to_first_byte),
                secs(observation.total_duration),
                observation.size.and_then(|s| i64::try_from(s).ok()),
                observation.error,
            ],
        )?;
        Ok(())
    }

    fn get_alert_state(&self, target: &TargetId) -> Result<Option<AlertState>, StoreError> {
        let row = {
            let conn = self.conn.lock();
            conn.query_row(
                &format!("SELECT {} FROM alert_state WHERE target_id = ?1", ALERT_COLUMNS),
                params![target.as_str()],
                AlertRow::from_row,
            )
            .optional()?
        };
        row.map(AlertRow::into_state).transpose()
    }

    fn put_alert_state(&self, target: &TargetId, state: &AlertState) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            &format!(
                "INSERT INTO alert_state ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(target_id) DO UPDATE SET
                    last_health = excluded.last_health,
                    settled_health = excluded.settled_health,
                    bad_since_ms = excluded.bad_since_ms,
                    last_notified_ms = excluded.last_notified_ms,
                    consecutive_bad = excluded.consecutive_bad,
                    consecutive_good = excluded.consecutive_good,
                    settled_since_ms = excluded.settled_since_ms",
                ALERT_COLUMNS
            ),
            params![
                target.as_str(),
                state.last_health.as_str(),
                state.settled_health.as_str(),
                state.bad_since.map(to_millis),
                state.last_notified.map(to_millis),
                state.consecutive_bad,
                state.consecutive_good,
                state.settled_since.map(to_millis),
            ],
        )?;
        Ok(())
    }

    fn prune_observations(&self, older_than: Duration, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let cutoff = prune_cutoff(older_than, now);
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM observations WHERE timestamp_ms < ?1",
            params![to_millis(cutoff)],
        )?;
        Ok(deleted)
    }

    fn latest_observation(&self, target: &TargetId) -> Result<Option<Observation>, StoreError> {
        let row = {
            let conn = self.conn.lock();
            conn.query_row(
                &format!(
                    "SELECT {} FROM observations WHERE target_id = ?1
                     ORDER BY timestamp_ms DESC LIMIT 1",
                    OBSERVATION_COLUMNS
                ),
                params![target.as_str()],
                ObservationRow::from_row,
            )
            .optional()?
        };
        row.map(ObservationRow::into_observation).transpose()
    }

    fn list_alert_states(&self) -> Result<Vec<AlertState>, StoreError> {
        let rows = {
            let conn = self.conn.lock();
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM alert_state ORDER BY target_id",
                ALERT_COLUMNS
            ))?;
            let rows = stmt
                .query_map([], AlertRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };
        rows.into_iter().map(AlertRow::into_state).collect()
    }
}
