//! Durable store for observations and alert state

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::alerts::AlertState;
use crate::data::{Observation, TargetId};

/// Persistence interface consumed by the run orchestrator
///
/// `put_alert_state` must replace a target's state atomically; readers never
/// see a half-written row.
pub trait Store: Send + Sync {
    /// Timestamp of the newest observation for a target
    fn get_last_probe_time(&self, target: &TargetId) -> Result<Option<DateTime<Utc>>, StoreError>;

    /// Append an observation
    fn save_observation(&self, observation: &Observation) -> Result<(), StoreError>;

    fn get_alert_state(&self, target: &TargetId) -> Result<Option<AlertState>, StoreError>;

    fn put_alert_state(&self, target: &TargetId, state: &AlertState) -> Result<(), StoreError>;

    /// Delete observations older than `now - older_than`, returning how many
    fn prune_observations(&self, older_than: Duration, now: DateTime<Utc>) -> Result<usize, StoreError>;

    /// Newest observation for a target
    fn latest_observation(&self, target: &TargetId) -> Result<Option<Observation>, StoreError>;

    /// All stored alert states
    fn list_alert_states(&self) -> Result<Vec<AlertState>, StoreError>;
}

/// Cutoff instant for pruning
pub(crate) fn prune_cutoff(older_than: Duration, now: DateTime<Utc>) -> DateTime<Utc> {
    chrono::Duration::from_std(older_than)
        .ok()
        .and_then(|d| now.checked_sub_signed(d))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Corrupt record for {target}: {reason}")]
    Corrupt { target: String, reason: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
