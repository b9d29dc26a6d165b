use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::time::Duration;

use super::{prune_cutoff, Store, StoreError};
use crate::alerts::AlertState;
use crate::data::{Observation, TargetId};

/// In-process store, lost on restart
///
/// Each target's observations are kept in timestamp order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    observations: DashMap<TargetId, Vec<Observation>>,
    alert_states: DashMap<TargetId, AlertState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total observations across all targets
    pub fn observation_count(&self) -> usize {
        self.observations.iter().map(|e| e.value().len()).sum()
    }

    /// Observations for one target, oldest first
    pub fn observations(&self, target: &TargetId) -> Vec<Observation> {
        self.observations
            .get(target)
            .map(|obs| obs.clone())
            .unwrap_or_default()
    }
}

impl Store for MemoryStore {
    fn get_last_probe_time(&self, target: &TargetId) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self
            .observations
            .get(target)
            .and_then(|obs| obs.last().map(|o| o.timestamp)))
    }

    fn save_observation(&self, observation: &Observation) -> Result<(), StoreError> {
        let mut entry = self.observations.entry(observation.target.clone()).or_default();
        // keep timestamp order even if probes finish out of order
        let pos = entry.partition_point(|o| o.timestamp <= observation.timestamp);
        entry.insert(pos, observation.clone());
        Ok(())
    }

    fn get_alert_state(&self, target: &TargetId) -> Result<Option<AlertState>, StoreError> {
        Ok(self.alert_states.get(target).map(|s| s.clone()))
    }

    fn put_alert_state(&self, target: &TargetId, state: &AlertState) -> Result<(), StoreError> {
        self.alert_states.insert(target.clone(), state.clone());
        Ok(())
    }

    fn prune_observations(&self, older_than: Duration, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let cutoff = prune_cutoff(older_than, now);
        let mut deleted = 0;

        for mut entry in self.observations.iter_mut() {
            let before = entry.len();
            entry.retain(|o| o.timestamp >= cutoff);
            deleted += before - entry.len();
        }
        self.observations.retain(|_, obs| !obs.is_empty());

        Ok(deleted)
    }

    fn latest_observation(&self, target: &TargetId) -> Result<Option<Observation>, StoreError> {
        Ok(self
            .observations
            .get(target)
            .and_then(|obs| obs.last().cloned()))
    }

    fn list_alert_states(&self) -> Result<Vec<AlertState>, StoreError> {
        Ok(self.alert_states.iter().map(|e| e.value().clone()).collect())
    }
}
