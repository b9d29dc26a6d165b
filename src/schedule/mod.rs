//! Probe scheduling policy
//!
//! A probed target is due once its interval has elapsed. A target that has
//! never been probed gets a stable pseudo-random offset within its interval,
//! derived from an MD5 hash of its identity, so that a fleet of new targets
//! sharing one interval is spread out instead of probed in one burst.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::time::Duration;

use crate::alerts::machine::elapsed;
use crate::data::TargetId;

/// Stable hash of a target identity; identical across processes and restarts
pub fn stable_hash(target: &TargetId) -> u128 {
    u128::from_be_bytes(md5::compute(target.as_str().as_bytes()).0)
}

/// Offset of a target's first probe within its interval, in `[0, interval)`
pub fn stable_offset(target: &TargetId, interval: Duration) -> Duration {
    let interval_ms = interval.as_millis();
    if interval_ms == 0 {
        return Duration::ZERO;
    }
    let offset_ms = stable_hash(target) % interval_ms;
    // offset < interval, which came from a Duration, so it fits in u64 millis
    Duration::from_millis(offset_ms as u64)
}

/// Decide whether a target is due for a probe at `now`
///
/// For a never-probed target the virtual last probe is `now - offset`, so the
/// first evaluation never finds it due; [`Scheduler`] carries the anchor
/// forward between cycles.
pub fn is_due(
    target: &TargetId,
    interval: Duration,
    last_probe_time: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    is_due_anchored(target, interval, last_probe_time, now, now)
}

fn is_due_anchored(
    target: &TargetId,
    interval: Duration,
    last_probe_time: Option<DateTime<Utc>>,
    anchor: DateTime<Utc>,
    now: DateTime<Utc>,
) -> bool {
    if interval.is_zero() {
        return true;
    }

    match last_probe_time {
        Some(last) => elapsed(last, now) >= interval,
        None => {
            let offset = stable_offset(target, interval);
            elapsed(anchor, now) + offset >= interval
        }
    }
}

/// Stateful wrapper around [`is_due`] for never-probed targets
///
/// Remembers when each unprobed target was first considered, so its first
/// probe lands at `first_seen + (interval - offset)`.
#[derive(Debug, Default)]
pub struct Scheduler {
    first_seen: DashMap<TargetId, DateTime<Utc>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_due(
        &self,
        target: &TargetId,
        interval: Duration,
        last_probe_time: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> bool {
        if last_probe_time.is_some() {
            self.first_seen.remove(target);
            return is_due_anchored(target, interval, last_probe_time, now, now);
        }

        let anchor = *self.first_seen.entry(target.clone()).or_insert(now);
        is_due_anchored(target, interval, None, anchor, now)
    }

    /// When a never-probed target will first become due
    pub fn first_probe_at(&self, target: &TargetId, interval: Duration) -> Option<DateTime<Utc>> {
        let anchor = *self.first_seen.get(target)?;
        let wait = interval.saturating_sub(stable_offset(target, interval));
        chrono::Duration::from_std(wait).ok().map(|w| anchor + w)
    }

    /// Number of targets still waiting for their first probe
    pub fn pending(&self) -> usize {
        self.first_seen.len()
    }
}
