//! Hysteresis state machine deciding when a target's health change is worth
//! a notification
//!
//! [`evaluate`] is pure: the caller supplies the prior state, the current
//! health and `now`, and gets back the next state plus at most one event. The
//! caller persists the state and attempts delivery. On success it calls
//! [`AlertState::record_delivery`]; on failure it persists
//! [`Evaluation::undelivered`] instead.

use chrono::{DateTime, Utc};
use std::time::Duration;

use super::config::{AlertState, AlertThresholds, EventKind, NotificationEvent};
use crate::data::{HealthState, ObservationSummary, TargetId};

/// Outcome of one evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// State to persist; `last_notified` is carried over from the prior
    pub state: AlertState,
    pub notification: Option<NotificationEvent>,
    /// A candidate that the cooldown suppressed
    pub suppressed: Option<EventKind>,
    /// Settled health and its start before this evaluation
    held: (HealthState, Option<DateTime<Utc>>),
}

impl Evaluation {
    /// State to persist when the notification could not be delivered
    ///
    /// The settled health is rolled back so the same transition is offered
    /// again on the next observation.
    pub fn undelivered(self) -> AlertState {
        let (settled_health, settled_since) = self.held;
        AlertState {
            settled_health,
            settled_since,
            ..self.state
        }
    }
}

/// Time elapsed from `since` to `now`, zero if the clock went backwards
pub fn elapsed(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - since).to_std().unwrap_or(Duration::ZERO)
}

/// Feed one health observation through the state machine
pub fn evaluate(
    target: &TargetId,
    prior: Option<&AlertState>,
    health: HealthState,
    thresholds: &AlertThresholds,
    now: DateTime<Utc>,
    summary: ObservationSummary,
) -> Evaluation {
    let Some(prior) = prior else {
        let state = seed(target, health, now);
        return Evaluation {
            held: (state.settled_health, state.settled_since),
            state,
            notification: None,
            suppressed: None,
        };
    };

    let (consecutive_bad, consecutive_good) = if health.is_bad() {
        (prior.consecutive_bad.saturating_add(1), 0)
    } else {
        (0, prior.consecutive_good.saturating_add(1))
    };

    let bad_since = if health.is_bad() {
        prior.bad_since.or(Some(now))
    } else {
        None
    };

    let settled = prior.settled_health;
    let onset_reached = consecutive_bad >= thresholds.fail_count_to_alert;

    let candidate = if settled.is_bad()
        && health == HealthState::Ok
        && consecutive_good >= thresholds.recover_count
    {
        Some(EventKind::Recovered)
    } else if settled == HealthState::Down && health == HealthState::Slow {
        Some(EventKind::DownToSlow)
    } else if health.is_bad() && settled != health && onset_reached {
        // OK -> SLOW/DOWN or SLOW -> DOWN
        Some(EventKind::onset(health))
    } else if settled.is_bad() && health.is_bad() && onset_reached && !prior.notified_this_episode() {
        Some(EventKind::onset(health))
    } else if settled.is_bad()
        && health.is_bad()
        && prior.notified_this_episode()
        && prior
            .last_notified
            .map(|sent| elapsed(sent, now) >= thresholds.remind_every)
            .unwrap_or(false)
    {
        Some(EventKind::Reminder)
    } else {
        None
    };

    let cooling_down = prior
        .last_notified
        .map(|sent| elapsed(sent, now) < thresholds.cooldown)
        .unwrap_or(false);

    let (notification, suppressed) = match candidate {
        Some(kind) if cooling_down => (None, Some(kind)),
        Some(kind) => (
            Some(NotificationEvent {
                target: target.clone(),
                kind,
                health,
                observation_summary: summary,
            }),
            None,
        ),
        None => (None, None),
    };

    // settled health only moves with an announced transition
    let settled_health = notification
        .as_ref()
        .map(|event| announced(settled, event.kind))
        .unwrap_or(settled);
    let settled_since = match (settled.is_bad(), settled_health.is_bad()) {
        (_, false) => None,
        (false, true) => Some(now),
        (true, true) => prior.settled_since.or(Some(now)),
    };

    Evaluation {
        state: AlertState {
            target: target.clone(),
            last_health: health,
            settled_health,
            settled_since,
            bad_since,
            last_notified: prior.last_notified,
            consecutive_bad,
            consecutive_good,
        },
        notification,
        suppressed,
        held: (settled, prior.settled_since),
    }
}

/// First observation of a target: record it, never notify
fn seed(target: &TargetId, health: HealthState, now: DateTime<Utc>) -> AlertState {
    let bad = health.is_bad();
    AlertState {
        target: target.clone(),
        last_health: health,
        settled_health: health,
        settled_since: bad.then_some(now),
        bad_since: bad.then_some(now),
        last_notified: None,
        consecutive_bad: u32::from(bad),
        consecutive_good: u32::from(!bad),
    }
}

/// Settled health once an event of `kind` has been announced
fn announced(settled: HealthState, kind: EventKind) -> HealthState {
    match kind {
        EventKind::BecameDown => HealthState::Down,
        EventKind::BecameSlow | EventKind::DownToSlow => HealthState::Slow,
        EventKind::Recovered => HealthState::Ok,
        EventKind::Reminder => settled,
    }
}
