//! One evaluation cycle over the configured targets

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::alerts::{classify_verdict, evaluate, format_message, EventKind, Notify};
use crate::config::{MonitorConfig, TargetConfig};
use crate::data::{HealthState, Observation, TargetId};
use crate::probe::Probe;
use crate::schedule::Scheduler;
use crate::storage::{Store, StoreError};

/// Extra time a probe gets beyond the request timeout before it is abandoned
const DEFAULT_PROBE_GRACE: Duration = Duration::from_secs(5);

/// What happened during one cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleReport {
    pub started_at: Option<DateTime<Utc>>,
    /// Targets selected after scheduling and the per-cycle cap
    pub due: usize,
    /// Targets whose evaluation completed
    pub probed: usize,
    pub ok: usize,
    pub slow: usize,
    pub down: usize,
    pub notifications_sent: usize,
    pub notifications_failed: usize,
    pub suppressed: usize,
    pub pruned: usize,
    /// Per-target failures; none of them stopped the cycle
    pub failures: Vec<(TargetId, String)>,
}

impl CycleReport {
    fn count_health(&mut self, health: HealthState) {
        match health {
            HealthState::Ok => self.ok += 1,
            HealthState::Slow => self.slow += 1,
            HealthState::Down => self.down += 1,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result of a target whose state was persisted
struct TargetOutcome {
    health: HealthState,
    delivered: Option<bool>,
    suppressed: Option<EventKind>,
    /// Delivery was attempted but recording its outcome failed
    late_failure: Option<RunError>,
}

/// Drives probe, classify, evaluate, persist and notify for every due target
pub struct Runner {
    config: Arc<MonitorConfig>,
    store: Arc<dyn Store>,
    prober: Arc<dyn Probe>,
    notifier: Arc<dyn Notify>,
    scheduler: Scheduler,
    probe_grace: Duration,
    cycle_lock: Mutex<()>,
}

impl Runner {
    pub fn new(
        config: Arc<MonitorConfig>,
        store: Arc<dyn Store>,
        prober: Arc<dyn Probe>,
        notifier: Arc<dyn Notify>,
    ) -> Self {
        Self {
            config,
            store,
            prober,
            notifier,
            scheduler: Scheduler::new(),
            probe_grace: DEFAULT_PROBE_GRACE,
            cycle_lock: Mutex::new(()),
        }
    }

    pub fn with_probe_grace(mut self, grace: Duration) -> Self {
        self.probe_grace = grace;
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Run one full cycle at `now`
    ///
    /// Concurrent calls are serialized; a cycle always runs to completion.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> CycleReport {
        let _guard = self.cycle_lock.lock().await;

        let mut report = CycleReport {
            started_at: Some(now),
            ..CycleReport::default()
        };

        let due = self.due_targets(now, &mut report);
        report.due = due.len();

        if due.is_empty() {
            tracing::debug!(pending = self.scheduler.pending(), "No targets due");
        } else {
            tracing::info!("Checking {} targets", due.len());
        }

        let workers = self.config.defaults.max_workers.max(1);
        let results: Vec<(TargetId, Result<TargetOutcome, RunError>)> = stream::iter(due.into_iter().cloned())
            .map(|target: TargetConfig| async move {
                let result = self.process_target(&target, now).await;
                (target.id, result)
            })
            .buffer_unordered(workers)
            .collect()
            .await;

        for (id, result) in results {
            match result {
                Ok(outcome) => {
                    report.probed += 1;
                    report.count_health(outcome.health);
                    match outcome.delivered {
                        Some(true) => report.notifications_sent += 1,
                        Some(false) => report.notifications_failed += 1,
                        None => {}
                    }
                    if outcome.suppressed.is_some() {
                        report.suppressed += 1;
                    }
                    if let Some(e) = outcome.late_failure {
                        report.failures.push((id, e.to_string()));
                    }
                }
                Err(e) => {
                    tracing::error!(target_id = %id, error = %e, "Target evaluation failed");
                    report.failures.push((id, e.to_string()));
                }
            }
        }

        match self
            .store
            .prune_observations(self.config.defaults.retention(), now)
        {
            Ok(deleted) => {
                report.pruned = deleted;
                if deleted > 0 {
                    tracing::info!("Pruned {} old observations", deleted);
                }
            }
            Err(e) => tracing::error!(error = %e, "Failed to prune observations"),
        }

        tracing::info!(
            due = report.due,
            probed = report.probed,
            ok = report.ok,
            slow = report.slow,
            down = report.down,
            sent = report.notifications_sent,
            failed = report.failures.len(),
            "Cycle complete"
        );

        report
    }

    /// Due targets in configuration order, each at most once, capped
    fn due_targets(&self, now: DateTime<Utc>, report: &mut CycleReport) -> Vec<&TargetConfig> {
        let mut seen = HashSet::new();
        let mut due = Vec::new();

        for target in &self.config.targets {
            if due.len() >= self.config.defaults.max_checks_per_run {
                break;
            }
            if !seen.insert(&target.id) {
                continue;
            }

            let last = match self.store.get_last_probe_time(&target.id) {
                Ok(last) => last,
                Err(e) => {
                    tracing::error!(target_id = %target.id, error = %e, "Failed to read last probe time");
                    report.failures.push((target.id.clone(), e.to_string()));
                    continue;
                }
            };

            if self.scheduler.is_due(&target.id, target.interval, last, now) {
                due.push(target);
            }
        }

        due
    }

    async fn probe_with_deadline(&self, target: &TargetConfig, now: DateTime<Utc>) -> Observation {
        let timeout = self.config.defaults.timeout;
        let mut observation =
            match tokio::time::timeout(timeout + self.probe_grace, self.prober.probe(target)).await {
                Ok(observation) => observation,
                Err(_) => {
                    tracing::warn!(target_id = %target.id, "Probe abandoned after deadline");
                    Observation::failed(
                        target.id.clone(),
                        now,
                        format!("Timeout after {}s", timeout.as_secs_f64()),
                    )
                }
            };
        // scheduling compares against the cycle instant
        observation.timestamp = now;
        observation
    }

    async fn process_target(&self, target: &TargetConfig, now: DateTime<Utc>) -> Result<TargetOutcome, RunError> {
        let observation = self.probe_with_deadline(target, now).await;
        let verdict = classify_verdict(&observation, &target.expectations, &target.thresholds);

        let mut summary = observation.summary();
        if summary.error.is_none() {
            summary.error = verdict.reason.clone();
        }

        let prior = self.store.get_alert_state(&target.id)?;
        let evaluation = evaluate(
            &target.id,
            prior.as_ref(),
            verdict.health,
            &target.thresholds,
            now,
            summary,
        );

        // nothing counts as applied until both writes succeed
        self.store.save_observation(&observation)?;
        self.store.put_alert_state(&target.id, &evaluation.state)?;

        tracing::debug!(
            target_id = %target.id,
            health = %verdict.health,
            settled = %evaluation.state.settled_health,
            consecutive_bad = evaluation.state.consecutive_bad,
            consecutive_good = evaluation.state.consecutive_good,
            "Evaluated"
        );

        if let Some(kind) = evaluation.suppressed {
            tracing::info!(target_id = %target.id, event = %kind, "Notification suppressed by cooldown");
        }

        let mut outcome = TargetOutcome {
            health: verdict.health,
            delivered: None,
            suppressed: evaluation.suppressed,
            late_failure: None,
        };

        let Some(event) = evaluation.notification.clone() else {
            return Ok(outcome);
        };

        let message = format_message(&event, Some(&target.url));
        let delivered = self.notifier.notify(&message).await;
        outcome.delivered = Some(delivered);

        let state = if delivered {
            tracing::info!(target_id = %target.id, event = %event.kind, "Notification sent");
            let mut state = evaluation.state;
            state.record_delivery(now);
            state
        } else {
            tracing::warn!(target_id = %target.id, event = %event.kind, "Notification not delivered, will retry");
            evaluation.undelivered()
        };

        if let Err(e) = self.store.put_alert_state(&target.id, &state) {
            tracing::error!(target_id = %target.id, error = %e, "Failed to record delivery outcome");
            outcome.late_failure = Some(e.into());
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{AlertState, AlertThresholds};
    use crate::config::Defaults;
    use crate::data::HealthState::{Down, Ok as Up, Slow};
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Replays a scripted health sequence per target
    #[derive(Default)]
    struct ScriptedProbe {
        script: SyncMutex<HashMap<TargetId, VecDeque<HealthState>>>,
        delay: Duration,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    impl ScriptedProbe {
        fn with_script(target: &TargetId, healths: &[HealthState]) -> Self {
            let probe = Self::default();
            probe.push(target, healths);
            probe
        }

        fn push(&self, target: &TargetId, healths: &[HealthState]) {
            self.script
                .lock()
                .entry(target.clone())
                .or_default()
                .extend(healths.iter().copied());
        }
    }

    #[async_trait]
    impl Probe for ScriptedProbe {
        async fn probe(&self, target: &TargetConfig) -> Observation {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let health = self
                .script
                .lock()
                .get_mut(&target.id)
                .and_then(|q| q.pop_front())
                .unwrap_or(HealthState::Ok);

            let obs = Observation::new(target.id.clone(), Utc::now());
            match health {
                HealthState::Ok => obs
                    .with_status(200)
                    .with_timing(Duration::from_millis(100), Duration::from_millis(200)),
                HealthState::Slow => obs
                    .with_status(200)
                    .with_timing(Duration::from_secs(2), Duration::from_secs(3)),
                HealthState::Down => obs.with_error("connection refused"),
            }
        }
    }

    struct HangingProbe;

    #[async_trait]
    impl Probe for HangingProbe {
        async fn probe(&self, target: &TargetConfig) -> Observation {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Observation::new(target.id.clone(), Utc::now()).with_status(200)
        }
    }

    struct RecordingNotifier {
        messages: SyncMutex<Vec<String>>,
        deliver: AtomicBool,
    }

    impl RecordingNotifier {
        fn new(deliver: bool) -> Self {
            Self {
                messages: SyncMutex::new(Vec::new()),
                deliver: AtomicBool::new(deliver),
            }
        }

        fn messages(&self) -> Vec<String> {
            self.messages.lock().clone()
        }
    }

    #[async_trait]
    impl Notify for RecordingNotifier {
        async fn notify(&self, message: &str) -> bool {
            self.messages.lock().push(message.to_string());
            self.deliver.load(Ordering::SeqCst)
        }
    }

    /// Store whose alert-state writes fail for one target
    struct FlakyStore {
        inner: MemoryStore,
        broken: TargetId,
    }

    impl Store for FlakyStore {
        fn get_last_probe_time(&self, target: &TargetId) -> Result<Option<DateTime<Utc>>, StoreError> {
            self.inner.get_last_probe_time(target)
        }
        fn save_observation(&self, observation: &Observation) -> Result<(), StoreError> {
            self.inner.save_observation(observation)
        }
        fn get_alert_state(&self, target: &TargetId) -> Result<Option<AlertState>, StoreError> {
            self.inner.get_alert_state(target)
        }
        fn put_alert_state(&self, target: &TargetId, state: &AlertState) -> Result<(), StoreError> {
            if *target == self.broken {
                return Err(StoreError::Unavailable("disk full".into()));
            }
            self.inner.put_alert_state(target, state)
        }
        fn prune_observations(&self, older_than: Duration, now: DateTime<Utc>) -> Result<usize, StoreError> {
            self.inner.prune_observations(older_than, now)
        }
        fn latest_observation(&self, target: &TargetId) -> Result<Option<Observation>, StoreError> {
            self.inner.latest_observation(target)
        }
        fn list_alert_states(&self) -> Result<Vec<AlertState>, StoreError> {
            self.inner.list_alert_states()
        }
    }

    fn thresholds() -> AlertThresholds {
        AlertThresholds::default()
            .with_counts(2, 2)
            .with_cooldown(Duration::from_secs(300))
            .with_remind_every(Duration::from_secs(3600))
    }

    /// Targets with a zero interval are due every cycle
    fn every_cycle(page: &str) -> TargetConfig {
        TargetConfig::new("shop", page, format!("https://shop.example/{}", page), Duration::ZERO)
            .with_thresholds(thresholds())
    }

    fn config(defaults: Defaults, targets: Vec<TargetConfig>) -> Arc<MonitorConfig> {
        Arc::new(MonitorConfig::from_targets(defaults, targets).unwrap())
    }

    fn minutes(n: i64) -> chrono::Duration {
        chrono::Duration::minutes(n)
    }

    #[tokio::test]
    async fn test_end_to_end_down_and_recovered() {
        let target = every_cycle("home");
        let probe = Arc::new(ScriptedProbe::with_script(&target.id, &[Up, Down, Down, Up, Up]));
        let notifier = Arc::new(RecordingNotifier::new(true));
        let store = Arc::new(MemoryStore::new());
        let runner = Runner::new(
            config(Defaults::default(), vec![target.clone()]),
            store.clone(),
            probe,
            notifier.clone(),
        );

        let start = Utc::now();
        let mut sent_after = Vec::new();
        for i in 0..5 {
            let report = runner.run_cycle(start + minutes(10 * i)).await;
            assert_eq!(report.probed, 1);
            assert!(report.failures.is_empty());
            sent_after.push(notifier.messages().len());
        }

        assert_eq!(sent_after, vec![0, 0, 1, 1, 2]);
        let messages = notifier.messages();
        assert!(messages[0].starts_with("🔴 DOWN"));
        assert!(messages[0].contains("Error: connection refused"));
        assert!(messages[1].starts_with("🟢 RECOVERED"));

        let state = store.get_alert_state(&target.id).unwrap().unwrap();
        assert_eq!(state.settled_health, Up);
        assert_eq!(state.last_notified, Some(start + minutes(40)));
        assert_eq!(store.observations(&target.id).len(), 5);
    }

    #[tokio::test]
    async fn test_slow_onset_reports_latency() {
        let target = every_cycle("home");
        let probe = Arc::new(ScriptedProbe::with_script(&target.id, &[Up, Slow, Slow]));
        let notifier = Arc::new(RecordingNotifier::new(true));
        let runner = Runner::new(
            config(Defaults::default(), vec![target]),
            Arc::new(MemoryStore::new()),
            probe,
            notifier.clone(),
        );

        let start = Utc::now();
        let mut report = CycleReport::default();
        for i in 0..3 {
            report = runner.run_cycle(start + minutes(i)).await;
        }

        assert_eq!(report.slow, 1);
        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("🟠 SLOW"));
        assert!(messages[0].contains("TTFB: 2.000s"));
        assert!(messages[0].contains("over warning latency"));
    }

    #[tokio::test]
    async fn test_cap_keeps_configuration_order() {
        let targets: Vec<_> = (0..5).map(|n| every_cycle(&format!("p{}", n))).collect();
        let probe = Arc::new(ScriptedProbe::default());
        let defaults = Defaults {
            max_checks_per_run: 3,
            ..Defaults::default()
        };
        let store = Arc::new(MemoryStore::new());
        let runner = Runner::new(
            config(defaults, targets.clone()),
            store.clone(),
            probe.clone(),
            Arc::new(RecordingNotifier::new(true)),
        );

        let report = runner.run_cycle(Utc::now()).await;
        assert_eq!(report.due, 3);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 3);
        for (n, target) in targets.iter().enumerate() {
            let probed = store.latest_observation(&target.id).unwrap().is_some();
            assert_eq!(probed, n < 3, "{}", target.id);
        }
    }

    #[tokio::test]
    async fn test_parallelism_is_bounded() {
        let targets: Vec<_> = (0..8).map(|n| every_cycle(&format!("p{}", n))).collect();
        let probe = Arc::new(ScriptedProbe {
            delay: Duration::from_millis(30),
            ..ScriptedProbe::default()
        });
        let defaults = Defaults {
            max_workers: 2,
            max_checks_per_run: 8,
            ..Defaults::default()
        };
        let runner = Runner::new(
            config(defaults, targets),
            Arc::new(MemoryStore::new()),
            probe.clone(),
            Arc::new(RecordingNotifier::new(true)),
        );

        let report = runner.run_cycle(Utc::now()).await;
        assert_eq!(report.probed, 8);
        assert_eq!(probe.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_store_failure_is_isolated() {
        let broken = every_cycle("broken");
        let fine = every_cycle("fine");
        let probe = Arc::new(ScriptedProbe::default());
        probe.push(&broken.id, &[Down, Down, Down]);
        probe.push(&fine.id, &[Up, Down, Down]);

        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            broken: broken.id.clone(),
        });
        let notifier = Arc::new(RecordingNotifier::new(true));
        let runner = Runner::new(
            config(Defaults::default(), vec![broken.clone(), fine.clone()]),
            store.clone(),
            probe,
            notifier.clone(),
        );

        let start = Utc::now();
        let mut report = CycleReport::default();
        for i in 0..3 {
            report = runner.run_cycle(start + minutes(i)).await;
        }

        assert_eq!(report.probed, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, broken.id);
        assert!(report.failures[0].1.contains("disk full"));

        // an unpersisted state is never treated as applied
        assert!(store.get_alert_state(&broken.id).unwrap().is_none());
        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Page: fine"));
    }

    #[tokio::test]
    async fn test_failed_delivery_is_retried() {
        let target = every_cycle("home");
        let probe = Arc::new(ScriptedProbe::with_script(&target.id, &[Up, Down, Down, Down]));
        let notifier = Arc::new(RecordingNotifier::new(false));
        let store = Arc::new(MemoryStore::new());
        let runner = Runner::new(
            config(Defaults::default(), vec![target.clone()]),
            store.clone(),
            probe,
            notifier.clone(),
        );

        let start = Utc::now();
        runner.run_cycle(start).await;
        runner.run_cycle(start + minutes(1)).await;
        let report = runner.run_cycle(start + minutes(2)).await;
        assert_eq!(report.notifications_failed, 1);
        assert_eq!(store.get_alert_state(&target.id).unwrap().unwrap().last_notified, None);

        notifier.deliver.store(true, Ordering::SeqCst);
        let report = runner.run_cycle(start + minutes(3)).await;
        assert_eq!(report.notifications_sent, 1);
        assert_eq!(
            store.get_alert_state(&target.id).unwrap().unwrap().last_notified,
            Some(start + minutes(3))
        );
        assert_eq!(notifier.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_recovery_is_retried() {
        let target = every_cycle("home");
        let probe = Arc::new(ScriptedProbe::with_script(&target.id, &[Up, Down, Down, Up, Up, Up, Up]));
        let notifier = Arc::new(RecordingNotifier::new(true));
        let store = Arc::new(MemoryStore::new());
        let runner = Runner::new(
            config(Defaults::default(), vec![target.clone()]),
            store.clone(),
            probe,
            notifier.clone(),
        );

        let start = Utc::now();
        for i in 0..4 {
            runner.run_cycle(start + minutes(10 * i)).await;
        }
        assert_eq!(notifier.messages().len(), 1);

        notifier.deliver.store(false, Ordering::SeqCst);
        let report = runner.run_cycle(start + minutes(40)).await;
        assert_eq!(report.notifications_failed, 1);
        let state = store.get_alert_state(&target.id).unwrap().unwrap();
        assert_eq!(state.settled_health, Down);
        assert_eq!(state.last_notified, Some(start + minutes(20)));

        notifier.deliver.store(true, Ordering::SeqCst);
        let report = runner.run_cycle(start + minutes(50)).await;
        assert_eq!(report.notifications_sent, 1);
        let state = store.get_alert_state(&target.id).unwrap().unwrap();
        assert_eq!(state.settled_health, Up);
        assert_eq!(state.last_notified, Some(start + minutes(50)));

        runner.run_cycle(start + minutes(60)).await;
        let messages = notifier.messages();
        assert_eq!(messages.len(), 3);
        assert!(messages[1].starts_with("🟢 RECOVERED"));
        assert!(messages[2].starts_with("🟢 RECOVERED"));
    }

    #[tokio::test]
    async fn test_ok_blip_sends_one_down_alert() {
        let target = every_cycle("home").with_thresholds(thresholds().with_counts(2, 3));
        let probe = Arc::new(ScriptedProbe::with_script(&target.id, &[Up, Down, Down, Up, Down, Down]));
        let notifier = Arc::new(RecordingNotifier::new(true));
        let runner = Runner::new(
            config(Defaults::default(), vec![target]),
            Arc::new(MemoryStore::new()),
            probe,
            notifier.clone(),
        );

        let start = Utc::now();
        for i in 0..6 {
            runner.run_cycle(start + minutes(10 * i)).await;
        }

        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("🔴 DOWN"));
    }

    #[tokio::test]
    async fn test_hanging_probe_becomes_down() {
        let target = every_cycle("home");
        let defaults = Defaults {
            timeout: Duration::from_millis(50),
            ..Defaults::default()
        };
        let store = Arc::new(MemoryStore::new());
        let runner = Runner::new(
            config(defaults, vec![target.clone()]),
            store.clone(),
            Arc::new(HangingProbe),
            Arc::new(RecordingNotifier::new(true)),
        )
        .with_probe_grace(Duration::ZERO);

        let report = runner.run_cycle(Utc::now()).await;
        assert_eq!(report.down, 1);

        let obs = store.latest_observation(&target.id).unwrap().unwrap();
        assert_eq!(obs.error.as_deref(), Some("Timeout after 0.05s"));
        let state = store.get_alert_state(&target.id).unwrap().unwrap();
        assert_eq!(state.last_health, Down);
    }

    #[tokio::test]
    async fn test_new_targets_wait_for_their_offset() {
        let target = TargetConfig::new("shop", "home", "https://shop.example/", Duration::from_secs(600));
        let probe = Arc::new(ScriptedProbe::default());
        let store = Arc::new(MemoryStore::new());
        let runner = Runner::new(
            config(Defaults::default(), vec![target.clone()]),
            store.clone(),
            probe.clone(),
            Arc::new(RecordingNotifier::new(true)),
        );

        let start = Utc::now();
        assert_eq!(runner.run_cycle(start).await.due, 0);

        // the offset lands inside one interval
        let report = runner.run_cycle(start + minutes(10)).await;
        assert_eq!(report.due, 1);

        // next probe only after a full interval
        assert_eq!(runner.run_cycle(start + minutes(15)).await.due, 0);
        assert_eq!(runner.run_cycle(start + minutes(20)).await.due, 1);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cycle_prunes_old_observations() {
        let target = every_cycle("home");
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        store
            .save_observation(&Observation::new(target.id.clone(), now - chrono::Duration::days(30)))
            .unwrap();

        let runner = Runner::new(
            config(Defaults::default(), vec![target.clone()]),
            store.clone(),
            Arc::new(ScriptedProbe::default()),
            Arc::new(RecordingNotifier::new(true)),
        );

        let report = runner.run_cycle(now).await;
        assert_eq!(report.pruned, 1);
        assert_eq!(store.observations(&target.id).len(), 1);
    }
}
