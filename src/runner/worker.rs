use chrono::Utc;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

use super::orchestrator::{CycleReport, Runner};

/// Background worker that runs a cycle on every tick
pub struct RunnerWorker {
    runner: Arc<Runner>,
    tick: Duration,
    last_report: Arc<RwLock<Option<CycleReport>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
}

impl RunnerWorker {
    pub fn new(runner: Arc<Runner>, tick: Duration) -> Self {
        Self {
            runner,
            tick,
            last_report: Arc::new(RwLock::new(None)),
            shutdown_tx: None,
        }
    }

    /// Shared handle to the most recent cycle report
    pub fn last_report(&self) -> Arc<RwLock<Option<CycleReport>>> {
        Arc::clone(&self.last_report)
    }

    /// Start the background loop
    pub fn start(&mut self) -> tokio::task::JoinHandle<()> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        self.shutdown_tx = Some(shutdown_tx);

        let runner = Arc::clone(&self.runner);
        let last_report = Arc::clone(&self.last_report);
        let tick = self.tick;

        tokio::spawn(async move {
            tracing::info!("Runner started with tick {:?}", tick);

            let mut ticker = interval(tick);
            // ticks missed during a long cycle are not replayed
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = runner.run_cycle(Utc::now()).await;
                        *last_report.write() = Some(report);
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Runner shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Stop the background loop; an in-flight cycle finishes first
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some()
    }
}
