//! Sitewatch: HTTP Endpoint Monitor with Alert Hysteresis
//!
//! Periodically probes configured web pages, classifies each response as
//! OK, SLOW or DOWN, and decides through a hysteresis state machine when a
//! change of health is worth telling a human about.
//!
//! # Features
//!
//! - **Health Classification**: status allow-list, HTML marker and TTFB bands
//! - **Alert Hysteresis**: consecutive-count thresholds for onset and recovery
//! - **Anti-Spam Cooldown**: minimum spacing between notifications per target
//! - **Reminders**: repeated notices for problems that do not go away
//! - **Staggered Scheduling**: stable hash offsets spread first probes
//! - **Bounded Parallelism**: a capped worker pool per cycle
//! - **Durable State**: SQLite-backed observations and alert state
//! - **Status API**: JSON view of every target
//!
//! # Example
//!
//! ```no_run
//! use sitewatch::alerts::Notifier;
//! use sitewatch::config::MonitorConfig;
//! use sitewatch::probe::HttpProber;
//! use sitewatch::runner::Runner;
//! use sitewatch::storage::SqliteStore;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(MonitorConfig::load("targets.yml")?);
//! let store = Arc::new(SqliteStore::open("monitor.db")?);
//! let prober = Arc::new(HttpProber::new(&config.defaults)?);
//! let notifier = Arc::new(Notifier::new(Vec::new()));
//!
//! let runner = Runner::new(config, store, prober, notifier);
//! let report = runner.run_cycle(chrono::Utc::now()).await;
//! println!("Probed {} targets", report.probed);
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod api;
pub mod config;
pub mod data;
pub mod probe;
pub mod runner;
pub mod schedule;
pub mod storage;

// Re-export commonly used types
pub use alerts::{evaluate, AlertState, AlertThresholds, EventKind, NotificationEvent};
pub use config::{ConfigError, MonitorConfig, TargetConfig};
pub use data::{HealthState, Observation, TargetId};
pub use runner::{CycleReport, Runner};
pub use storage::{Store, StoreError};
