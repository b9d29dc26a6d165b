//! Sitewatch Monitor
//!
//! Run with: cargo run
//!
//! Environment variables:
//! - SITEWATCH_CONFIG: Targets file (default: targets.yml)
//! - SITEWATCH_DB: SQLite database path, or `:memory:` (default: monitor.db)
//! - SITEWATCH_HOST: Status API bind address (default: 0.0.0.0)
//! - SITEWATCH_PORT: Status API port (default: 8080)
//! - SITEWATCH_TICK_SECS: Seconds between cycles (default: 60)
//! - SITEWATCH_ONCE: Run a single cycle and exit, for cron (default: unset)
//! - BOT_TOKEN / CHAT_ID: Telegram delivery
//! - SITEWATCH_WEBHOOK_URL: Webhook delivery
//! - RUST_LOG: Log level (default: info)
//!
//! Without any delivery channel configured, notifications go to the log.

use sitewatch::alerts::{Notifier, NotifyTarget};
use sitewatch::api::{run_server, shutdown_signal, AppState, ServerConfig};
use sitewatch::config::MonitorConfig;
use sitewatch::probe::HttpProber;
use sitewatch::runner::{Runner, RunnerWorker};
use sitewatch::storage::{MemoryStore, SqliteStore, Store};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn open_store(path: &str) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    if path == ":memory:" {
        tracing::warn!("Using in-memory store; alert state is lost on restart");
        return Ok(Arc::new(MemoryStore::new()));
    }
    Ok(Arc::new(SqliteStore::open(path)?))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sitewatch=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::var("SITEWATCH_CONFIG").unwrap_or_else(|_| "targets.yml".to_string());
    let db_path = std::env::var("SITEWATCH_DB").unwrap_or_else(|_| "monitor.db".to_string());
    let host = std::env::var("SITEWATCH_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("SITEWATCH_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let tick_secs: u64 = std::env::var("SITEWATCH_TICK_SECS")
        .ok()
        .and_then(|t| t.parse().ok())
        .filter(|t| *t > 0)
        .unwrap_or(60);
    let once = env_flag("SITEWATCH_ONCE");

    let config = Arc::new(MonitorConfig::load(&config_path)?);
    let store = open_store(&db_path)?;
    let prober = Arc::new(HttpProber::new(&config.defaults)?);
    let notifier = Arc::new(Notifier::new(NotifyTarget::resolve(
        std::env::var("BOT_TOKEN").ok(),
        std::env::var("CHAT_ID").ok(),
        std::env::var("SITEWATCH_WEBHOOK_URL").ok(),
    )));

    tracing::info!("Sitewatch configuration:");
    tracing::info!("  Config: {}", config_path);
    tracing::info!("  Database: {}", db_path);
    tracing::info!("  Targets: {}", config.targets.len());
    tracing::info!("  Workers: {}", config.defaults.max_workers);
    tracing::info!("  Max checks per cycle: {}", config.defaults.max_checks_per_run);
    tracing::info!("  Retention: {} days", config.defaults.retention_days);
    tracing::info!("  Notify targets: {}", notifier.targets().len());

    let runner = Arc::new(Runner::new(
        Arc::clone(&config),
        Arc::clone(&store),
        prober,
        notifier,
    ));

    if once {
        let report = runner.run_cycle(chrono::Utc::now()).await;
        for (target, error) in &report.failures {
            tracing::error!(target_id = %target, "{}", error);
        }
        return Ok(());
    }

    println!(
        r#"
      _ _                    _       _
  ___(_) |_ _____      ____ _| |_ ___| |__
 / __| | __/ _ \ \ /\ / / _` | __/ __| '_ \
 \__ \ | ||  __/\ V  V / (_| | || (__| | | |
 |___/_|\__\___| \_/\_/ \__,_|\__\___|_| |_|

 HTTP Endpoint Monitor
 Version: {}
"#,
        env!("CARGO_PKG_VERSION")
    );

    let mut worker = RunnerWorker::new(runner, Duration::from_secs(tick_secs));
    let state = Arc::new(AppState::new(store, config).with_last_report(worker.last_report()));
    let worker_handle = worker.start();

    run_server(ServerConfig { host, port }, state, shutdown_signal()).await?;

    worker.stop().await;
    worker_handle.await?;

    tracing::info!("Sitewatch stopped");
    Ok(())
}
