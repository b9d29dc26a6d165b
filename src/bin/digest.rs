//! One-shot digest of every target that is still failing
//!
//! Meant for a daily cron entry. Reads the same environment as the main
//! binary (SITEWATCH_CONFIG, SITEWATCH_DB, BOT_TOKEN, CHAT_ID,
//! SITEWATCH_WEBHOOK_URL) and sends nothing when all targets are healthy.
//! Targets removed from the configuration are left out.

use sitewatch::alerts::{format_digest, Notifier, NotifyTarget};
use sitewatch::config::MonitorConfig;
use sitewatch::storage::{SqliteStore, Store};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sitewatch=info,digest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::var("SITEWATCH_CONFIG").unwrap_or_else(|_| "targets.yml".to_string());
    let db_path = std::env::var("SITEWATCH_DB").unwrap_or_else(|_| "monitor.db".to_string());
    let config = MonitorConfig::load(&config_path)?;
    let store = SqliteStore::open(&db_path)?;
    let states = config.retain_configured(store.list_alert_states()?);

    let Some(message) = format_digest(&states, chrono::Utc::now()) else {
        tracing::info!("All {} targets healthy, no digest sent", states.len());
        return Ok(());
    };

    let notifier = Notifier::new(NotifyTarget::resolve(
        std::env::var("BOT_TOKEN").ok(),
        std::env::var("CHAT_ID").ok(),
        std::env::var("SITEWATCH_WEBHOOK_URL").ok(),
    ));
    notifier.send(&message).await?;

    tracing::info!("Digest sent");
    Ok(())
}
