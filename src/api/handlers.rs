use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

use crate::alerts::AlertState;
use crate::config::{MonitorConfig, TargetConfig};
use crate::data::{HealthState, Observation, TargetId};
use crate::runner::CycleReport;
use crate::storage::{Store, StoreError};

/// Application state shared across handlers
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<MonitorConfig>,
    /// Filled by the background runner; empty in one-shot mode
    pub last_report: Arc<RwLock<Option<CycleReport>>>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Arc<MonitorConfig>) -> Self {
        Self {
            store,
            config,
            last_report: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_last_report(mut self, last_report: Arc<RwLock<Option<CycleReport>>>) -> Self {
        self.last_report = last_report;
        self
    }
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// Status
// ============================================================================

#[derive(Debug, Serialize)]
pub struct TargetStatus {
    pub id: TargetId,
    pub site: String,
    pub page: String,
    pub url: String,
    pub profile: String,
    /// Health confirmed by hysteresis; absent before the first probe
    pub health: Option<HealthState>,
    pub last_health: Option<HealthState>,
    /// When the confirmed health turned bad
    pub settled_since: Option<DateTime<Utc>>,
    pub bad_since: Option<DateTime<Utc>>,
    pub last_notified: Option<DateTime<Utc>>,
    pub consecutive_bad: u32,
    pub consecutive_good: u32,
    pub latest: Option<Observation>,
}

impl TargetStatus {
    fn build(target: &TargetConfig, state: Option<AlertState>, latest: Option<Observation>) -> Self {
        Self {
            id: target.id.clone(),
            site: target.site.clone(),
            page: target.page.clone(),
            url: target.url.clone(),
            profile: target.profile.clone(),
            health: state.as_ref().map(|s| s.settled_health),
            last_health: state.as_ref().map(|s| s.last_health),
            settled_since: state.as_ref().and_then(|s| s.settled_since),
            bad_since: state.as_ref().and_then(|s| s.bad_since),
            last_notified: state.as_ref().and_then(|s| s.last_notified),
            consecutive_bad: state.as_ref().map(|s| s.consecutive_bad).unwrap_or(0),
            consecutive_good: state.as_ref().map(|s| s.consecutive_good).unwrap_or(0),
            latest,
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct StatusTotals {
    pub ok: usize,
    pub slow: usize,
    pub down: usize,
    pub unknown: usize,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub generated_at: DateTime<Utc>,
    pub totals: StatusTotals,
    pub targets: Vec<TargetStatus>,
}

fn target_status(state: &AppState, target: &TargetConfig) -> Result<TargetStatus, ApiError> {
    let alert = state.store.get_alert_state(&target.id)?;
    let latest = state.store.latest_observation(&target.id)?;
    Ok(TargetStatus::build(target, alert, latest))
}

pub async fn status(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, ApiError> {
    let mut totals = StatusTotals::default();
    let mut targets = Vec::with_capacity(state.config.targets.len());

    for target in &state.config.targets {
        let status = target_status(&state, target)?;
        match status.health {
            Some(HealthState::Ok) => totals.ok += 1,
            Some(HealthState::Slow) => totals.slow += 1,
            Some(HealthState::Down) => totals.down += 1,
            None => totals.unknown += 1,
        }
        targets.push(status);
    }

    Ok(Json(StatusResponse {
        generated_at: Utc::now(),
        totals,
        targets,
    }))
}

pub async fn target_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TargetStatus>, ApiError> {
    let target = state
        .config
        .target(&id)
        .ok_or_else(|| ApiError::NotFound(format!("Target '{}' not found", id)))?;

    Ok(Json(target_status(&state, target)?))
}

// ============================================================================
// Last Cycle
// ============================================================================

pub async fn last_cycle(State(state): State<Arc<AppState>>) -> Result<Json<CycleReport>, ApiError> {
    state
        .last_report
        .read()
        .clone()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No cycle has completed yet".to_string()))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => {
                tracing::error!("API error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
