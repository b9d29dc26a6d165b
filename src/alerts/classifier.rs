//! Maps a raw observation to a health verdict

use serde::{Deserialize, Serialize};

use super::config::AlertThresholds;
use crate::data::{HealthState, Observation};

/// Per-target expectations about a healthy response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expectations {
    /// Acceptable HTTP status codes
    pub accept_status: Vec<u16>,
    /// Text that must appear in the body
    pub marker: Option<String>,
}

impl Default for Expectations {
    fn default() -> Self {
        Self {
            accept_status: vec![200],
            marker: None,
        }
    }
}

impl Expectations {
    pub fn new(accept_status: Vec<u16>) -> Self {
        Self {
            accept_status,
            marker: None,
        }
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }
}

/// Health plus the reason a probe was not OK
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub health: HealthState,
    pub reason: Option<String>,
}

impl Verdict {
    fn ok() -> Self {
        Self {
            health: HealthState::Ok,
            reason: None,
        }
    }

    fn down(reason: impl Into<String>) -> Self {
        Self {
            health: HealthState::Down,
            reason: Some(reason.into()),
        }
    }
}

/// Classify an observation
pub fn classify(
    observation: &Observation,
    expectations: &Expectations,
    thresholds: &AlertThresholds,
) -> HealthState {
    classify_verdict(observation, expectations, thresholds).health
}

/// Classify an observation, keeping the reason for a non-OK verdict
pub fn classify_verdict(
    observation: &Observation,
    expectations: &Expectations,
    thresholds: &AlertThresholds,
) -> Verdict {
    if let Some(error) = &observation.error {
        return Verdict::down(error.clone());
    }

    match observation.http_status {
        Some(status) if expectations.accept_status.contains(&status) => {}
        Some(status) => {
            return Verdict::down(format!(
                "HTTP {} not in allowed list {:?}",
                status, expectations.accept_status
            ))
        }
        None => return Verdict::down("No HTTP status"),
    }

    if let Some(marker) = &expectations.marker {
        let found = observation
            .body_excerpt
            .as_deref()
            .map(|body| body.contains(marker.as_str()))
            .unwrap_or(false);
        if !found {
            return Verdict::down("HTML marker not found");
        }
    }

    let Some(ttfb) = observation.time_to_first_byte else {
        return Verdict::down("TTFB not available");
    };

    // Both latency bands collapse into SLOW
    if ttfb >= thresholds.crit_latency {
        Verdict {
            health: HealthState::Slow,
            reason: Some(format!("TTFB {:.3}s over critical latency", ttfb.as_secs_f64())),
        }
    } else if ttfb >= thresholds.warn_latency {
        Verdict {
            health: HealthState::Slow,
            reason: Some(format!("TTFB {:.3}s over warning latency", ttfb.as_secs_f64())),
        }
    } else {
        Verdict::ok()
    }
}
