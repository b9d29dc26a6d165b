use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::duration::opt_secs;
use super::target::TargetId;

/// Result of one probe attempt
///
/// Carries raw measurements only. Health is derived afterwards by
/// [`crate::alerts::classify`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub target: TargetId,
    pub timestamp: DateTime<Utc>,
    pub http_status: Option<u16>,
    #[serde(with = "opt_secs", default)]
    pub time_to_first_byte: Option<Duration>,
    #[serde(with = "opt_secs", default)]
    pub total_duration: Option<Duration>,
    pub size: Option<u64>,
    pub error: Option<String>,
    /// Response body, truncated by the prober; never sent over the API
    #[serde(skip_serializing, default)]
    pub body_excerpt: Option<String>,
}

impl Observation {
    pub fn new(target: TargetId, timestamp: DateTime<Utc>) -> Self {
        Self {
            target,
            timestamp,
            http_status: None,
            time_to_first_byte: None,
            total_duration: None,
            size: None,
            error: None,
            body_excerpt: None,
        }
    }

    /// Observation for a probe that produced no response
    pub fn failed(target: TargetId, timestamp: DateTime<Utc>, error: impl Into<String>) -> Self {
        Self::new(target, timestamp).with_error(error)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    pub fn with_timing(mut self, ttfb: Duration, total: Duration) -> Self {
        self.time_to_first_byte = Some(ttfb);
        self.total_duration = Some(total);
        self
    }

    pub fn with_body(mut self, body: impl Into<String>, size: u64) -> Self {
        self.body_excerpt = Some(body.into());
        self.size = Some(size);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// The fields worth showing to a human
    pub fn summary(&self) -> ObservationSummary {
        ObservationSummary {
            http_status: self.http_status,
            time_to_first_byte: self.time_to_first_byte,
            total_duration: self.total_duration,
            error: self.error.clone(),
        }
    }
}

/// Subset of an observation carried by notification events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationSummary {
    pub http_status: Option<u16>,
    #[serde(with = "opt_secs", default)]
    pub time_to_first_byte: Option<Duration>,
    #[serde(with = "opt_secs", default)]
    pub total_duration: Option<Duration>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let now = Utc::now();
        let obs = Observation::new(TargetId::new("s", "p"), now)
            .with_status(200)
            .with_timing(Duration::from_millis(120), Duration::from_millis(300))
            .with_body("<html>ok</html>", 15);

        assert_eq!(obs.http_status, Some(200));
        assert_eq!(obs.size, Some(15));
        assert!(obs.error.is_none());

        let summary = obs.summary();
        assert_eq!(summary.time_to_first_byte, Some(Duration::from_millis(120)));
        assert_eq!(summary.total_duration, Some(Duration::from_millis(300)));
    }

    #[test]
    fn test_body_not_serialized() {
        let obs = Observation::new(TargetId::new("s", "p"), Utc::now()).with_body("secret", 6);
        let json = serde_json::to_value(&obs).unwrap();
        assert!(json.get("body_excerpt").is_none());
        assert_eq!(json["size"], 6);
    }
}
