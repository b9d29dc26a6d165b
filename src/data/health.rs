use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Health verdict for a single observation
///
/// SLOW and DOWN are both bad; no severity order is defined between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthState {
    Ok,
    Slow,
    Down,
}

impl HealthState {
    pub fn is_bad(self) -> bool {
        matches!(self, HealthState::Slow | HealthState::Down)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HealthState::Ok => "OK",
            HealthState::Slow => "SLOW",
            HealthState::Down => "DOWN",
        }
    }

    /// Status marker used in messages and status listings
    pub fn emoji(self) -> &'static str {
        match self {
            HealthState::Ok => "🟢",
            HealthState::Slow => "🟠",
            HealthState::Down => "🔴",
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown health state: {0}")]
pub struct ParseHealthError(pub String);

impl FromStr for HealthState {
    type Err = ParseHealthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OK" => Ok(HealthState::Ok),
            "SLOW" => Ok(HealthState::Slow),
            "DOWN" => Ok(HealthState::Down),
            other => Err(ParseHealthError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_states() {
        assert!(!HealthState::Ok.is_bad());
        assert!(HealthState::Slow.is_bad());
        assert!(HealthState::Down.is_bad());
    }

    #[test]
    fn test_parse_roundtrip_names() {
        for state in [HealthState::Ok, HealthState::Slow, HealthState::Down] {
            assert_eq!(state.as_str().parse::<HealthState>().unwrap(), state);
        }
        assert!("WARN".parse::<HealthState>().is_err());
    }
}
