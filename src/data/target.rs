use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a monitored page, `site:page`
///
/// Derived from configuration so it survives restarts; used as the key for
/// observations, alert state and scheduling offsets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(String);

impl TargetId {
    pub fn new(site: &str, page: &str) -> Self {
        Self(format!("{}:{}", site, page))
    }

    /// Wrap an already-composed key (as read back from storage)
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Site part of the key
    pub fn site(&self) -> &str {
        self.0.split_once(':').map(|(site, _)| site).unwrap_or(&self.0)
    }

    /// Page part of the key (empty if the key has no separator)
    pub fn page(&self) -> &str {
        self.0.split_once(':').map(|(_, page)| page).unwrap_or("")
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TargetId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
