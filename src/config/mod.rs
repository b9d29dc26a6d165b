//! Monitor configuration
//!
//! Loaded from a YAML file with three sections: `defaults`, `alert_profiles`
//! and `sites`. Each page of each site becomes one [`TargetConfig`].
//!
//! ```yaml
//! defaults:
//!   timeout_secs: 20
//!   max_workers: 6
//! alert_profiles:
//!   default:
//!     warn_latency_secs: 1.5
//!     fail_count_to_alert: 2
//! sites:
//!   - name: shop
//!     base: https://shop.example
//!     pages:
//!       - name: home
//!         path: /
//!         every_secs: 60
//!         token: "<title>Shop"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use crate::alerts::{AlertState, AlertThresholds, Expectations};
use crate::data::duration::secs;
use crate::data::TargetId;

pub const DEFAULT_PROFILE: &str = "default";

/// Global probe and run settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Per-request timeout
    #[serde(rename = "timeout_secs", with = "secs")]
    pub timeout: Duration,
    pub user_agent: String,
    pub follow_redirects: bool,
    /// Accept gzip-compressed responses
    pub compressed: bool,
    /// Observations older than this are pruned
    pub retention_days: u32,
    /// Probes in flight at once
    pub max_workers: usize,
    /// Upper bound on probes per cycle
    pub max_checks_per_run: usize,
    /// Body bytes kept for marker matching
    pub max_body_bytes: usize,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            user_agent: concat!("sitewatch/", env!("CARGO_PKG_VERSION")).to_string(),
            follow_redirects: true,
            compressed: true,
            retention_days: 14,
            max_workers: 6,
            max_checks_per_run: 10,
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl Defaults {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(u64::from(self.retention_days) * 24 * 3600)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct SiteSection {
    name: String,
    base: String,
    #[serde(default)]
    pages: Vec<PageSection>,
}

#[derive(Debug, Clone, Deserialize)]
struct PageSection {
    name: String,
    path: String,
    #[serde(rename = "every_secs", with = "secs")]
    every: Duration,
    #[serde(default)]
    token: Option<String>,
    #[serde(default = "default_expect_http")]
    expect_http: Vec<u16>,
    #[serde(default = "default_profile_name")]
    alert_profile: String,
}

fn default_expect_http() -> Vec<u16> {
    vec![200]
}

fn default_profile_name() -> String {
    DEFAULT_PROFILE.to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    defaults: Defaults,
    #[serde(default)]
    alert_profiles: HashMap<String, AlertThresholds>,
    #[serde(default)]
    sites: Vec<SiteSection>,
}

/// One monitored page, fully resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetConfig {
    pub id: TargetId,
    pub site: String,
    pub page: String,
    pub url: String,
    /// Probe interval
    #[serde(with = "secs")]
    pub interval: Duration,
    pub expectations: Expectations,
    pub profile: String,
    pub thresholds: AlertThresholds,
}

impl TargetConfig {
    /// Build a target directly, bypassing YAML
    pub fn new(site: &str, page: &str, url: impl Into<String>, interval: Duration) -> Self {
        Self {
            id: TargetId::new(site, page),
            site: site.to_string(),
            page: page.to_string(),
            url: url.into(),
            interval,
            expectations: Expectations::default(),
            profile: DEFAULT_PROFILE.to_string(),
            thresholds: AlertThresholds::default(),
        }
    }

    pub fn with_expectations(mut self, expectations: Expectations) -> Self {
        self.expectations = expectations;
        self
    }

    pub fn with_thresholds(mut self, thresholds: AlertThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }
}

/// Complete monitor configuration
#[derive(Debug, Clone, Default)]
pub struct MonitorConfig {
    pub defaults: Defaults,
    pub profiles: HashMap<String, AlertThresholds>,
    /// Targets in configuration order
    pub targets: Vec<TargetConfig>,
}

impl MonitorConfig {
    /// Load and validate a YAML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Parse and validate YAML config text
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(text)?;
        Self::resolve(raw)
    }

    /// Build from already-resolved parts (used by tests and embedders)
    pub fn from_targets(defaults: Defaults, targets: Vec<TargetConfig>) -> Result<Self, ConfigError> {
        let config = Self {
            defaults,
            profiles: HashMap::new(),
            targets,
        };
        config.validate()?;
        Ok(config)
    }

    fn resolve(raw: RawConfig) -> Result<Self, ConfigError> {
        let mut profiles = raw.alert_profiles;
        profiles
            .entry(DEFAULT_PROFILE.to_string())
            .or_insert_with(AlertThresholds::default);

        let mut targets = Vec::new();
        for site in &raw.sites {
            for page in &site.pages {
                let id = TargetId::new(&site.name, &page.name);
                let thresholds = profiles
                    .get(&page.alert_profile)
                    .cloned()
                    .ok_or_else(|| ConfigError::UnknownProfile {
                        profile: page.alert_profile.clone(),
                        target: id.to_string(),
                    })?;

                let mut expectations = Expectations::new(page.expect_http.clone());
                expectations.marker = page.token.clone();

                targets.push(TargetConfig {
                    url: join_url(&site.base, &page.path),
                    site: site.name.clone(),
                    page: page.name.clone(),
                    id,
                    interval: page.every,
                    expectations,
                    profile: page.alert_profile.clone(),
                    thresholds,
                });
            }
        }

        let config = Self {
            defaults: raw.defaults,
            profiles,
            targets,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.defaults.max_workers == 0 {
            return Err(ConfigError::Invalid("max_workers must be at least 1".into()));
        }
        if self.defaults.max_checks_per_run == 0 {
            return Err(ConfigError::Invalid("max_checks_per_run must be at least 1".into()));
        }
        if self.defaults.timeout.is_zero() {
            return Err(ConfigError::Invalid("timeout_secs must be positive".into()));
        }

        let mut seen = HashSet::new();
        for target in &self.targets {
            if !seen.insert(&target.id) {
                return Err(ConfigError::DuplicateTarget(target.id.to_string()));
            }

            let url = reqwest::Url::parse(&target.url).map_err(|e| ConfigError::InvalidUrl {
                target: target.id.to_string(),
                reason: e.to_string(),
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidUrl {
                    target: target.id.to_string(),
                    reason: format!("unsupported scheme {}", url.scheme()),
                });
            }

            let thr = &target.thresholds;
            if thr.cooldown > thr.remind_every {
                tracing::warn!(
                    target_id = %target.id,
                    "cooldown exceeds remind_every; reminders will be spaced by cooldown"
                );
            }
        }

        Ok(())
    }

    /// Look up a target by its identity
    pub fn target(&self, id: &str) -> Option<&TargetConfig> {
        self.targets.iter().find(|t| t.id.as_str() == id)
    }

    /// Drop states of targets that are no longer configured
    pub fn retain_configured(&self, mut states: Vec<AlertState>) -> Vec<AlertState> {
        let configured: HashSet<&TargetId> = self.targets.iter().map(|t| &t.id).collect();
        states.retain(|state| configured.contains(&state.target));
        states
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Alert profile '{profile}' not found for page {target}")]
    UnknownProfile { profile: String, target: String },

    #[error("Duplicate target {0}")]
    DuplicateTarget(String),

    #[error("Invalid URL for {target}: {reason}")]
    InvalidUrl { target: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
