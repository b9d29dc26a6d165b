//! Alert configuration and state types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::data::duration::secs;
use crate::data::{HealthState, ObservationSummary, TargetId};

/// Alert profile shared by the targets that reference it by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    /// TTFB at or above this is SLOW
    #[serde(rename = "warn_latency_secs", with = "secs")]
    pub warn_latency: Duration,
    /// Second latency band; currently classified the same as `warn_latency`
    #[serde(rename = "crit_latency_secs", with = "secs")]
    pub crit_latency: Duration,
    /// Consecutive bad observations before alerting
    pub fail_count_to_alert: u32,
    /// Consecutive good observations before announcing recovery
    pub recover_count: u32,
    /// Repeat interval for an ongoing problem
    #[serde(rename = "remind_every_secs", with = "secs")]
    pub remind_every: Duration,
    /// Minimum spacing between notifications for one target
    #[serde(rename = "cooldown_secs", with = "secs")]
    pub cooldown: Duration,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            warn_latency: Duration::from_millis(1500),
            crit_latency: Duration::from_secs(3),
            fail_count_to_alert: 2,
            recover_count: 2,
            remind_every: Duration::from_secs(3600),
            cooldown: Duration::from_secs(300),
        }
    }
}

impl AlertThresholds {
    pub fn with_counts(mut self, fail_count_to_alert: u32, recover_count: u32) -> Self {
        self.fail_count_to_alert = fail_count_to_alert;
        self.recover_count = recover_count;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_remind_every(mut self, remind_every: Duration) -> Self {
        self.remind_every = remind_every;
        self
    }

    pub fn with_latency(mut self, warn: Duration, crit: Duration) -> Self {
        self.warn_latency = warn;
        self.crit_latency = crit;
        self
    }
}

/// Durable hysteresis state of one target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertState {
    pub target: TargetId,
    /// Health of the most recent observation
    pub last_health: HealthState,
    /// Health last announced by a notification
    pub settled_health: HealthState,
    /// When the settled health turned bad; kept across DOWN and SLOW
    #[serde(default)]
    pub settled_since: Option<DateTime<Utc>>,
    /// Start of the current raw bad streak
    pub bad_since: Option<DateTime<Utc>>,
    /// Last successfully delivered notification
    pub last_notified: Option<DateTime<Utc>>,
    pub consecutive_bad: u32,
    pub consecutive_good: u32,
}

impl AlertState {
    /// Whether a notification was delivered since the settled health turned bad
    pub fn notified_this_episode(&self) -> bool {
        match (self.last_notified, self.settled_since) {
            (Some(sent), Some(since)) => sent >= since,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    /// Mark a notification as delivered at `now`
    pub fn record_delivery(&mut self, now: DateTime<Utc>) {
        self.last_notified = Some(now);
    }
}

/// What kind of change a notification announces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    BecameDown,
    BecameSlow,
    Recovered,
    DownToSlow,
    /// Problem still ongoing after `remind_every`
    Reminder,
}

impl EventKind {
    /// Onset kind for a bad health state
    pub fn onset(health: HealthState) -> Self {
        match health {
            HealthState::Down => EventKind::BecameDown,
            _ => EventKind::BecameSlow,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::BecameDown => "BECAME_DOWN",
            EventKind::BecameSlow => "BECAME_SLOW",
            EventKind::Recovered => "RECOVERED",
            EventKind::DownToSlow => "DOWN_TO_SLOW",
            EventKind::Reminder => "REMINDER",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision to notify a human; never persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub target: TargetId,
    pub kind: EventKind,
    pub health: HealthState,
    pub observation_summary: ObservationSummary,
}

/// Telegram Bot API credentials
#[derive(Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    #[serde(default = "default_telegram_api")]
    pub api_base: String,
}

fn default_telegram_api() -> String {
    "https://api.telegram.org".to_string()
}

impl TelegramConfig {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            api_base: default_telegram_api(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn send_message_url(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            self.bot_token
        )
    }
}

// Keep the token out of logs
impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

/// Notification target
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NotifyTarget {
    /// Log to tracing
    Log,
    /// HTTP webhook
    Webhook {
        url: String,
        #[serde(default)]
        headers: HashMap<String, String>,
    },
    /// Telegram chat via the Bot API
    Telegram(TelegramConfig),
}

impl NotifyTarget {
    /// Delivery channels from explicit credentials, falling back to the log
    ///
    /// Telegram needs both the token and the chat id.
    pub fn resolve(
        bot_token: Option<String>,
        chat_id: Option<String>,
        webhook_url: Option<String>,
    ) -> Vec<NotifyTarget> {
        let mut targets = Vec::new();

        if let (Some(token), Some(chat_id)) = (bot_token, chat_id) {
            targets.push(NotifyTarget::Telegram(TelegramConfig::new(token, chat_id)));
        }
        if let Some(url) = webhook_url {
            targets.push(NotifyTarget::Webhook {
                url,
                headers: HashMap::new(),
            });
        }
        if targets.is_empty() {
            targets.push(NotifyTarget::Log);
        }

        targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_defaults_from_yaml() {
        let yaml = "fail_count_to_alert: 3\ncooldown_secs: 60\n";
        let t: AlertThresholds = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(t.fail_count_to_alert, 3);
        assert_eq!(t.cooldown, Duration::from_secs(60));
        assert_eq!(t.recover_count, 2);
        assert_eq!(t.warn_latency, Duration::from_millis(1500));
    }

    #[test]
    fn test_notified_this_episode() {
        let now = Utc::now();
        let mut state = AlertState {
            target: TargetId::new("s", "p"),
            last_health: HealthState::Down,
            settled_health: HealthState::Down,
            settled_since: Some(now),
            bad_since: Some(now),
            last_notified: None,
            consecutive_bad: 1,
            consecutive_good: 0,
        };
        assert!(!state.notified_this_episode());

        // a fresh raw streak inside the same settled outage changes nothing
        state.bad_since = Some(now + chrono::Duration::seconds(30));
        state.record_delivery(now + chrono::Duration::seconds(5));
        assert!(state.notified_this_episode());
        state.last_notified = None;

        state.last_notified = Some(now - chrono::Duration::seconds(10));
        assert!(!state.notified_this_episode());

        state.record_delivery(now);
        assert!(state.notified_this_episode());
    }

    #[test]
    fn test_event_kind_onset() {
        assert_eq!(EventKind::onset(HealthState::Down), EventKind::BecameDown);
        assert_eq!(EventKind::onset(HealthState::Slow), EventKind::BecameSlow);
        assert_eq!(
            serde_json::to_string(&EventKind::DownToSlow).unwrap(),
            "\"DOWN_TO_SLOW\""
        );
    }

    #[test]
    fn test_telegram_url_and_debug() {
        let cfg = TelegramConfig::new("123:abc", "42").with_api_base("http://localhost:9000/");
        assert_eq!(cfg.send_message_url(), "http://localhost:9000/bot123:abc/sendMessage");
        assert!(!format!("{:?}", cfg).contains("123:abc"));
    }

    #[test]
    fn test_resolve_notify_targets() {
        assert!(matches!(NotifyTarget::resolve(None, None, None).as_slice(), [NotifyTarget::Log]));
        assert!(matches!(
            NotifyTarget::resolve(Some("tok".into()), None, None).as_slice(),
            [NotifyTarget::Log]
        ));

        let targets = NotifyTarget::resolve(
            Some("tok".into()),
            Some("42".into()),
            Some("https://hooks.example/x".into()),
        );
        assert_eq!(targets.len(), 2);
        assert!(matches!(&targets[0], NotifyTarget::Telegram(t) if t.chat_id == "42"));
        assert!(matches!(&targets[1], NotifyTarget::Webhook { url, .. } if url == "https://hooks.example/x"));
    }
}
