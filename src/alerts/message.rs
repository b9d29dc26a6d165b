//! Human-readable rendering of notification events

use chrono::{DateTime, Utc};
use std::fmt::Write;

use super::config::{AlertState, EventKind, NotificationEvent};
use super::machine::elapsed;
use crate::data::HealthState;

fn title(kind: EventKind, health: HealthState) -> String {
    match kind {
        EventKind::BecameDown => "🔴 DOWN".to_string(),
        EventKind::BecameSlow => "🟠 SLOW".to_string(),
        EventKind::Recovered => "🟢 RECOVERED".to_string(),
        EventKind::DownToSlow => "🟠 SLOW (was DOWN)".to_string(),
        EventKind::Reminder => format!("⚠️ STILL {}", health),
    }
}

/// Format an event for a chat channel
pub fn format_message(event: &NotificationEvent, url: Option<&str>) -> String {
    let mut message = String::new();
    let summary = &event.observation_summary;

    // writing to a String cannot fail
    let _ = writeln!(message, "{}", title(event.kind, event.health));
    let _ = writeln!(message, "Site: {}", event.target.site());
    let _ = writeln!(message, "Page: {}", event.target.page());
    let _ = writeln!(message, "State: {}", event.health);

    if let Some(url) = url {
        let _ = writeln!(message, "URL: {}", url);
    }
    if let Some(status) = summary.http_status {
        let _ = writeln!(message, "HTTP: {}", status);
    }
    if let Some(ttfb) = summary.time_to_first_byte {
        let _ = writeln!(message, "TTFB: {:.3}s", ttfb.as_secs_f64());
    }
    if let Some(total) = summary.total_duration {
        let _ = writeln!(message, "Total: {:.3}s", total.as_secs_f64());
    }
    if let Some(error) = &summary.error {
        let _ = writeln!(message, "Error: {}", error);
    }

    message
}

/// Summary of every target whose settled health is bad, or `None` if all are fine
///
/// The duration counts from when the settled health turned bad, so a single
/// good reading inside an outage does not reset it.
pub fn format_digest(states: &[AlertState], now: DateTime<Utc>) -> Option<String> {
    let mut bad: Vec<&AlertState> = states.iter().filter(|s| s.settled_health.is_bad()).collect();
    if bad.is_empty() {
        return None;
    }
    bad.sort_by(|a, b| a.target.cmp(&b.target));

    let mut message = format!("📋 {} target(s) still failing\n", bad.len());
    for state in bad {
        let _ = write!(
            message,
            "\n{} {} {}",
            state.settled_health.emoji(),
            state.target,
            state.settled_health
        );
        if let Some(since) = state.settled_since.or(state.bad_since) {
            let _ = write!(message, " for {}", format_span(elapsed(since, now)));
        }
    }
    message.push('\n');

    Some(message)
}

/// Coarse duration like `2d 3h`, `45m` or `12s`
pub fn format_span(span: std::time::Duration) -> String {
    let secs = span.as_secs();
    let (days, hours, mins) = (secs / 86_400, (secs % 86_400) / 3600, (secs % 3600) / 60);
    match (days, hours, mins) {
        (0, 0, 0) => format!("{}s", secs),
        (0, 0, m) => format!("{}m", m),
        (0, h, m) => format!("{}h {}m", h, m),
        (d, h, _) => format!("{}d {}h", d, h),
    }
}
