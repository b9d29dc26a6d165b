//! Alert decision engine
//!
//! Classifies observations into health states, runs them through the
//! hysteresis state machine and delivers the resulting notifications.

pub mod classifier;
pub mod config;
pub mod machine;
pub mod message;
pub mod notifier;

pub use classifier::{classify, classify_verdict, Expectations, Verdict};
pub use config::{AlertState, AlertThresholds, EventKind, NotificationEvent, NotifyTarget, TelegramConfig};
pub use machine::{evaluate, Evaluation};
pub use message::{format_digest, format_message};
pub use notifier::{Notifier, NotifierError, Notify};
