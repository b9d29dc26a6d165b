//! Notification delivery

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use super::config::{NotifyTarget, TelegramConfig};

/// Delivers a formatted message to humans
///
/// Implementations never fail: transport problems resolve to `false`.
#[async_trait]
pub trait Notify: Send + Sync {
    async fn notify(&self, message: &str) -> bool;
}

/// Fan-out notifier over the configured targets
pub struct Notifier {
    client: reqwest::Client,
    targets: Vec<NotifyTarget>,
}

impl Notifier {
    /// Create a new notifier
    pub fn new(targets: Vec<NotifyTarget>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, targets }
    }

    pub fn targets(&self) -> &[NotifyTarget] {
        &self.targets
    }

    /// Send a message to every target
    pub async fn send(&self, message: &str) -> Result<(), NotifierError> {
        if self.targets.is_empty() {
            return Err(NotifierError::NoTargets);
        }

        let mut errors = Vec::new();

        for target in &self.targets {
            if let Err(e) = self.send_to(target, message).await {
                errors.push(e);
            }
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(NotifierError::Multiple(errors)),
        }
    }

    /// Send notification to a single target
    async fn send_to(&self, target: &NotifyTarget, message: &str) -> Result<(), NotifierError> {
        match target {
            NotifyTarget::Log => {
                tracing::warn!("Alert: {}", message.replace('\n', " | "));
                Ok(())
            }
            NotifyTarget::Webhook { url, headers } => self.send_webhook(url, headers, message).await,
            NotifyTarget::Telegram(config) => self.send_telegram(config, message).await,
        }
    }

    /// Send webhook notification
    async fn send_webhook(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        message: &str,
    ) -> Result<(), NotifierError> {
        let payload = serde_json::json!({
            "source": "sitewatch",
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let mut request = self.client.post(url).json(&payload);

        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NotifierError::Webhook(format!("Failed to send webhook: {}", e)))?;

        if !response.status().is_success() {
            return Err(NotifierError::Webhook(format!(
                "Webhook returned status {}",
                response.status()
            )));
        }

        tracing::debug!(url = %url, "Webhook notification sent");

        Ok(())
    }

    /// Send a chat message through the Telegram Bot API
    async fn send_telegram(&self, config: &TelegramConfig, message: &str) -> Result<(), NotifierError> {
        let payload = serde_json::json!({
            "chat_id": config.chat_id,
            "text": message,
        });

        let response = self
            .client
            .post(config.send_message_url())
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifierError::Telegram(format!("Failed to reach Telegram: {}", e)))?;

        if !response.status().is_success() {
            return Err(NotifierError::Telegram(format!(
                "Telegram returned status {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| NotifierError::Telegram(format!("Invalid Telegram response: {}", e)))?;

        if body.get("ok").and_then(|ok| ok.as_bool()) != Some(true) {
            return Err(NotifierError::Telegram(format!("Telegram API error: {}", body)));
        }

        tracing::debug!(chat_id = %config.chat_id, "Telegram notification sent");

        Ok(())
    }
}

#[async_trait]
impl Notify for Notifier {
    async fn notify(&self, message: &str) -> bool {
        match self.send(message).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "Failed to send notification");
                false
            }
        }
    }
}

/// Notifier errors
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("Webhook error: {0}")]
    Webhook(String),

    #[error("Telegram error: {0}")]
    Telegram(String),

    #[error("No notification targets configured")]
    NoTargets,

    #[error("Multiple notification failures: {0:?}")]
    Multiple(Vec<NotifierError>),
}
