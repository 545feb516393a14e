//! Notification dispatch
//!
//! Fire-and-forget push when a *new* attack session opens. Failure returns
//! false and is logged; it never reaches detection logic.

use nids_common::persist::read_json_or_default;
use nids_common::AttackType;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

pub trait Notifier: Send {
    fn notify(&self, attack_type: AttackType, src_ip: IpAddr, timestamp: &str) -> bool;
}

/// Disabled dispatcher.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _attack_type: AttackType, _src_ip: IpAddr, _timestamp: &str) -> bool {
        false
    }
}

/// Dispatcher settings, read from `notifications.json`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    pub tg_bot_token: String,
    pub tg_chat_id: String,
    pub enabled_platform: String,
}

impl NotifierConfig {
    pub fn load(path: &Path) -> Self {
        read_json_or_default(path)
    }

    pub fn telegram_enabled(&self) -> bool {
        matches!(self.enabled_platform.as_str(), "telegram" | "both")
            && !self.tg_bot_token.is_empty()
            && !self.tg_chat_id.is_empty()
    }
}

/// Telegram bot adapter.
pub struct TelegramNotifier {
    config: NotifierConfig,
    client: reqwest::blocking::Client,
}

impl TelegramNotifier {
    pub fn new(config: NotifierConfig) -> Self {
        Self {
            config,
            client: reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::blocking::Client::new()),
        }
    }

    pub fn from_config_file(path: &Path) -> Self {
        Self::new(NotifierConfig::load(path))
    }
}

impl Notifier for TelegramNotifier {
    fn notify(&self, attack_type: AttackType, src_ip: IpAddr, timestamp: &str) -> bool {
        if !self.config.telegram_enabled() {
            return false;
        }

        let message = format!(
            "*IDS ALERT*\n*Type*: {attack_type}\n*Source*: {src_ip}\n*Time*: {timestamp}\nCheck dashboard for details."
        );
        let url = format!(
            "https://api.telegram.org/bot{}/sendMessage",
            self.config.tg_bot_token
        );
        let payload = serde_json::json!({
            "chat_id": self.config.tg_chat_id,
            "text": message,
            "parse_mode": "Markdown",
        });

        match self.client.post(&url).json(&payload).send() {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                warn!(status = %response.status(), "Telegram API rejected notification");
                false
            }
            Err(err) => {
                warn!(error = %err, "Telegram request failed");
                false
            }
        }
    }
}
