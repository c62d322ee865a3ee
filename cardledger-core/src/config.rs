//! Configuration management
//!
//! Read from `settings.json` in the data directory. Every field is optional:
//! ```json
//! {
//!   "issuance": { "maxCardsPerUser": 15, "validityMonths": 78, "numberAttempts": 64 },
//!   "pinHash": { "memoryCost": 19456, "timeCost": 2, "parallelism": 1 },
//!   "notifications": { "webhookUrl": "https://mail.example.com/send", "timeoutSecs": 10 }
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::adapters::notifier::DEFAULT_TIMEOUT_SECS;
use crate::domain::DEFAULT_VALIDITY_MONTHS;

/// Overrides `issuance.maxCardsPerUser`
pub const ENV_MAX_CARDS: &str = "CARDLEDGER_MAX_CARDS";
/// Overrides `notifications.webhookUrl`
pub const ENV_NOTIFY_URL: &str = "CARDLEDGER_NOTIFY_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IssuanceSettings {
    /// Cards a user may hold at once, expired cards excluded
    pub max_cards_per_user: u32,
    pub validity_months: u32,
    /// Probes for a free card number before giving up
    pub number_attempts: u32,
}

impl Default for IssuanceSettings {
    fn default() -> Self {
        Self {
            max_cards_per_user: 15,
            validity_months: DEFAULT_VALIDITY_MONTHS,
            number_attempts: 64,
        }
    }
}

/// Argon2id cost parameters for PIN hashes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PinHashSettings {
    /// KiB
    pub memory_cost: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for PinHashSettings {
    fn default() -> Self {
        Self {
            memory_cost: 19_456,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    pub webhook_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// CardLedger configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub issuance: IssuanceSettings,
    pub pin_hash: PinHashSettings,
    pub notifications: NotificationSettings,
}

impl Config {
    /// Load config from the data directory, then apply environment
    /// overrides. A missing file means defaults; a malformed one is an error.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let settings_path = data_dir.join("settings.json");

        let mut config: Config = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)
                .with_context(|| format!("Failed to read {}", settings_path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid settings in {}", settings_path.display()))?
        } else {
            Config::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in
    /// production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MAX_CARDS) {
            self.issuance.max_cards_per_user = raw
                .trim()
                .parse()
                .with_context(|| format!("{} must be a non-negative integer, got '{}'", ENV_MAX_CARDS, raw))?;
        }
        if let Some(url) = lookup(ENV_NOTIFY_URL) {
            let url = url.trim().to_string();
            self.notifications.webhook_url = if url.is_empty() { None } else { Some(url) };
        }
        Ok(())
    }

    /// Save config to the data directory
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join("settings.json");
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }
}
