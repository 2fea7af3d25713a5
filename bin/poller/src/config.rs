//! Centralized poller configuration.
//!
//! Loaded via the `config` crate from environment variables; nested
//! sections use a `__` separator (`POLL__LIMIT`, `API__BASE_URL`).

use openmic_core::TriggerId;
use openmic_integration::{ApiCredential, ClientConfig};
use openmic_trigger::{CallStatus, PollConfig};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Poller configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct PollerConfig {
    /// OpenMic API key.
    pub api_key: ApiCredential,

    /// API connection settings.
    #[serde(default)]
    pub api: ClientConfig,

    /// What to poll and how often.
    #[serde(default)]
    pub poll: PollSettings,

    /// JSON file holding per-trigger watermarks.
    #[serde(default = "default_watermark_path")]
    pub watermark_path: PathBuf,

    /// Key of this poller's watermark. Defaults to the nil id.
    #[serde(default)]
    pub trigger_id: Option<TriggerId>,
}

/// Poll filters and cadence.
#[derive(Debug, Clone, Deserialize)]
pub struct PollSettings {
    #[serde(default)]
    pub status: CallStatus,

    #[serde(default = "default_limit")]
    pub limit: u32,

    #[serde(default)]
    pub bot_id: Option<String>,

    /// Seconds between polls.
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
}

fn default_watermark_path() -> PathBuf {
    PathBuf::from("openmic-watermarks.json")
}

fn default_limit() -> u32 {
    PollConfig::default().limit
}

fn default_interval_seconds() -> u64 {
    60
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            status: CallStatus::default(),
            limit: default_limit(),
            bot_id: None,
            interval_seconds: default_interval_seconds(),
        }
    }
}

impl PollSettings {
    /// The trigger configuration these settings describe.
    #[must_use]
    pub fn trigger_config(&self) -> PollConfig {
        PollConfig {
            status_filter: self.status.clone(),
            limit: self.limit,
            bot_id: self.bot_id.clone(),
        }
    }

    /// Interval between polls, at least one second.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds.max(1))
    }
}

impl PollerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load(config::Environment::default())
    }

    fn load(environment: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(environment.separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// The trigger whose watermark this poller owns.
    #[must_use]
    pub fn trigger_id(&self) -> TriggerId {
        self.trigger_id.unwrap_or_else(TriggerId::nil)
    }
}
