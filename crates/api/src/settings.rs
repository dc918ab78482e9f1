//! Runtime Settings
//!
//! Loaded once at startup from an optional `monitoring.toml` plus
//! `MONITOR_*` environment variables. Every section has working
//! defaults: the zero-config process runs with the test provider and an
//! empty in-memory directory.

use crate::rate_limit::RateLimitConfig;
use alerting::SeverityPolicy;
use anyhow::{bail, Context};
use event_bus::BusConfig;
use identity::{ContactDirectory, HttpDirectory, StaticDirectory};
use notify::{NotificationProvider, RetryPolicy, TestProvider, TwilioConfig, TwilioProvider};
use serde::Deserialize;
use std::sync::Arc;
use vitals::ValidationConfig;

/// Which notification provider to construct at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMode {
    Test,
    Twilio,
}

/// Notification provider selection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub mode: ProviderMode,
    pub twilio: Option<TwilioConfig>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            mode: ProviderMode::Test,
            twilio: None,
        }
    }
}

impl ProviderSettings {
    /// Build the provider chosen by configuration.
    ///
    /// The choice is made exactly once here; nothing downstream branches
    /// on the mode again.
    pub fn build(&self) -> anyhow::Result<Arc<dyn NotificationProvider>> {
        match self.mode {
            ProviderMode::Test => Ok(Arc::new(TestProvider::new())),
            ProviderMode::Twilio => {
                let Some(config) = self.twilio.clone() else {
                    bail!("provider.mode is twilio but no twilio credentials are configured");
                };
                Ok(Arc::new(TwilioProvider::new(config)))
            }
        }
    }
}

/// Which directory implementation to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryMode {
    Memory,
    Http,
}

/// Identity directory selection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DirectorySettings {
    pub mode: DirectoryMode,
    pub base_url: Option<String>,
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            mode: DirectoryMode::Memory,
            base_url: None,
        }
    }
}

impl DirectorySettings {
    pub fn build(&self) -> anyhow::Result<Arc<dyn ContactDirectory>> {
        match self.mode {
            DirectoryMode::Memory => Ok(Arc::new(StaticDirectory::new())),
            DirectoryMode::Http => {
                let Some(base_url) = self.base_url.clone() else {
                    bail!("directory.mode is http but directory.base_url is not configured");
                };
                Ok(Arc::new(
                    HttpDirectory::new(base_url)
                        .map_err(|e| anyhow::anyhow!("building directory client: {}", e))?,
                ))
            }
        }
    }
}

/// Top-level settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub listen_addr: Option<String>,
    pub provider: ProviderSettings,
    pub directory: DirectorySettings,
    pub bus: BusConfig,
    pub retry: RetryPolicy,
    pub severity: SeverityPolicy,
    pub validation: ValidationConfig,
    pub rate_limit: RateLimitConfig,
}

impl Settings {
    /// Address the server binds to
    pub fn listen_addr(&self) -> &str {
        self.listen_addr.as_deref().unwrap_or("0.0.0.0:8080")
    }

    /// Load settings from `monitoring.toml` (if present) and `MONITOR_*`
    /// environment variables, e.g. `MONITOR_PROVIDER__MODE=twilio`.
    pub fn load() -> anyhow::Result<Self> {
        let raw = config::Config::builder()
            .add_source(config::File::with_name("monitoring").required(false))
            .add_source(config::Environment::with_prefix("MONITOR").separator("__"))
            .build()
            .context("reading configuration sources")?;
        raw.try_deserialize().context("deserializing settings")
    }
}
