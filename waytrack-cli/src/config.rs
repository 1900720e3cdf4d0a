//! Tracker configuration: JSON file, environment, then command-line flags.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use waytrack_engine::ProgressConfig;
use waytrack_engine::constants::{DEFAULT_REMOTE_TIMEOUT, READY_THRESHOLD_PCT};

pub const API_BASE_ENV_VAR: &str = "WAYTRACK_API_BASE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackerConfig {
    /// Base URL of the journey API; absent means offline resolution.
    pub api_base: Option<String>,
    pub timeout_ms: u64,
    pub poll_interval_secs: u64,
    pub ready_threshold: u8,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            api_base: None,
            timeout_ms: u64::try_from(DEFAULT_REMOTE_TIMEOUT.as_millis()).unwrap_or(5_000),
            poll_interval_secs: 30,
            ready_threshold: READY_THRESHOLD_PCT,
        }
    }
}

impl TrackerConfig {
    /// Load from `path` when given, then apply the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting values are out of range.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                Self::from_json(&raw)
                    .with_context(|| format!("failed to parse config {}", path.display()))?
            }
            None => Self::default(),
        };
        if let Ok(base) = std::env::var(API_BASE_ENV_VAR) {
            config.api_base = Some(base);
        }
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration JSON; omitted keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Command-line flags take precedence over file and environment.
    ///
    /// # Errors
    ///
    /// Returns an error if an override leaves the configuration invalid.
    pub fn apply_overrides(
        &mut self,
        api_base: Option<String>,
        timeout_ms: Option<u64>,
        poll_interval_secs: Option<u64>,
    ) -> Result<()> {
        if let Some(base) = api_base {
            self.api_base = Some(base);
        }
        if let Some(ms) = timeout_ms {
            self.timeout_ms = ms;
        }
        if let Some(secs) = poll_interval_secs {
            self.poll_interval_secs = secs;
        }
        self.normalize();
        self.validate()
    }

    fn normalize(&mut self) {
        self.api_base = self
            .api_base
            .take()
            .map(|base| base.trim().trim_end_matches('/').to_string())
            .filter(|base| !base.is_empty());
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.timeout_ms > 0, "timeoutMs must be positive");
        anyhow::ensure!(self.poll_interval_secs > 0, "pollIntervalSecs must be positive");
        anyhow::ensure!(
            self.ready_threshold <= 100,
            "readyThreshold must be a percentage, got {}",
            self.ready_threshold
        );
        Ok(())
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    #[must_use]
    pub const fn progress_config(&self) -> ProgressConfig {
        ProgressConfig {
            ready_threshold: self.ready_threshold,
        }
    }
}
