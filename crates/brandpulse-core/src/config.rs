//! BrandPulse configuration system.
//!
//! Everything the orchestrator needs — scheduler knobs and backend service
//! credentials — lives in one TOML file and is injected at construction
//! time. The core never reads ambient process state.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{BrandPulseError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BrandPulseConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub services: ServicesConfig,
}

impl BrandPulseConfig {
    /// Load config from the default path (~/.brandpulse/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BrandPulseError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| BrandPulseError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| BrandPulseError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the BrandPulse home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".brandpulse")
    }
}

/// Orchestrator scheduling knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// How often the trigger loop polls for due configurations.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Concurrent workers per pass.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Retry ceiling per task (total attempts, not extra retries).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Overall per-pass deadline; remaining due configs are left for the
    /// next pass once exceeded. 0 = no deadline.
    #[serde(default)]
    pub deadline_secs: u64,
    /// Alert deduplication window.
    #[serde(default = "default_alert_window")]
    pub alert_window_secs: u64,
    /// SQLite database path.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_poll_interval() -> u64 { 300 }
fn default_workers() -> usize { 4 }
fn default_max_attempts() -> u32 { 3 }
fn default_alert_window() -> u64 { 3600 }
fn default_db_path() -> String { "~/.brandpulse/orchestrator.db".into() }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            workers: default_workers(),
            max_attempts: default_max_attempts(),
            deadline_secs: 0,
            alert_window_secs: default_alert_window(),
            db_path: default_db_path(),
        }
    }
}

/// Backend collaborator service endpoints and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    /// Base URL of the BrandPulse backend API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token for service-to-service calls.
    #[serde(default)]
    pub api_key: String,
    /// Per-request timeout.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String { "http://127.0.0.1:8090".into() }
fn default_timeout() -> u64 { 30 }

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            timeout_secs: default_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BrandPulseConfig::default();
        assert_eq!(config.scheduler.poll_interval_secs, 300);
        assert_eq!(config.scheduler.max_attempts, 3);
        assert_eq!(config.scheduler.alert_window_secs, 3600);
        assert_eq!(config.services.timeout_secs, 30);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: BrandPulseConfig = toml::from_str(
            r#"
            [scheduler]
            workers = 8

            [services]
            base_url = "https://api.example.com"
            api_key = "secret"
            "#,
        )
        .unwrap();
        assert_eq!(config.scheduler.workers, 8);
        assert_eq!(config.scheduler.poll_interval_secs, 300);
        assert_eq!(config.services.base_url, "https://api.example.com");
        assert_eq!(config.services.api_key, "secret");
    }
}
