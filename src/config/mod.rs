//! Configuration management for joymap
//!
//! Handles loading and validation of the YAML application configuration.
//! Mapping profiles are separate files (see [`crate::profile`]); this file
//! only says which profile to use and how to poll and calibrate.

pub mod watcher;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

use crate::calibration::CalibrationConfig;

pub use watcher::ProfileWatcher;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
}

/// Engine and poller settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Mapping profile to load at startup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<PathBuf>,
    /// Poll ticks per second
    #[serde(default = "default_poll_rate_hz")]
    pub poll_rate_hz: u32,
    /// Reload the profile when its file changes
    #[serde(default = "default_true")]
    pub hot_reload: bool,
    /// Drive outputs to the current hardware state on start
    #[serde(default = "default_true")]
    pub initial_sync: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            profile: None,
            poll_rate_hz: default_poll_rate_hz(),
            hot_reload: true,
            initial_sync: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let mut config: AppConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path))?;

        // Profile paths are relative to the config file
        if let Some(profile) = config.engine.profile.as_mut() {
            if profile.is_relative() {
                if let Some(dir) = std::path::Path::new(path).parent() {
                    *profile = dir.join(&*profile);
                }
            }
        }

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if !(1..=1000).contains(&self.engine.poll_rate_hz) {
            anyhow::bail!(
                "engine.poll_rate_hz must be between 1 and 1000, got {}",
                self.engine.poll_rate_hz
            );
        }
        self.calibration.validate()?;
        Ok(())
    }
}

fn default_true() -> bool { true }
fn default_poll_rate_hz() -> u32 { 250 }
