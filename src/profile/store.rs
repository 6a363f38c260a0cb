//! YAML profile store
//!
//! Loads and saves [`MappingProfile`]s. The engine never touches the disk;
//! callers load a profile here and hand it to `MappingEngine::load_profile`.

use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

use super::MappingProfile;

impl MappingProfile {
    /// Load a profile from file with validation
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read profile: {}", path.display()))?;

        let profile = Self::from_yaml(&contents)
            .with_context(|| format!("Invalid profile: {}", path.display()))?;

        Ok(profile)
    }

    /// Parse and validate a profile from YAML text
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let profile: MappingProfile =
            serde_yaml::from_str(contents).context("Failed to parse YAML profile")?;
        profile.validate()?;
        Ok(profile)
    }

    /// Save profile to file
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self).context("Failed to serialize profile to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write profile: {}", path.display()))?;

        Ok(())
    }
}
