//! Application configuration: where the keystore directory lives.

use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Persisted application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Keystore directory to index when none is given on the command line.
    #[serde(default)]
    pub keystore_dir: Option<PathBuf>,
}

impl Config {
    /// Load the configuration from the platform-specific config path,
    /// falling back to defaults if it is missing or unreadable.
    pub fn load() -> Self {
        match Self::load_internal() {
            Ok(config) => config,
            Err(err) => {
                log::debug!("failed to load config, using defaults: {err}");
                Self::default()
            }
        }
    }

    fn load_internal() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save the configuration to the platform-specific config path.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// The keystore directory to use: the configured one, or the
    /// platform's data directory for this application.
    pub fn keystore_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.keystore_dir {
            return Ok(dir.clone());
        }
        let dirs = project_dirs()?;
        Ok(dirs.data_dir().join("keystore"))
    }

    fn config_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.json"))
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("io", "keydex", "keydex")
        .ok_or_else(|| anyhow::anyhow!("failed to determine project directories"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_json_round_trip() {
        let config = Config {
            keystore_dir: Some(PathBuf::from("/keys")),
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.keystore_dir, Some(PathBuf::from("/keys")));
    }

    #[test]
    fn test_missing_field_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert!(config.keystore_dir.is_none());
    }

    #[test]
    fn test_explicit_keystore_dir_wins() {
        let config = Config {
            keystore_dir: Some(PathBuf::from("/keys")),
        };
        assert_eq!(config.keystore_dir().unwrap(), PathBuf::from("/keys"));
    }
}
