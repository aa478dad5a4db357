//! Configuration file handling for dvs-cli

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the CLI tool
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Portal API host, e.g. `parkeren.gemeente.nl`
    pub host: Option<String>,
    /// Account identifier (report code)
    pub identifier: Option<String>,
    /// Account password
    pub password: Option<String>,
}

impl Config {
    /// Load configuration from the default config file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path).with_context(|| {
                format!("Failed to read config file: {}", config_path.display())
            })?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", config_path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("dvs");

        Ok(config_dir.join("config.toml"))
    }

    /// Merge CLI arguments over config file values; every credential field
    /// is required after the merge.
    pub fn merge_with_args(
        &self,
        host: Option<&str>,
        identifier: Option<&str>,
        password: Option<&str>,
    ) -> Result<MergedConfig> {
        Ok(MergedConfig {
            host: host
                .map(String::from)
                .or_else(|| self.host.clone())
                .context("No portal host configured; pass --host or set DVS_HOST")?,
            identifier: identifier
                .map(String::from)
                .or_else(|| self.identifier.clone())
                .context("No identifier configured; pass --identifier or set DVS_IDENTIFIER")?,
            password: password
                .map(String::from)
                .or_else(|| self.password.clone())
                .context("No password configured; pass --password or set DVS_PASSWORD")?,
        })
    }
}

/// Fully resolved configuration after merging CLI args
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub host: String,
    pub identifier: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_take_precedence_over_file_values() {
        let config = Config {
            host: Some("file.example.nl".to_string()),
            identifier: Some("11111".to_string()),
            password: Some("from-file".to_string()),
        };
        let merged = config
            .merge_with_args(Some("flag.example.nl"), None, None)
            .unwrap();
        assert_eq!(merged.host, "flag.example.nl");
        assert_eq!(merged.identifier, "11111");
        assert_eq!(merged.password, "from-file");
    }

    #[test]
    fn missing_credentials_are_an_error() {
        let config = Config::default();
        assert!(config.merge_with_args(Some("h"), Some("i"), None).is_err());
        assert!(config.merge_with_args(None, Some("i"), Some("p")).is_err());
    }
}
