//! Configuration management for mcp-rule.
//!
//! Handles loading and saving configuration from TOML files.
//! Config files are stored in platform-specific locations:
//!
//! - **macOS/Linux**: `~/.config/mcp-rule/config.toml`
//! - **Windows**: `%APPDATA%\mcp-rule\config.toml`
//!
//! The API key is never written here; it lives in the OS keychain
//! (see the `rule-storage` crate) or comes from the environment.
//!
//! # Example
//!
//! ```ignore
//! use rule_core::config::Config;
//!
//! let mut config = Config::load()?;
//! config.set("rule.base_url", "https://app.rule.io/api/v3")?;
//! config.save()?;
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{Error, Result};

/// Config file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config directory name.
const CONFIG_DIR_NAME: &str = "mcp-rule";

// =============================================================================
// Configuration structures
// =============================================================================

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Rule.io API settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<RuleConfig>,
}

/// Rule.io API settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// API base URL override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Request timeout in seconds (transport default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

// =============================================================================
// Config implementation
// =============================================================================

impl Config {
    /// Get the configuration directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(CONFIG_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the configuration file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default location.
    ///
    /// Returns a default (empty) config if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// Returns a default (empty) config if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = ?path, "Config file does not exist, using defaults");
            return Ok(Self::default());
        }

        debug!(path = ?path, "Loading config");

        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;

        info!(path = ?path, "Config loaded successfully");
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
        }

        debug!(path = ?path, "Saving config");

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        info!(path = ?path, "Config saved successfully");
        Ok(())
    }

    /// Configured base URL, if any.
    pub fn base_url(&self) -> Option<&str> {
        self.rule.as_ref().and_then(|r| r.base_url.as_deref())
    }

    /// Configured request timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.rule
            .as_ref()
            .and_then(|r| r.timeout_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Set a configuration value by key path.
    ///
    /// Key format: `section.field` (e.g., `rule.base_url`)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let (section, field) = split_key(key)?;

        match section {
            "rule" => {
                let config = self.rule.get_or_insert_with(RuleConfig::default);
                match field {
                    "base_url" | "url" => {
                        config.base_url = Some(value.trim_end_matches('/').to_string())
                    }
                    "timeout_secs" | "timeout" => {
                        let secs = value
                            .parse::<u64>()
                            .ok()
                            .filter(|secs| *secs > 0)
                            .ok_or_else(|| {
                                Error::Config(format!(
                                    "Invalid timeout '{}': expected a positive number of seconds",
                                    value
                                ))
                            })?;
                        config.timeout_secs = Some(secs);
                    }
                    "api_key" => {
                        return Err(Error::Config(
                            "The API key is not stored in the config file. \
                             Use `mcp-rule auth set <key>` or RULE_API_KEY"
                                .to_string(),
                        ))
                    }
                    _ => {
                        return Err(Error::Config(format!(
                            "Unknown rule config field: {}",
                            field
                        )))
                    }
                }
            }
            _ => {
                return Err(Error::Config(format!("Unknown config section: {}", section)));
            }
        }

        Ok(())
    }

    /// Get a configuration value by key path.
    ///
    /// Key format: `section.field` (e.g., `rule.base_url`)
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let (section, field) = split_key(key)?;

        match section {
            "rule" => {
                let Some(config) = &self.rule else {
                    return Ok(None);
                };
                match field {
                    "base_url" | "url" => Ok(config.base_url.clone()),
                    "timeout_secs" | "timeout" => Ok(config.timeout_secs.map(|s| s.to_string())),
                    _ => Err(Error::Config(format!(
                        "Unknown rule config field: {}",
                        field
                    ))),
                }
            }
            _ => Err(Error::Config(format!("Unknown config section: {}", section))),
        }
    }
}

fn split_key(key: &str) -> Result<(&str, &str)> {
    let parts: Vec<&str> = key.split('.').collect();
    if parts.len() != 2 {
        return Err(Error::Config(format!(
            "Invalid config key '{}'. Expected format: section.field",
            key
        )));
    }
    Ok((parts[0], parts[1]))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.rule.is_none());
        assert!(config.base_url().is_none());
        assert!(config.timeout().is_none());
    }

    #[test]
    fn test_set_and_get() {
        let mut config = Config::default();

        config
            .set("rule.base_url", "https://rule.example.com/api/v3/")
            .unwrap();
        config.set("rule.timeout_secs", "15").unwrap();

        assert_eq!(
            config.get("rule.base_url").unwrap(),
            Some("https://rule.example.com/api/v3".to_string())
        );
        assert_eq!(config.get("rule.timeout").unwrap(), Some("15".to_string()));
        assert_eq!(config.timeout(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_invalid_key() {
        let mut config = Config::default();

        assert!(config.set("invalid", "value").is_err());
        assert!(config.set("too.many.parts", "value").is_err());
        assert!(config.set("unknown.field", "value").is_err());
        assert!(config.set("rule.timeout_secs", "soon").is_err());
        assert!(matches!(
            config.set("rule.timeout_secs", "0"),
            Err(Error::Config(_))
        ));

        // When the section doesn't exist, get returns Ok(None)
        assert_eq!(config.get("rule.base_url").unwrap(), None);

        config.set("rule.base_url", "https://x").unwrap();
        assert!(config.get("rule.unknown_field").is_err());
    }

    #[test]
    fn test_api_key_is_refused() {
        let mut config = Config::default();
        let err = config.set("rule.api_key", "secret").unwrap_err();
        assert!(err.to_string().contains("not stored in the config file"));
        assert!(config.rule.as_ref().map_or(true, |r| r.base_url.is_none()));
    }

    #[test]
    fn test_save_and_load() {
        let mut config = Config::default();
        config.set("rule.base_url", "https://rule.example.com").unwrap();

        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();

        config.save_to(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[rule]"));
        assert!(contents.contains("base_url = \"https://rule.example.com\""));

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_nonexistent() {
        let path = PathBuf::from("/nonexistent/path/config.toml");
        let config = Config::load_from(&path).unwrap();
        assert!(config.rule.is_none());
    }

    #[test]
    fn test_load_invalid_toml() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "[rule\nbase_url = ").unwrap();

        let result = Config::load_from(temp_file.path());
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
