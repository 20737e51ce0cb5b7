use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::mode::MatchMode;

pub const DEFAULT_BACKEND_ENDPOINT: &str = "http://localhost:8001";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Base URL of the matching backend
    pub backend_endpoint: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// "product" or "style"
    pub default_mode: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_endpoint: DEFAULT_BACKEND_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            default_mode: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the config file (if any), then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::get_config_path()?)?;
        config.apply_env();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn save_default_mode(mode: MatchMode) -> Result<()> {
        let path = Self::get_config_path()?;
        let mut config = Self::load_from(&path).unwrap_or_else(|_| Self::new());
        config.default_mode = Some(mode.as_str().to_string());
        config.save_to(&path)
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("VIBEY_BACKEND_ENDPOINT") {
            self.backend_endpoint = url;
        }
        if let Some(val) = var("VIBEY_TIMEOUT_SECS") {
            if let Ok(v) = val.parse() {
                self.timeout_secs = v;
            }
        }
        if let Some(mode) = var("VIBEY_DEFAULT_MODE") {
            self.default_mode = Some(mode);
        }
    }

    pub fn mode(&self) -> MatchMode {
        self.default_mode
            .as_deref()
            .and_then(MatchMode::from_str)
            .unwrap_or_default()
    }

    /// Endpoint without a trailing slash, ready for path joining
    pub fn base_url(&self) -> &str {
        self.backend_endpoint.trim_end_matches('/')
    }

    pub fn log_dir() -> Result<PathBuf> {
        let dir = dirs::data_local_dir()
            .or_else(dirs::config_dir)
            .ok_or_else(|| anyhow!("Could not determine data directory"))?;

        Ok(dir.join("vibey"))
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("vibey").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.mode(), MatchMode::Product);
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            backend_endpoint: "http://shop.internal:9000/".to_string(),
            timeout_secs: 5,
            default_mode: Some("style".to_string()),
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.mode(), MatchMode::Style);
        assert_eq!(loaded.base_url(), "http://shop.internal:9000");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("VIBEY_BACKEND_ENDPOINT", "http://example.test"),
            ("VIBEY_TIMEOUT_SECS", "not-a-number"),
            ("VIBEY_DEFAULT_MODE", "style"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::new();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.backend_endpoint, "http://example.test");
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.mode(), MatchMode::Style);
    }

    #[test]
    fn test_unknown_mode_falls_back_to_product() {
        let config = Config {
            default_mode: Some("vibes".to_string()),
            ..Config::default()
        };
        assert_eq!(config.mode(), MatchMode::Product);
    }
}
