use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Recognised log levels, lowest first.
pub const LOG_LEVELS: [&str; 4] = ["debug", "info", "warn", "error"];

pub const ENV_API_KEY: &str = "OPENWEATHER_API_KEY";
pub const ENV_BASE_URL: &str = "OPENWEATHER_BASE_URL";
pub const ENV_TIMEOUT: &str = "TEST_TIMEOUT";
pub const ENV_DETAILED_LOGGING: &str = "ENABLE_DETAILED_LOGGING";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

/// Client configuration, stored on disk as TOML and overlaid with the environment.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// base_url = "https://api.openweathermap.org/data/2.5"
/// timeout_ms = 30000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Credential sent as `appid` on every request.
    pub api_key: Option<String>,
    pub base_url: String,
    /// Per-request transport timeout in milliseconds.
    pub timeout_ms: u64,
    /// Log response bodies at debug level.
    pub detailed_logging: bool,
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            detailed_logging: false,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl ClientConfig {
    /// Config with only the credential set.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self { api_key: Some(api_key.into()), ..Self::default() }
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Invalid configuration TOML")
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "owm-check", "owm-check")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Overlay values from an environment-like lookup.
    ///
    /// The lookup is a parameter so that only the binary touches the real
    /// process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_API_KEY).filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(url) = lookup(ENV_BASE_URL).filter(|u| !u.trim().is_empty()) {
            self.base_url = url;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT) {
            self.timeout_ms = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_TIMEOUT} must be milliseconds, got '{raw}'"))?;
        }
        if let Some(flag) = lookup(ENV_DETAILED_LOGGING) {
            self.detailed_logging = flag == "true";
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        Ok(())
    }

    /// Normalised log level; unknown values fall back to `info`.
    pub fn effective_log_level(&self) -> &str {
        let level = self.log_level.trim();
        LOG_LEVELS
            .iter()
            .find(|l| l.eq_ignore_ascii_case(level))
            .copied()
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Returns the credential if present and not blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    /// Convenience helper: set/replace the credential.
    pub fn upsert_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn defaults_match_public_api() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.base_url, "https://api.openweathermap.org/data/2.5");
        assert_eq!(cfg.timeout_ms, 30_000);
        assert!(!cfg.detailed_logging);
        assert_eq!(cfg.effective_log_level(), "info");
        assert!(cfg.api_key().is_none());
    }

    #[test]
    fn env_overrides_every_field() {
        let mut cfg = ClientConfig::default();
        cfg.apply_env(env(&[
            ("OPENWEATHER_API_KEY", "KEY"),
            ("OPENWEATHER_BASE_URL", "http://localhost:9999"),
            ("TEST_TIMEOUT", "5000"),
            ("ENABLE_DETAILED_LOGGING", "true"),
            ("LOG_LEVEL", "debug"),
        ]))
        .unwrap();

        assert_eq!(cfg.api_key(), Some("KEY"));
        assert_eq!(cfg.base_url, "http://localhost:9999");
        assert_eq!(cfg.timeout_ms, 5000);
        assert!(cfg.detailed_logging);
        assert_eq!(cfg.effective_log_level(), "debug");
    }

    #[test]
    fn empty_env_keeps_file_values() {
        let mut cfg = ClientConfig::with_api_key("FILE_KEY");
        cfg.apply_env(env(&[])).unwrap();
        assert_eq!(cfg.api_key(), Some("FILE_KEY"));
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn blank_env_api_key_keeps_stored_key() {
        let mut cfg = ClientConfig::with_api_key("FILE_KEY");
        cfg.apply_env(env(&[("OPENWEATHER_API_KEY", ""), ("OPENWEATHER_BASE_URL", "  ")]))
            .unwrap();
        assert_eq!(cfg.api_key(), Some("FILE_KEY"));
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);

        cfg.apply_env(env(&[("OPENWEATHER_API_KEY", "   ")])).unwrap();
        assert_eq!(cfg.api_key(), Some("FILE_KEY"));
    }

    #[test]
    fn detailed_logging_only_on_literal_true() {
        let mut cfg = ClientConfig::default();
        cfg.apply_env(env(&[("ENABLE_DETAILED_LOGGING", "yes")])).unwrap();
        assert!(!cfg.detailed_logging);
    }

    #[test]
    fn invalid_timeout_is_an_error() {
        let mut cfg = ClientConfig::default();
        let err = cfg.apply_env(env(&[("TEST_TIMEOUT", "soon")])).unwrap_err();
        assert!(err.to_string().contains("TEST_TIMEOUT"));
    }

    #[test]
    fn unknown_log_level_falls_back_to_info() {
        let cfg = ClientConfig { log_level: "verbose".into(), ..ClientConfig::default() };
        assert_eq!(cfg.effective_log_level(), "info");

        let cfg = ClientConfig { log_level: "WARN".into(), ..ClientConfig::default() };
        assert_eq!(cfg.effective_log_level(), "warn");
    }

    #[test]
    fn blank_api_key_is_treated_as_missing() {
        let cfg = ClientConfig::with_api_key("   ");
        assert!(cfg.api_key().is_none());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg = ClientConfig::from_toml("api_key = \"ABC\"\ntimeout_ms = 1000\n").unwrap();
        assert_eq!(cfg.api_key(), Some("ABC"));
        assert_eq!(cfg.timeout_ms, 1000);
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn upsert_replaces_key() {
        let mut cfg = ClientConfig::with_api_key("OLD");
        cfg.upsert_api_key("NEW".into());
        assert_eq!(cfg.api_key(), Some("NEW"));
    }
}
