//! Config file handling

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{ApiFlowError, Result};

pub const ENV_TIMEOUT: &str = "APIFLOW_TIMEOUT";
pub const ENV_INSECURE: &str = "APIFLOW_INSECURE";

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: f64,
    pub user_agent: String,
    pub follow_redirects: bool,
    pub max_redirects: usize,
    /// Skip TLS certificate verification
    pub insecure: bool,
    /// Streaming connections end after this long without a message
    pub stream_idle_timeout_ms: u64,
    /// Streaming connections end after this many messages
    pub max_stream_events: usize,
    /// JSON-lines file receiving request history
    pub history_file: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30.0,
            user_agent: format!("apiflow/{}", env!("CARGO_PKG_VERSION")),
            follow_redirects: true,
            max_redirects: 10,
            insecure: false,
            stream_idle_timeout_ms: 5000,
            max_stream_events: 100,
            history_file: None,
        }
    }
}

impl EngineConfig {
    /// Load from `path`, or from the default location when `None`
    ///
    /// A missing default file yields defaults; a missing explicit file is an
    /// error. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default_file = Self::default_config_dir().join("config.toml");
                if default_file.exists() {
                    Self::from_file(&default_file)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ApiFlowError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ApiFlowError::Config(format!("Invalid config TOML: {}", e)))
    }

    fn apply_env_overrides(&mut self) {
        if let Some(timeout) = std::env::var(ENV_TIMEOUT).ok().and_then(|v| v.parse::<f64>().ok()) {
            self.timeout_secs = timeout;
        }
        if let Ok(value) = std::env::var(ENV_INSECURE) {
            self.insecure = matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs.max(0.0))
    }

    pub fn stream_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.stream_idle_timeout_ms)
    }

    /// Get the default config directory
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("apiflow"))
            .unwrap_or_else(|| PathBuf::from(".apiflow"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.follow_redirects);
        assert_eq!(config.max_redirects, 10);
        assert_eq!(config.max_stream_events, 100);
        assert!(config.user_agent.starts_with("apiflow/"));
    }

    #[test]
    fn test_partial_toml() {
        let config = EngineConfig::from_toml("timeout_secs = 2.5\ninsecure = true\n").unwrap();
        assert_eq!(config.timeout(), Duration::from_millis(2500));
        assert!(config.insecure);
        assert_eq!(config.stream_idle_timeout_ms, 5000);
    }

    #[test]
    fn test_invalid_toml() {
        let err = EngineConfig::from_toml("timeout_secs = \"soon\"").unwrap_err();
        assert!(matches!(err, ApiFlowError::Config(_)));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(EngineConfig::load(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
