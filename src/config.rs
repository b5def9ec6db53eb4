use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::summary::SummaryThresholds;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[source] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to write config: {0}")]
    Write(#[source] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".focus-monitor/session.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub interval_ms: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self { interval_ms: 2_000 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub summary: SummaryThresholds,
    pub server: ServerConfig,
    pub replay: ReplayConfig,
}

impl MonitorConfig {
    pub fn load(path: Option<PathBuf>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let config_path = path.or_else(default_config_path);
        let mut config = match config_path.as_ref() {
            Some(path) if path.exists() => {
                let contents = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
                Self::from_toml_str(&contents)?
            }
            _ => MonitorConfig::default(),
        };

        config.apply_env_overrides();
        Ok((config, config_path))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn write(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Write)?;
        }
        let payload = toml::to_string_pretty(self)?;
        std::fs::write(path, payload).map_err(ConfigError::Write)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(base_url) = env::var("FOCUS_API_BASE") {
            if !base_url.trim().is_empty() {
                self.api.base_url = base_url;
            }
        }
        if let Ok(timeout) = env::var("FOCUS_API_TIMEOUT_MS") {
            if let Ok(value) = timeout.parse::<u64>() {
                self.api.timeout_ms = value;
            }
        }
        if let Ok(path) = env::var("FOCUS_SESSION_PATH") {
            if !path.trim().is_empty() {
                self.session.path = PathBuf::from(path);
            }
        }
        if let Ok(host) = env::var("FOCUS_SERVER_HOST") {
            if !host.trim().is_empty() {
                self.server.host = host;
            }
        }
        if let Ok(port) = env::var("FOCUS_SERVER_PORT") {
            if let Ok(value) = port.parse::<u16>() {
                self.server.port = value;
            }
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    env::var("FOCUS_MONITOR_CONFIG")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| Some(PathBuf::from("config/monitor.toml")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = MonitorConfig::from_toml_str(
            r#"
[api]
base_url = "http://focus.internal/api"

[summary]
afternoon_low_count = 4
"#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "http://focus.internal/api");
        assert_eq!(config.api.timeout_ms, 10_000);
        assert_eq!(config.summary.afternoon_low_count, 4);
        assert_eq!(config.summary.recent_window, 5);
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        assert!(matches!(
            MonitorConfig::from_toml_str("[api\nbase_url = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn written_config_reads_back() {
        let dir = std::env::temp_dir().join(format!("focus-monitor-config-{}", std::process::id()));
        let path = dir.join("nested").join("monitor.toml");

        let mut config = MonitorConfig::default();
        config.server.port = 9100;
        config.summary.feedback_keyword = "dull".to_string();
        config.write(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(MonitorConfig::from_toml_str(&contents).unwrap(), config);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
