use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_NAME: &str = "gridkit.config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Editor configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Undo levels kept per grid (0 = unlimited)
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// How long a placeholder must stay hovered before `hovering.stay` fires
    #[serde(default = "default_hover_stay_delay_ms")]
    pub hover_stay_delay_ms: u64,

    /// Lower bound for a sibling's size while resizing
    #[serde(default = "default_min_relative_size")]
    pub min_relative_size: f64,
}

fn default_history_limit() -> usize {
    100
}

fn default_hover_stay_delay_ms() -> u64 {
    500
}

fn default_min_relative_size() -> f64 {
    0.1
}

impl EditorConfig {
    /// Load config from a directory; defaults if it holds none
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config_path = dir.as_ref().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_json(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn hover_stay_delay(&self) -> Duration {
        Duration::from_millis(self.hover_stay_delay_ms)
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            hover_stay_delay_ms: default_hover_stay_delay_ms(),
            min_relative_size: default_min_relative_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{ "historyLimit": 20, "hoverStayDelayMs": 250 }"#;

        let config = EditorConfig::from_json(json).unwrap();
        assert_eq!(config.history_limit, 20);
        assert_eq!(config.hover_stay_delay(), Duration::from_millis(250));
        assert_eq!(config.min_relative_size, 0.1);
    }

    #[test]
    fn test_default_config() {
        let config = EditorConfig::default();
        assert_eq!(config.history_limit, 100);
        assert_eq!(config.hover_stay_delay_ms, 500);
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(EditorConfig::load(dir.path()).unwrap(), EditorConfig::default());

        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_NAME),
            r#"{ "minRelativeSize": 0.25 }"#,
        )
        .unwrap();
        let config = EditorConfig::load(dir.path()).unwrap();
        assert_eq!(config.min_relative_size, 0.25);

        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), "{ nope").unwrap();
        assert!(matches!(
            EditorConfig::load(dir.path()),
            Err(ConfigError::Json(_))
        ));
    }
}
