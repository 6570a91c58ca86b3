//! Runtime configuration
//!
//! Small merge hierarchy for the few knobs this library has:
//!
//! ```text
//! Priority (high → low):
//! 1. Environment variables (VELD_STACK_SIZE, VELD_LOG)
//! 2. JSON config file named by VELD_RUNTIME_CONFIG
//! 3. Default values
//! ```

use std::env;
use std::fs;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::sched::DEFAULT_STACK_SIZE;
use crate::util::logger::LogLevel;

/// Environment variable naming a JSON config file.
pub const CONFIG_PATH_VAR: &str = "VELD_RUNTIME_CONFIG";
/// Environment variable overriding the per-task stack size in bytes.
pub const STACK_SIZE_VAR: &str = "VELD_STACK_SIZE";
/// Environment variable overriding the log level.
pub const LOG_VAR: &str = "VELD_LOG";

/// Runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Per-task stack size in bytes (payload, header overhead excluded).
    #[serde(default = "default_stack_size")]
    pub stack_size: usize,
    /// Log level: trace | debug | info | warn | error.
    #[serde(default = "default_log")]
    pub log: String,
}

fn default_stack_size() -> usize {
    DEFAULT_STACK_SIZE
}

fn default_log() -> String {
    "info".to_string()
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: default_stack_size(),
            log: default_log(),
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Load the effective configuration: defaults, then the config file
    /// named by `VELD_RUNTIME_CONFIG` (if any), then env overrides. A
    /// malformed file or override is warned about and skipped, never
    /// fatal.
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Ok(path) = env::var(CONFIG_PATH_VAR) {
            match fs::read_to_string(&path) {
                Ok(text) => match Self::from_json(&text) {
                    Ok(parsed) => config = parsed,
                    Err(e) => warn!("ignoring malformed config {path}: {e}"),
                },
                Err(e) => warn!("cannot read config {path}: {e}"),
            }
        }

        config.apply_env();
        config
    }

    /// Apply environment overrides.
    fn apply_env(&mut self) {
        if let Ok(size) = env::var(STACK_SIZE_VAR) {
            match size.parse::<usize>() {
                Ok(size) if size > 0 => self.stack_size = size,
                _ => warn!("ignoring invalid {STACK_SIZE_VAR}={size}"),
            }
        }
        if let Ok(level) = env::var(LOG_VAR) {
            self.log = level;
        }
    }

    /// The configured log level.
    pub fn log_level(&self) -> LogLevel {
        LogLevel::from_str_or_default(&self.log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RuntimeConfig::default();
        assert_eq!(config.stack_size, DEFAULT_STACK_SIZE);
        assert_eq!(config.log, "info");
    }

    #[test]
    fn test_from_json() {
        let config = RuntimeConfig::from_json(r#"{ "stack_size": 32768 }"#).unwrap();
        assert_eq!(config.stack_size, 32768);
        assert_eq!(config.log, "info");
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(RuntimeConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_log_level_mapping() {
        let mut config = RuntimeConfig::default();
        config.log = "debug".to_string();
        assert_eq!(config.log_level(), LogLevel::Debug);
        config.log = "nonsense".to_string();
        assert_eq!(config.log_level(), LogLevel::Info);
    }

    #[test]
    fn test_config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("veld.json");
        let config = RuntimeConfig {
            stack_size: 8 * 1024,
            log: "warn".to_string(),
        };
        std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let loaded = RuntimeConfig::from_json(&text).unwrap();
        assert_eq!(loaded.stack_size, 8 * 1024);
        assert_eq!(loaded.log, "warn");
    }
}
