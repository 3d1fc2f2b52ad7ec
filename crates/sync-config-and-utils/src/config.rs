//! Configuration management for the cookie sync engine.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Session-identifier cookie name used when a credential does not name one.
pub const DEFAULT_SID_COOKIE_NAME: &str = "sid";

const ENV_LOG_LEVEL: &str = "COOKIE_SYNC_LOG_LEVEL";
const ENV_FRONT_DOOR: &str = "COOKIE_SYNC_FRONT_DOOR_SID_REPLACEMENT";
const ENV_MONITOR_TEARDOWN: &str = "COOKIE_SYNC_MONITOR_TEARDOWN_ON_DROP";

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Reconcile Visualforce cookies (front-door session replacement).
    #[serde(default = "default_true")]
    pub front_door_sid_replacement: bool,
    /// Stop a still-running monitor when it is dropped.
    #[serde(default = "default_true")]
    pub monitor_teardown_on_drop: bool,
    /// Session-identifier cookie name fallback.
    #[serde(default = "default_sid_cookie_name")]
    pub default_sid_cookie_name: String,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_true() -> bool {
    true
}

fn default_sid_cookie_name() -> String {
    DEFAULT_SID_COOKIE_NAME.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            front_door_sid_replacement: true,
            monitor_teardown_on_drop: true,
            default_sid_cookie_name: default_sid_cookie_name(),
        }
    }
}

impl Config {
    /// Defaults overridden from the environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load `<base>/config.json` (or defaults when absent), then apply
    /// environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to `<base>/config.json`.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.default_sid_cookie_name.trim().is_empty() {
            return Err(CoreError::Config {
                field: "default_sid_cookie_name",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    fn load_from_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(flag) = lookup(ENV_FRONT_DOOR).as_deref().and_then(parse_flag) {
            self.front_door_sid_replacement = flag;
        }
        if let Some(flag) = lookup(ENV_MONITOR_TEARDOWN)
            .as_deref()
            .and_then(parse_flag)
        {
            self.monitor_teardown_on_drop = flag;
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
