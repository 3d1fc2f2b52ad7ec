//! Engine-facing switches, built once at construction.

use sync_config_and_utils::{Config, DEFAULT_SID_COOKIE_NAME};

/// Flags the engine reads; never consulted from global state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Reconcile Visualforce cookies (front-door session replacement).
    pub front_door_sid_replacement: bool,
    /// Stop a running monitor when it is dropped.
    pub monitor_teardown_on_drop: bool,
    /// Session-identifier cookie name when the credential names none.
    pub default_sid_cookie_name: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            front_door_sid_replacement: true,
            monitor_teardown_on_drop: true,
            default_sid_cookie_name: DEFAULT_SID_COOKIE_NAME.to_string(),
        }
    }
}

impl From<&Config> for SyncConfig {
    fn from(config: &Config) -> Self {
        Self {
            front_door_sid_replacement: config.front_door_sid_replacement,
            monitor_teardown_on_drop: config.monitor_teardown_on_drop,
            default_sid_cookie_name: config.default_sid_cookie_name.clone(),
        }
    }
}
