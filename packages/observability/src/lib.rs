//! # Observability
//!
//! Logging initialization for the cookie synchronization crates.
//!
//! Library crates only emit events through the standard `tracing` macros and
//! never install a subscriber themselves. The hosting application calls
//! [`init`] or [`init_with_config`] once at startup and decides where the
//! events go.
//!
//! ## Output modes
//!
//! - Default: compact human-readable lines on stderr, filtered by `RUST_LOG`
//!   or the configured default level.
//! - `dev` feature: structured JSONL appended to a central file
//!   (`~/.cookie-sync/logs/sync.jsonl` unless [`LogConfig::log_path`] is set),
//!   optionally mirrored to stderr.
//!
//! ## Usage
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "hybrid-host".into(),
//!     default_level: "debug".into(),
//!     ..Default::default()
//! });
//! tracing::info!("cookie sync ready");
//! ```

#[cfg(feature = "dev")]
mod dev;

#[cfg_attr(not(feature = "dev"), allow(dead_code))]
mod json_layer;

use std::path::PathBuf;

pub use json_layer::LogEntry;

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the embedding service, written into every JSONL entry.
    pub service_name: String,

    /// Default level filter (e.g. "debug", "info", "warn").
    /// `RUST_LOG` takes precedence when set.
    pub default_level: String,

    /// Optional custom log file path for the `dev` JSONL output.
    pub log_path: Option<PathBuf>,

    /// Mirror JSONL output to stderr (only meaningful with the `dev` feature).
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "cookie-sync".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Initialize logging with default settings for the given service.
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize logging with custom configuration.
///
/// Installing a second global subscriber is silently ignored, so hosts that
/// re-run their bootstrap (and test binaries) can call this more than once.
pub fn init_with_config(config: LogConfig) {
    #[cfg(feature = "dev")]
    {
        dev::init_dev_subscriber(&config);
        return;
    }

    #[cfg(not(feature = "dev"))]
    {
        use tracing_subscriber::util::SubscriberInitExt;
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter(&config.default_level))
            .with_target(true)
            .with_writer(std::io::stderr)
            .compact()
            .finish()
            .try_init();
    }
}

/// Build the level filter, preferring `RUST_LOG` over the configured default.
pub(crate) fn env_filter(default_level: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level))
}

pub use tracing::{debug, error, info, instrument, trace, warn};
pub use tracing::Level;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.service_name, "cookie-sync");
        assert_eq!(config.default_level, "info");
        assert!(config.log_path.is_none());
        assert!(!config.also_stderr);
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        init("first");
        init("second");
        tracing::info!("still logging");
    }
}
