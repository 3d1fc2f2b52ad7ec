//! Logging initialization for hosts embedding the cookie sync engine.
//!
//! The engine crates only emit `tracing` events. Hosts that have no
//! subscriber of their own call [`init_logging`] once at startup.

use observability::LogConfig;

/// Initialize logging with the default service name.
///
/// ```ignore
/// let config = sync_config_and_utils::Config::new();
/// sync_config_and_utils::init_logging(&config.log_level);
/// tracing::info!("cookie sync ready");
/// ```
pub fn init_logging(level: &str) {
    init_logging_for_service("cookie-sync", level);
}

/// Initialize logging with a custom service name.
pub fn init_logging_for_service(service_name: &str, level: &str) {
    observability::init_with_config(LogConfig {
        service_name: service_name.into(),
        default_level: parse_level(level).as_str().to_ascii_lowercase(),
        also_stderr: true,
        ..Default::default()
    });
}

/// Parse a log level string into a tracing Level. Unknown values map to INFO.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
