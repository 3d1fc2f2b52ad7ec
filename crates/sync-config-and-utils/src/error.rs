//! Errors raised while loading configuration or resolving paths.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// A configuration value the engine cannot work with.
    #[error("Invalid config field `{field}`: {reason}")]
    Config { field: &'static str, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON for [`crate::Config`].
    #[error("Config file is malformed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Home directory could not be determined")]
    HomeDirUnavailable,
}

pub type CoreResult<T> = Result<T, CoreError>;
