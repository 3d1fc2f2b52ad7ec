//! Cookie records and the per-user local cookie store.
//!
//! This crate provides:
//! - [`CookieRecord`]: the canonical cookie representation shared by every
//!   store, with RFC 6265 validation on synthesis
//! - [`LocalCookieStore`]: the persistence boundary holding each user's
//!   last-known-good cookie snapshot
//! - [`MemoryCookieStore`] and [`FileCookieStore`] implementations

mod file;
mod memory;
mod record;
mod traits;

pub use file::FileCookieStore;
pub use memory::MemoryCookieStore;
pub use record::{normalize_domain, CookieError, CookieKey, CookieRecord, ROOT_PATH};
pub use traits::LocalCookieStore;

use thiserror::Error;

/// Error type for snapshot storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
