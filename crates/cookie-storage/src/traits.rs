//! Storage trait definitions.

use crate::{CookieRecord, StorageResult};

/// Per-user persistence of the last-known-good cookie snapshot.
///
/// `set` replaces the whole snapshot for the user; implementations must never
/// merge field by field, so concurrent writers cannot interleave partial
/// snapshots.
pub trait LocalCookieStore: Send + Sync {
    /// Snapshot for `user_id`; empty when nothing has been stored.
    fn get(&self, user_id: &str) -> StorageResult<Vec<CookieRecord>>;

    /// Replace the snapshot for `user_id`.
    fn set(&self, user_id: &str, cookies: &[CookieRecord]) -> StorageResult<()>;

    /// Remove the snapshot. Returns whether one existed.
    fn delete(&self, user_id: &str) -> StorageResult<bool>;
}
