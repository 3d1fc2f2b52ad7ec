//! In-memory snapshot store.

use crate::{CookieRecord, LocalCookieStore, StorageResult};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Snapshot store backed by a mutex-guarded map. Suitable for hosts that
/// re-derive cookies on every launch, and for tests.
#[derive(Debug, Default)]
pub struct MemoryCookieStore {
    snapshots: Mutex<HashMap<String, Vec<CookieRecord>>>,
}

impl MemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshots(&self) -> MutexGuard<'_, HashMap<String, Vec<CookieRecord>>> {
        self.snapshots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LocalCookieStore for MemoryCookieStore {
    fn get(&self, user_id: &str) -> StorageResult<Vec<CookieRecord>> {
        Ok(self.snapshots().get(user_id).cloned().unwrap_or_default())
    }

    fn set(&self, user_id: &str, cookies: &[CookieRecord]) -> StorageResult<()> {
        self.snapshots()
            .insert(user_id.to_string(), cookies.to_vec());
        Ok(())
    }

    fn delete(&self, user_id: &str) -> StorageResult<bool> {
        Ok(self.snapshots().remove(user_id).is_some())
    }
}
