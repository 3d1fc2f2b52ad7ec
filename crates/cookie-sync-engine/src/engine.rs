//! One synchronization cycle, end to end.

use crate::config::SyncConfig;
use crate::credentials::CredentialView;
use crate::error::SyncResult;
use crate::live_store::{FailedWrite, LiveCookieStore};
use crate::monitor::SyncMonitor;
use crate::reconciler::Reconciler;
use crate::resolver::resolve_bundles;
use crate::scopes::ScopeInspector;
use cookie_storage::{CookieRecord, LocalCookieStore, StorageResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

/// Outcome of a successful [`CookieSyncEngine::synchronize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub user_id: String,
    /// The reconciled set handed to the live store, in write order.
    pub cookies: Vec<CookieRecord>,
    /// Writes the live store confirmed.
    pub applied: usize,
    /// Problems downgraded during reconciliation.
    pub warnings: Vec<String>,
    /// Granted scopes that do not cover an authenticated domain.
    pub scope_warnings: Vec<String>,
    /// Writes the live store rejected.
    pub failed_writes: Vec<FailedWrite>,
}

/// Derives, reconciles and applies session cookies for authenticated users.
///
/// At most one cycle per user is in flight; a second `synchronize` for the
/// same user waits for the first to finish. Cycles for different users run
/// independently. A user's lock is released once no cycle holds it.
pub struct CookieSyncEngine {
    config: SyncConfig,
    reconciler: Reconciler,
    live: Arc<dyn LiveCookieStore>,
    local: Arc<dyn LocalCookieStore>,
    user_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl CookieSyncEngine {
    pub fn new(
        config: SyncConfig,
        live: Arc<dyn LiveCookieStore>,
        local: Arc<dyn LocalCookieStore>,
    ) -> Self {
        Self {
            reconciler: Reconciler::new(&config),
            config,
            live,
            local,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Scope coverage warnings for `credential`. Never blocks a cycle.
    pub fn inspect_scopes(&self, credential: &CredentialView) -> Vec<String> {
        ScopeInspector::inspect(&credential.scopes)
    }

    /// Run one cycle: resolve, reconcile against the persisted snapshot,
    /// apply to the live store.
    ///
    /// On error the live store has not been touched. Dropping the returned
    /// future after the batch was handed off does not roll back writes.
    pub async fn synchronize(&self, credential: &CredentialView) -> SyncResult<SyncReport> {
        let user_id = credential.user_id.as_str();

        let scope_warnings = self.inspect_scopes(credential);
        for warning in &scope_warnings {
            warn!(user_id, "{}", warning);
        }

        let lock = self.user_lock(user_id);
        let result = {
            let _guard = lock.lock().await;
            self.run_cycle(credential, scope_warnings).await
        };
        drop(lock);
        self.release_lock(user_id);
        result
    }

    async fn run_cycle(
        &self,
        credential: &CredentialView,
        scope_warnings: Vec<String>,
    ) -> SyncResult<SyncReport> {
        let user_id = credential.user_id.as_str();
        debug!(user_id, "Starting cookie synchronization");

        let prior = match self.local.get(user_id) {
            Ok(cookies) => cookies,
            Err(e) => {
                warn!(user_id, error = %e, "Could not read cookie snapshot, reconciling from scratch");
                Vec::new()
            }
        };

        let bundles = resolve_bundles(credential, &self.config.default_sid_cookie_name);
        let reconciliation = self
            .reconciler
            .reconcile(&bundles, &prior, user_id)
            .map_err(|e| {
                error!(user_id, error = %e, "Cookie reconciliation failed");
                e
            })?;

        let report = self.live.apply_all(&reconciliation.cookies).await?;

        info!(
            user_id,
            applied = report.applied,
            failed = report.failed.len(),
            warnings = reconciliation.warnings.len(),
            "Session cookies synchronized"
        );

        Ok(SyncReport {
            user_id: user_id.to_string(),
            cookies: reconciliation.cookies.into_vec(),
            applied: report.applied,
            warnings: reconciliation.warnings,
            scope_warnings,
            failed_writes: report.failed,
        })
    }

    /// A monitor persisting `user_id`'s live cookies. Not started.
    pub fn monitor_for(&self, user_id: &str) -> SyncMonitor {
        SyncMonitor::new(user_id, self.live.clone(), self.local.clone(), &self.config)
    }

    /// Drop everything persisted for `user_id` (logout).
    pub fn forget_user(&self, user_id: &str) -> StorageResult<bool> {
        let existed = self.local.delete(user_id)?;
        self.release_lock(user_id);
        info!(user_id, existed, "Forgot persisted session cookies");
        Ok(existed)
    }

    fn user_lock(&self, user_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks()
            .entry(user_id.to_string())
            .or_default()
            .clone()
    }

    /// Drop `user_id`'s lock unless a cycle still holds or waits on it.
    fn release_lock(&self, user_id: &str) {
        let mut locks = self.locks();
        if locks
            .get(user_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(user_id);
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked_users(&self) -> usize {
        self.locks().len()
    }

    fn locks(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<tokio::sync::Mutex<()>>>> {
        self.user_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
