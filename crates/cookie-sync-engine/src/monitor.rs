//! Synchronization monitor.
//!
//! Watches the live cookie store and writes its session-only cookies back to
//! the local store, so cookies the server rotates during page loads survive
//! into the next synchronization cycle.

use crate::config::SyncConfig;
use crate::live_store::{ChangeSubscription, LiveCookieStore};
use crate::monitor_fsm::{MonitorMachine, MonitorMachineInput, MonitorState};
use cookie_storage::{CookieRecord, LocalCookieStore};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

struct MonitorInner {
    machine: MonitorMachine,
    task: Option<JoinHandle<()>>,
}

/// Idle/Monitoring observer of one user's live cookie store.
///
/// The local store is only ever written here.
pub struct SyncMonitor {
    user_id: String,
    live: Arc<dyn LiveCookieStore>,
    local: Arc<dyn LocalCookieStore>,
    teardown_on_drop: bool,
    inner: Mutex<MonitorInner>,
}

impl SyncMonitor {
    pub fn new(
        user_id: impl Into<String>,
        live: Arc<dyn LiveCookieStore>,
        local: Arc<dyn LocalCookieStore>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            live,
            local,
            teardown_on_drop: config.monitor_teardown_on_drop,
            inner: Mutex::new(MonitorInner {
                machine: MonitorMachine::new(),
                task: None,
            }),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn state(&self) -> MonitorState {
        MonitorState::from(self.lock().machine.state())
    }

    pub fn is_monitoring(&self) -> bool {
        self.state() == MonitorState::Monitoring
    }

    /// Idle -> Monitoring. Returns false when already monitoring, or when
    /// called outside a tokio runtime.
    pub fn start(&self) -> bool {
        let Ok(runtime) = Handle::try_current() else {
            error!(user_id = %self.user_id, "Cannot start cookie monitor outside a tokio runtime");
            return false;
        };

        let mut inner = self.lock();
        if inner.machine.consume(&MonitorMachineInput::Start).is_err() {
            debug!(user_id = %self.user_id, "Cookie monitor already running");
            return false;
        }

        // Subscribe before spawning so no change slips past.
        let subscription = self.live.observe_changes();
        inner.task = Some(runtime.spawn(watch(
            self.user_id.clone(),
            self.live.clone(),
            self.local.clone(),
            subscription,
        )));

        info!(user_id = %self.user_id, "Cookie monitor started");
        true
    }

    /// Monitoring -> Idle. Returns false when already idle.
    pub fn stop(&self) -> bool {
        let mut inner = self.lock();
        stop_inner(&mut inner, &self.user_id)
    }

    fn lock(&self) -> MutexGuard<'_, MonitorInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn stop_inner(inner: &mut MonitorInner, user_id: &str) -> bool {
    if inner.machine.consume(&MonitorMachineInput::Stop).is_err() {
        debug!(user_id, "Cookie monitor already stopped");
        return false;
    }
    // Dropping the task drops its subscription.
    if let Some(task) = inner.task.take() {
        task.abort();
    }
    info!(user_id, "Cookie monitor stopped");
    true
}

impl Drop for SyncMonitor {
    fn drop(&mut self) {
        let inner = self
            .inner
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if MonitorState::from(inner.machine.state()) != MonitorState::Monitoring {
            return;
        }
        if self.teardown_on_drop {
            stop_inner(inner, &self.user_id);
        } else {
            warn!(user_id = %self.user_id, "Cookie monitor dropped while running, observer left registered");
        }
    }
}

async fn watch(
    user_id: String,
    live: Arc<dyn LiveCookieStore>,
    local: Arc<dyn LocalCookieStore>,
    mut subscription: ChangeSubscription,
) {
    while let Some(change) = subscription.next().await {
        debug!(user_id = %user_id, change = ?change, "Live cookies changed");

        let cookies = match live.get_all().await {
            Ok(cookies) => cookies,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Failed to read live cookies");
                continue;
            }
        };

        let session: Vec<CookieRecord> = cookies.into_iter().filter(|c| c.session_only).collect();
        match local.set(&user_id, &session) {
            Ok(()) => debug!(user_id = %user_id, count = session.len(), "Persisted session cookies"),
            Err(e) => error!(user_id = %user_id, error = %e, "Failed to persist session cookies"),
        }
    }
    debug!(user_id = %user_id, "Live cookie store closed, monitor task exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live_store::{InMemoryCookieJar, UiCookieStoreAdapter};
    use cookie_storage::MemoryCookieStore;

    fn monitor(teardown_on_drop: bool) -> (SyncMonitor, Arc<UiCookieStoreAdapter>) {
        let adapter = Arc::new(UiCookieStoreAdapter::spawn(InMemoryCookieJar::new()).unwrap());
        let config = SyncConfig {
            monitor_teardown_on_drop: teardown_on_drop,
            ..SyncConfig::default()
        };
        let monitor = SyncMonitor::new(
            "005xx0000001",
            adapter.clone(),
            Arc::new(MemoryCookieStore::new()),
            &config,
        );
        (monitor, adapter)
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let (monitor, adapter) = monitor(true);
        assert_eq!(monitor.state(), MonitorState::Idle);

        assert!(monitor.start());
        assert!(!monitor.start());
        assert!(monitor.is_monitoring());
        assert_eq!(adapter.observer_count(), 1);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let (monitor, adapter) = monitor(true);
        assert!(!monitor.stop());

        monitor.start();
        assert!(monitor.stop());
        assert!(!monitor.stop());
        assert_eq!(monitor.state(), MonitorState::Idle);

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(adapter.observer_count(), 0);
    }

    #[tokio::test]
    async fn test_restart_registers_one_observer() {
        let (monitor, adapter) = monitor(true);
        monitor.start();
        monitor.stop();
        monitor.start();

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(adapter.observer_count(), 1);
    }

    #[tokio::test]
    async fn test_drop_tears_down_when_enabled() {
        let (monitor, adapter) = monitor(true);
        monitor.start();
        drop(monitor);

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(adapter.observer_count(), 0);
    }

    #[tokio::test]
    async fn test_drop_leaves_observer_when_disabled() {
        let (monitor, adapter) = monitor(false);
        monitor.start();
        drop(monitor);

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(adapter.observer_count(), 1);
    }

    #[test]
    fn test_start_outside_runtime_is_refused() {
        let adapter = Arc::new(
            UiCookieStoreAdapter::spawn(InMemoryCookieJar::new()).unwrap(),
        );
        let monitor = SyncMonitor::new(
            "005xx0000001",
            adapter,
            Arc::new(MemoryCookieStore::new()),
            &SyncConfig::default(),
        );
        assert!(!monitor.start());
        assert_eq!(monitor.state(), MonitorState::Idle);
    }
}
