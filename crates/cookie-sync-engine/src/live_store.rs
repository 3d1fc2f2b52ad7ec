//! Live cookie store: the web view's active cookie jar.
//!
//! Web view cookie jars must only be touched from the UI context that owns
//! them. [`UiCookieStoreAdapter`] owns the jar on a dedicated thread and
//! marshals every request onto it; callers are completed only after the
//! jar has confirmed the writes.

use crate::cookie_set::ReconciledCookieSet;
use crate::error::LiveStoreError;
use async_trait::async_trait;
use cookie_storage::CookieRecord;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

/// Capacity of the change broadcast. Observers only care that something
/// changed, so lagging is harmless.
const CHANGE_CHANNEL_CAPACITY: usize = 16;

const UI_THREAD_NAME: &str = "cookie-jar-ui";

/// The platform cookie jar. Only ever called from its owning thread.
pub trait CookieJar: Send + 'static {
    /// Store one cookie, replacing any with the same name and domain.
    fn set_cookie(&mut self, cookie: &CookieRecord) -> Result<(), String>;

    /// Every cookie currently in the jar.
    fn cookies(&self) -> Vec<CookieRecord>;
}

/// Why observers are being woken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieStoreChange {
    /// Cookies changed outside the engine (page loads, server rotation).
    External,
    /// A batch from `apply_all` landed.
    Applied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedWrite {
    pub name: String,
    pub domain: String,
    pub reason: String,
}

/// Result of one batch. Individual failures never abort the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub applied: usize,
    pub failed: Vec<FailedWrite>,
}

/// Async view of the live cookie store.
#[async_trait]
pub trait LiveCookieStore: Send + Sync {
    /// Write the whole set; resolves once the jar has confirmed every write.
    async fn apply_all(&self, cookies: &ReconciledCookieSet) -> Result<ApplyReport, LiveStoreError>;

    async fn get_all(&self) -> Result<Vec<CookieRecord>, LiveStoreError>;

    /// Register an observer. Dropping the subscription deregisters it.
    fn observe_changes(&self) -> ChangeSubscription;
}

/// Handle on the live store's change stream.
#[derive(Debug)]
pub struct ChangeSubscription {
    receiver: broadcast::Receiver<CookieStoreChange>,
}

impl ChangeSubscription {
    pub fn new(receiver: broadcast::Receiver<CookieStoreChange>) -> Self {
        Self { receiver }
    }

    /// Next change, or `None` once the store is gone.
    pub async fn next(&mut self) -> Option<CookieStoreChange> {
        match self.receiver.recv().await {
            Ok(change) => Some(change),
            Err(RecvError::Lagged(skipped)) => {
                debug!(skipped, "Cookie change observer lagged");
                Some(CookieStoreChange::External)
            }
            Err(RecvError::Closed) => None,
        }
    }
}

/// Handed to the host's web view glue to announce external cookie changes.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<CookieStoreChange>,
}

impl ChangeNotifier {
    pub fn notify(&self) {
        // no observers is fine
        let _ = self.sender.send(CookieStoreChange::External);
    }
}

enum JarCommand {
    ApplyAll {
        cookies: Vec<CookieRecord>,
        reply: oneshot::Sender<ApplyReport>,
    },
    GetAll {
        reply: oneshot::Sender<Vec<CookieRecord>>,
    },
}

/// [`LiveCookieStore`] over a [`CookieJar`] confined to its own thread.
///
/// The thread exits once the adapter is dropped.
pub struct UiCookieStoreAdapter {
    commands: mpsc::UnboundedSender<JarCommand>,
    changes: broadcast::Sender<CookieStoreChange>,
}

impl UiCookieStoreAdapter {
    pub fn spawn<J: CookieJar>(jar: J) -> Result<Self, LiveStoreError> {
        let (commands, receiver) = mpsc::unbounded_channel();
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let notifier = changes.clone();

        thread::Builder::new()
            .name(UI_THREAD_NAME.to_string())
            .spawn(move || run_jar(jar, receiver, notifier))?;

        info!(thread = UI_THREAD_NAME, "Cookie jar context started");
        Ok(Self { commands, changes })
    }

    pub fn change_notifier(&self) -> ChangeNotifier {
        ChangeNotifier {
            sender: self.changes.clone(),
        }
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.changes.receiver_count()
    }

    fn send(&self, command: JarCommand) -> Result<(), LiveStoreError> {
        self.commands.send(command).map_err(|_| LiveStoreError::Closed)
    }
}

#[async_trait]
impl LiveCookieStore for UiCookieStoreAdapter {
    async fn apply_all(&self, cookies: &ReconciledCookieSet) -> Result<ApplyReport, LiveStoreError> {
        let (reply, response) = oneshot::channel();
        self.send(JarCommand::ApplyAll {
            cookies: cookies.as_slice().to_vec(),
            reply,
        })?;
        response.await.map_err(|_| LiveStoreError::Closed)
    }

    async fn get_all(&self) -> Result<Vec<CookieRecord>, LiveStoreError> {
        let (reply, response) = oneshot::channel();
        self.send(JarCommand::GetAll { reply })?;
        response.await.map_err(|_| LiveStoreError::Closed)
    }

    fn observe_changes(&self) -> ChangeSubscription {
        ChangeSubscription::new(self.changes.subscribe())
    }
}

fn run_jar<J: CookieJar>(
    mut jar: J,
    mut commands: mpsc::UnboundedReceiver<JarCommand>,
    changes: broadcast::Sender<CookieStoreChange>,
) {
    while let Some(command) = commands.blocking_recv() {
        match command {
            JarCommand::ApplyAll { cookies, reply } => {
                let mut report = ApplyReport::default();
                for cookie in &cookies {
                    match jar.set_cookie(cookie) {
                        Ok(()) => report.applied += 1,
                        Err(reason) => {
                            warn!(
                                name = %cookie.name,
                                domain = %cookie.domain,
                                reason = %reason,
                                "Cookie jar rejected cookie"
                            );
                            report.failed.push(FailedWrite {
                                name: cookie.name.clone(),
                                domain: cookie.domain.clone(),
                                reason,
                            });
                        }
                    }
                }
                debug!(
                    applied = report.applied,
                    failed = report.failed.len(),
                    "Applied cookie batch"
                );
                let _ = changes.send(CookieStoreChange::Applied);
                // caller may have been cancelled; writes stay applied
                let _ = reply.send(report);
            }
            JarCommand::GetAll { reply } => {
                let _ = reply.send(jar.cookies());
            }
        }
    }
    debug!(thread = UI_THREAD_NAME, "Cookie jar context stopped");
}

/// A plain in-memory jar, for hosts without a platform web view and tests.
///
/// Clones share the same cookies, so a host can keep one to simulate
/// server-side changes while the adapter owns the other.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCookieJar {
    cookies: Arc<Mutex<Vec<CookieRecord>>>,
}

impl InMemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<CookieRecord>> {
        self.cookies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert or replace a cookie as if a page load had set it.
    pub fn set_external(&self, cookie: CookieRecord) {
        upsert(&mut self.lock(), cookie);
    }

    pub fn snapshot(&self) -> Vec<CookieRecord> {
        self.lock().clone()
    }
}

impl CookieJar for InMemoryCookieJar {
    fn set_cookie(&mut self, cookie: &CookieRecord) -> Result<(), String> {
        upsert(&mut self.lock(), cookie.clone());
        Ok(())
    }

    fn cookies(&self) -> Vec<CookieRecord> {
        self.snapshot()
    }
}

fn upsert(cookies: &mut Vec<CookieRecord>, cookie: CookieRecord) {
    match cookies.iter_mut().find(|c| c.key() == cookie.key()) {
        Some(existing) => *existing = cookie,
        None => cookies.push(cookie),
    }
}
