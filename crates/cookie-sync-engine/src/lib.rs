//! Session cookie synchronization for hybrid apps.
//!
//! Keeps the embedded web view's cookie jar authenticated for every web
//! surface of an org (main API domain, Lightning, Content, Visualforce):
//!
//! 1. [`resolve_bundles`] maps a [`CredentialView`] onto per-domain bundles.
//! 2. [`Reconciler`] merges them into the user's persisted snapshot,
//!    producing a [`ReconciledCookieSet`] or one typed [`SyncError`].
//! 3. A [`LiveCookieStore`] applies the set as one batch.
//! 4. [`SyncMonitor`] persists live session cookies back to the
//!    [`LocalCookieStore`] whenever the jar changes.
//!
//! [`ScopeInspector`] reports granted scopes that do not cover a domain.
//! [`CookieSyncEngine`] ties one cycle together.

mod config;
mod cookie_set;
mod credentials;
mod engine;
mod error;
mod live_store;
mod monitor;
mod monitor_fsm;
mod reconciler;
mod resolver;
mod scopes;

#[cfg(test)]
mod tests;

pub use config::SyncConfig;
pub use cookie_set::{ReconciledCookieSet, Upsert};
pub use credentials::{CredentialView, TokenFormat};
pub use engine::{CookieSyncEngine, SyncReport};
pub use error::{LiveStoreError, SyncError, SyncResult};
pub use live_store::{
    ApplyReport, ChangeNotifier, ChangeSubscription, CookieJar, CookieStoreChange, FailedWrite,
    InMemoryCookieJar, LiveCookieStore, UiCookieStoreAdapter,
};
pub use monitor::SyncMonitor;
pub use monitor_fsm::MonitorState;
pub use reconciler::{
    Reconciler, Reconciliation, CLIENT_SRC_COOKIE, CSRF_COOKIE, ORG_ID_COOKIE, SID_CLIENT_COOKIE,
};
pub use resolver::{resolve_bundles, DomainBundles, DomainKind, DomainSessionBundle};
pub use scopes::{
    ScopeInspector, ScopeSet, SCOPE_CONTENT, SCOPE_FULL, SCOPE_LIGHTNING, SCOPE_VISUALFORCE,
    SCOPE_WEB,
};

pub use cookie_storage::{
    CookieError, CookieRecord, FileCookieStore, LocalCookieStore, MemoryCookieStore, StorageError,
    StorageResult,
};
