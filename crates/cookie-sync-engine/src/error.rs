//! Synchronization error types.

use cookie_storage::CookieError;
use thiserror::Error;

/// Typed failure of one synchronization cycle.
///
/// Any of these aborts the cycle before anything reaches the live cookie
/// store. Best-effort domains never produce them; their problems surface as
/// warnings on the successful result instead.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The main domain has no usable session identifier.
    #[error("Missing session id cookie for the main domain")]
    MissingMainSidCookie,

    /// Lightning was configured but its session cookie could not be built.
    #[error("Missing session id cookie for the Lightning domain")]
    MissingLightningSidCookie,

    #[error("Missing session id cookie for the Content domain")]
    MissingContentSidCookie,

    #[error("Missing session id cookie for the Visualforce domain")]
    MissingVfSidCookie,

    /// The instance URL does not yield a usable host.
    #[error("Invalid API domain")]
    InvalidApiDomain,

    #[error("Session client marker is missing")]
    InvalidSidClient,

    #[error("Client source marker is missing")]
    InvalidClientSrc,

    #[error("Failed to make sid_Client cookie: {0}")]
    FailedToMakeSidClientCookie(#[source] CookieError),

    #[error("Failed to make clientSrc cookie: {0}")]
    FailedToMakeClientSrcCookie(#[source] CookieError),

    /// Org id missing or not representable as a cookie.
    #[error("Failed to make oid cookie: {0}")]
    FailedToMakeOidCookie(String),

    /// The live cookie store could not be reached.
    #[error("Live cookie store error: {0}")]
    LiveStore(#[from] LiveStoreError),
}

/// Failure talking to the UI context that owns the web view cookie jar.
#[derive(Error, Debug)]
pub enum LiveStoreError {
    /// The UI context is gone; nothing was written.
    #[error("Cookie jar context is closed")]
    Closed,

    /// The UI context thread could not be started.
    #[error("Failed to start cookie jar context: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Result type alias using SyncError.
pub type SyncResult<T> = Result<T, SyncError>;
