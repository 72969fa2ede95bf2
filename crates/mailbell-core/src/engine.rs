//! Boundary to the external mail engine.
//!
//! The engine owns polling, protocol handling and sessions. This crate only
//! calls into it through [`Engine`] and receives its callbacks as
//! [`EngineEvent`]s. Engine methods are synchronous and may block on the
//! network, so the core always runs them on the blocking thread pool via
//! `run_blocking`.

use std::sync::Arc;
use std::time::Duration;

use crate::account::{AccountId, BackendInfo, ObservedAccount};

/// Category of an engine failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    /// Network unreachable or request timed out.
    Network,
    /// Credentials were rejected.
    Auth,
    /// Session expired or was revoked.
    Session,
    /// Engine configuration could not be produced or applied.
    Config,
    /// Anything else.
    Other,
}

impl EngineErrorKind {
    /// Get display name for the error kind.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Auth => "authentication",
            Self::Session => "session",
            Self::Config => "config",
            Self::Other => "engine",
        }
    }
}

impl std::fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A failed call into the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} failure: {message}")]
pub struct EngineError {
    /// Failure category.
    pub kind: EngineErrorKind,
    /// Engine supplied description.
    pub message: String,
}

impl EngineError {
    /// Create a new engine error.
    #[must_use]
    pub fn new(kind: EngineErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Result type for engine calls.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// An account that has been created but not yet added to the engine.
///
/// Held by the service for the duration of a login attempt. Dropping the last
/// reference releases it.
pub trait PendingAccount: Send + Sync {
    /// Email address being logged in.
    fn email(&self) -> &AccountId;

    /// Backend the account belongs to.
    fn backend(&self) -> &str;

    /// Authenticate with a password.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the credentials or is unreachable.
    fn login(&self, password: &str) -> EngineResult<()>;

    /// Whether the backend requires a second factor before the login completes.
    fn is_awaiting_totp(&self) -> bool;

    /// Submit a TOTP code.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is rejected.
    fn submit_totp(&self, code: &str) -> EngineResult<()>;
}

/// Calls the core makes into the mail engine.
pub trait Engine: Send + Sync + 'static {
    /// Stop polling until [`Engine::resume`] is called.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine could not pause.
    fn pause(&self) -> EngineResult<()>;

    /// Restart polling.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine could not resume.
    fn resume(&self) -> EngineResult<()>;

    /// Current snapshot of all observed accounts.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine state could not be read.
    fn observed_accounts(&self) -> EngineResult<Vec<ObservedAccount>>;

    /// Serialized engine configuration. The format is private to the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration could not be serialized.
    fn config(&self) -> EngineResult<String>;

    /// Interval between polls.
    ///
    /// # Errors
    ///
    /// Returns an error if the value could not be read.
    fn poll_interval(&self) -> EngineResult<Duration>;

    /// Change the interval between polls.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the value.
    fn set_poll_interval(&self, interval: Duration) -> EngineResult<()>;

    /// Backends accounts can be created for.
    fn backends(&self) -> Vec<BackendInfo>;

    /// Start a login for `email` on `backend`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unknown.
    fn new_account(&self, backend: &str, email: &str) -> EngineResult<Arc<dyn PendingAccount>>;

    /// Add a logged in account to the observed set.
    ///
    /// # Errors
    ///
    /// Returns an error if the account is not logged in or already observed.
    fn add_account(&self, account: Arc<dyn PendingAccount>) -> EngineResult<()>;

    /// End the session of an observed account, keeping it in the list.
    ///
    /// # Errors
    ///
    /// Returns an error if the account is unknown or logout failed.
    fn logout_account(&self, email: &AccountId) -> EngineResult<()>;

    /// Stop observing an account and forget it.
    ///
    /// # Errors
    ///
    /// Returns an error if the account is unknown.
    fn remove_account(&self, email: &AccountId) -> EngineResult<()>;
}

/// Callbacks pushed by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// New messages arrived for an account.
    NewMail {
        /// Account that received mail.
        account: AccountId,
        /// Backend serving the account.
        backend: String,
        /// Number of new messages since the last poll.
        count: u64,
    },
    /// An account was added to the observed set.
    AccountAdded(AccountId),
    /// An account's session expired.
    AccountLoggedOut(AccountId),
    /// An account was removed from the observed set.
    AccountRemoved(AccountId),
    /// An account became unreachable.
    AccountOffline(AccountId),
    /// An account is reachable again.
    AccountOnline(AccountId),
    /// Polling an account failed.
    AccountError {
        /// Account that failed.
        account: AccountId,
        /// What went wrong.
        error: EngineError,
    },
}

impl EngineEvent {
    /// The account this event refers to.
    #[must_use]
    pub const fn account(&self) -> &AccountId {
        match self {
            Self::NewMail { account, .. } | Self::AccountError { account, .. } => account,
            Self::AccountAdded(account)
            | Self::AccountLoggedOut(account)
            | Self::AccountRemoved(account)
            | Self::AccountOffline(account)
            | Self::AccountOnline(account) => account,
        }
    }

    /// Whether the published account list has to be refreshed after this event.
    #[must_use]
    pub const fn changes_account_list(&self) -> bool {
        !matches!(self, Self::NewMail { .. } | Self::AccountError { .. })
    }
}

/// Run a synchronous engine (or pending account) call on the blocking thread pool.
pub(crate) async fn run_blocking<E, T, F>(target: &Arc<E>, call: F) -> EngineResult<T>
where
    E: ?Sized + Send + Sync + 'static,
    T: Send + 'static,
    F: FnOnce(&E) -> EngineResult<T> + Send + 'static,
{
    let target = Arc::clone(target);
    tokio::task::spawn_blocking(move || call(&target))
        .await
        .map_err(|e| EngineError::new(EngineErrorKind::Other, format!("engine call aborted: {e}")))?
}
