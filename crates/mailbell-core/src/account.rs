//! Account model types.

use serde::{Deserialize, Serialize};

/// Identifier of an observed account: its email address.
///
/// Used as the join key for unread counts and notification slots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Create an account ID from an email address.
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self(email.into())
    }

    /// The email address this ID refers to.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(email: &str) -> Self {
        Self::new(email)
    }
}

impl From<String> for AccountId {
    fn from(email: String) -> Self {
        Self(email)
    }
}

/// Connection state of an observed account as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AccountStatus {
    /// Session is valid and the account is being polled.
    #[default]
    Online,
    /// Account is unreachable (network or server trouble).
    Offline,
    /// Session expired; the user has to log in again.
    LoggedOut,
}

impl AccountStatus {
    /// Get display name for the status.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Online => "Online",
            Self::Offline => "Offline",
            Self::LoggedOut => "Logged Out",
        }
    }
}

/// Summary of one account the engine is observing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedAccount {
    /// Email address.
    pub email: AccountId,
    /// Name of the backend serving this account.
    pub backend: String,
    /// Current connection state.
    pub status: AccountStatus,
}

impl ObservedAccount {
    /// Create a new account summary.
    #[must_use]
    pub fn new(email: impl Into<AccountId>, backend: impl Into<String>, status: AccountStatus) -> Self {
        Self {
            email: email.into(),
            backend: backend.into(),
            status,
        }
    }

    /// Whether the user has to log in again before this account is polled.
    #[must_use]
    pub const fn needs_login(&self) -> bool {
        matches!(self.status, AccountStatus::LoggedOut)
    }
}

/// A mail provider the engine knows how to talk to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendInfo {
    /// Backend name, used when creating accounts.
    pub name: String,
    /// Human readable description.
    pub description: String,
}
