//! Error types for the core library.

use thiserror::Error;

use crate::engine::EngineError;
use crate::storage::StorageError;

/// Errors that can occur in core operations.
///
/// Background reactions (event handling, list refreshes, network gating,
/// config persistence) log and absorb failures. Only explicit user actions
/// such as logging in or changing the poll interval return these.
#[derive(Debug, Error)]
pub enum Error {
    /// A call into the mail engine failed.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Protected storage read or write failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A login step was requested without a login in progress.
    #[error("No login in progress")]
    NoPendingLogin,

    /// The event worker is no longer running.
    #[error("Event worker has shut down")]
    WorkerClosed,
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
