//! Error types for the host layer.

use thiserror::Error;

/// Errors that can occur while setting up or driving the host.
#[derive(Debug, Error)]
pub enum HostError {
    /// Settings file could not be parsed or written.
    #[error("Settings error: {0}")]
    Settings(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Core service error.
    #[error(transparent)]
    Core(#[from] mailbell_core::Error),

    /// No per-user configuration directory on this platform.
    #[error("No configuration directory available")]
    NoConfigDir,

    /// Unknown service action.
    #[error("Unknown action: {0}")]
    UnknownAction(String),
}

/// Result type alias using our Error type.
pub type HostResult<T> = std::result::Result<T, HostError>;
