//! # mailbell-core
//!
//! Coordination core of the `mailbell` mail notification service.
//!
//! The actual mail polling lives in an external engine reached through the
//! [`Engine`] trait. This crate provides:
//! - Per-account unread counts that merge into a visible notification or
//!   start over once it was dismissed
//! - Stable notification slots per account
//! - An event worker that turns engine callbacks into notifications and
//!   account list refreshes
//! - An observable account list with single-flight refreshes
//! - Pausing and resuming the engine on connectivity changes
//! - Best-effort persistence of the engine configuration
//! - The [`ObserverService`] context tying it together, including the
//!   login flow

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod account;
pub mod dispatcher;
pub mod engine;
mod error;
pub mod network;
pub mod notification;
pub mod publisher;
pub mod service;
pub mod storage;
pub mod unread;

#[cfg(test)]
mod testing;

pub use account::{AccountId, AccountStatus, BackendInfo, ObservedAccount};
pub use dispatcher::{EventDispatcher, EventQueue, EventSink, event_channel};
pub use engine::{Engine, EngineError, EngineErrorKind, EngineEvent, EngineResult, PendingAccount};
pub use error::{Error, Result};
pub use network::NetworkGate;
pub use notification::{
    Channel, FIRST_ACCOUNT_SLOT, NotificationAction, NotificationContent, NotificationIds,
    NotificationRegistry, Notifier, SERVICE_ERROR_SLOT, SERVICE_SLOT, StatusLine,
};
pub use publisher::{AccountListPublisher, AccountSnapshot};
pub use service::{DEFAULT_POLL_INTERVAL, LoginStep, ObserverService, ServiceState};
pub use storage::{CONFIG_KEY, ConfigStore, MemoryStore, SecureStore, StorageError, StorageResult};
pub use unread::UnreadCounter;
