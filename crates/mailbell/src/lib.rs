//! # mailbell
//!
//! Desktop host for the `mailbell` mail notification service.
//!
//! Wires [`mailbell_core::ObserverService`] to the desktop:
//! - Notifications through the desktop notification daemon
//! - Engine configuration kept in the system keyring
//! - Host settings in the user's config directory
//! - `tracing` based logging

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod desktop;
mod error;
pub mod host;
pub mod keystore;
pub mod logging;
pub mod settings;

pub use desktop::DesktopNotifier;
pub use error::{HostError, HostResult};
pub use host::{Host, HostAction};
pub use keystore::KeyringStore;
pub use logging::init_logging;
pub use settings::HostSettings;
