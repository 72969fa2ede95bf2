//! Notification slots, content and the platform notifier seam.
//!
//! A slot is the integer identifier the platform uses to replace or cancel a
//! notification that is already on screen. Slots below
//! [`FIRST_ACCOUNT_SLOT`] are reserved for the service itself; per-account
//! slots come from [`NotificationRegistry`].

mod content;
mod registry;
mod status;

pub use content::{Channel, NotificationAction, NotificationContent};
pub use registry::{NotificationIds, NotificationRegistry};
pub use status::StatusLine;

/// Slot of the ongoing service status notification.
pub const SERVICE_SLOT: u32 = 1;

/// Slot of the one-shot "could not resume" notification.
pub const SERVICE_ERROR_SLOT: u32 = 2;

/// First slot handed out to accounts.
pub const FIRST_ACCOUNT_SLOT: u32 = 5;

/// Platform notification surface.
///
/// Implementations must be callable from any thread.
pub trait Notifier: Send + Sync + 'static {
    /// Show a notification, replacing whatever is currently shown in `slot`.
    fn show(&self, slot: u32, content: &NotificationContent);

    /// Remove the notification in `slot`, if any.
    fn cancel(&self, slot: u32);

    /// Whether a notification in `slot` is still on screen (not dismissed).
    fn is_visible(&self, slot: u32) -> bool;
}
