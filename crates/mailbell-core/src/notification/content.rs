//! Notification content and the texts the service produces.

use crate::account::AccountId;
use crate::engine::EngineError;

/// Title used for every service notification.
const APP_TITLE: &str = "You Have Mail";

/// Delivery channel, mapped by the platform to an importance level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Quiet, ongoing service status.
    Service,
    /// Alerts the user should see: new mail, expired sessions, errors.
    Alerter,
}

/// What happens when the user interacts with a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationAction {
    /// Nothing.
    #[default]
    None,
    /// Bring the application to the front.
    OpenApp,
    /// Dismiss the notification.
    Dismiss,
}

/// A notification ready to be rendered by a [`Notifier`](super::Notifier).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationContent {
    /// Title line.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Channel to post on.
    pub channel: Channel,
    /// Action on click.
    pub on_click: NotificationAction,
    /// Action on dismiss.
    pub on_dismiss: NotificationAction,
    /// Whether the user can swipe it away.
    pub ongoing: bool,
}

impl NotificationContent {
    /// Alert announcing `total` unread messages for `account`.
    #[must_use]
    pub fn new_mail(account: &AccountId, total: u64) -> Self {
        Self::alert(APP_TITLE, format!("{account} has {total} new message(s)"))
    }

    /// Alert telling the user the session of `account` expired.
    #[must_use]
    pub fn logged_out(account: &AccountId) -> Self {
        Self::alert(
            format!("{APP_TITLE}: Session expired"),
            format!("Account {account} has been logged out, please log in again"),
        )
    }

    /// Alert reporting a polling error for `account`.
    #[must_use]
    pub fn account_error(account: &AccountId, error: &EngineError) -> Self {
        Self::alert(
            format!("{APP_TITLE}: Error"),
            format!("Account {account} encountered an error: {error}"),
        )
    }

    /// Ongoing status shown while polling runs.
    #[must_use]
    pub fn service_running() -> Self {
        Self::status("Running")
    }

    /// Ongoing status shown while polling is paused for lack of network.
    #[must_use]
    pub fn service_paused() -> Self {
        Self::status("Paused: no network connection")
    }

    /// One-shot alert raised when polling could not be resumed.
    #[must_use]
    pub fn resume_failed(error: &EngineError) -> Self {
        Self::alert(
            format!("{APP_TITLE}: Service error"),
            format!("Failed to resume polling, please restart the service ({error})"),
        )
    }

    fn alert(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            channel: Channel::Alerter,
            on_click: NotificationAction::OpenApp,
            on_dismiss: NotificationAction::Dismiss,
            ongoing: false,
        }
    }

    fn status(body: &str) -> Self {
        Self {
            title: format!("{APP_TITLE} Service"),
            body: body.to_string(),
            channel: Channel::Service,
            on_click: NotificationAction::OpenApp,
            on_dismiss: NotificationAction::None,
            ongoing: true,
        }
    }
}
