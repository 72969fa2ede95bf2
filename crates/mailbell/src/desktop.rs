//! Desktop notifications through `notify-rust`.
//!
//! On freedesktop platforms a slot remembers the daemon's notification id,
//! so showing into an occupied slot replaces the notification in place and
//! cancelling closes it. Each alert gets a watcher thread waiting for the
//! daemon's close signal, so a dismissed or expired alert stops counting as
//! visible right away.
//!
//! Other platforms do not report closes. There an alert counts as visible
//! until it is cancelled or its timeout has elapsed. Ongoing status
//! notifications stay visible until cancelled everywhere.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use mailbell_core::{Channel, NotificationContent, Notifier};
use notify_rust::{Notification, Timeout};
use tracing::{debug, warn};

use crate::settings::HostSettings;

#[cfg(all(unix, not(target_os = "macos")))]
mod platform {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use mailbell_core::Channel;
    use notify_rust::{Notification, NotificationHandle, Urgency};
    use tracing::{debug, warn};

    /// A notification the daemon knows about.
    pub struct Posted {
        id: u32,
        notification: Notification,
        /// `None` once the handle went to the close watcher.
        handle: Option<NotificationHandle>,
        watched: bool,
    }

    impl Posted {
        pub const fn watched(&self) -> bool {
            self.watched
        }
    }

    pub fn post(
        notification: &mut Notification,
        channel: Channel,
        previous: Option<Posted>,
        closed: &Arc<AtomicBool>,
        watch: bool,
    ) -> Result<Posted, notify_rust::error::Error> {
        notification.urgency(match channel {
            Channel::Service => Urgency::Low,
            Channel::Alerter => Urgency::Normal,
        });
        let mut watched = false;
        if let Some(previous) = previous {
            // Replacing keeps the id, so an existing watcher still applies.
            notification.id(previous.id);
            watched = previous.watched;
        }

        let handle = notification.show()?;
        let id = handle.id();
        let handle = if watch && !watched {
            let closed = Arc::clone(closed);
            let spawned = std::thread::Builder::new()
                .name(format!("notification-{id}"))
                .spawn(move || {
                    handle.on_close(move || closed.store(true, Ordering::Release));
                });
            match spawned {
                Ok(_) => watched = true,
                Err(e) => warn!(id, "Failed to watch notification: {e}"),
            }
            None
        } else {
            Some(handle)
        };

        Ok(Posted {
            id,
            notification: notification.clone(),
            handle,
            watched,
        })
    }

    pub fn withdraw(posted: Posted) {
        let handle = match posted.handle {
            Some(handle) => Ok(handle),
            None => {
                // Re-posting under the same id is the only way back to a
                // handle once the watcher owns the original.
                let mut notification = posted.notification;
                notification.id(posted.id);
                notification.show()
            }
        };
        match handle {
            Ok(handle) => {
                debug!(id = posted.id, "Closing notification");
                handle.close();
            }
            Err(e) => warn!(id = posted.id, "Failed to close notification: {e}"),
        }
    }
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
mod platform {
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    use mailbell_core::Channel;
    use notify_rust::Notification;

    pub struct Posted;

    impl Posted {
        pub const fn watched(&self) -> bool {
            false
        }
    }

    pub fn post(
        notification: &mut Notification,
        _channel: Channel,
        _previous: Option<Posted>,
        _closed: &Arc<AtomicBool>,
        _watch: bool,
    ) -> Result<Posted, notify_rust::error::Error> {
        notification.show().map(|_| Posted)
    }

    pub fn withdraw(_posted: Posted) {}
}

struct Shown {
    shown_at: Instant,
    ongoing: bool,
    closed: Arc<AtomicBool>,
    posted: platform::Posted,
}

/// Whether a shown notification is still on screen.
///
/// A watched notification is trusted to report its own close; an unwatched
/// alert is assumed gone once `timeout` has passed.
fn on_screen(closed: &AtomicBool, ongoing: bool, watched: bool, shown_at: Instant, timeout: Duration) -> bool {
    if closed.load(Ordering::Acquire) {
        return false;
    }
    ongoing || watched || shown_at.elapsed() < timeout
}

/// [`Notifier`] posting to the desktop notification daemon.
pub struct DesktopNotifier {
    app_name: String,
    alert_timeout: Duration,
    shown: Mutex<HashMap<u32, Shown>>,
}

impl std::fmt::Debug for DesktopNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesktopNotifier")
            .field("app_name", &self.app_name)
            .field("alert_timeout", &self.alert_timeout)
            .finish_non_exhaustive()
    }
}

impl DesktopNotifier {
    /// Create a notifier using the host settings.
    #[must_use]
    pub fn new(settings: &HostSettings) -> Self {
        Self {
            app_name: settings.app_name.clone(),
            alert_timeout: settings.alert_timeout(),
            shown: Mutex::new(HashMap::new()),
        }
    }

    fn timeout_for(&self, content: &NotificationContent) -> Timeout {
        if content.ongoing {
            Timeout::Never
        } else {
            Timeout::Milliseconds(u32::try_from(self.alert_timeout.as_millis()).unwrap_or(u32::MAX))
        }
    }
}

impl Notifier for DesktopNotifier {
    fn show(&self, slot: u32, content: &NotificationContent) {
        let mut shown = self.shown.lock().unwrap_or_else(PoisonError::into_inner);

        // A closed notification is gone from the daemon; post a fresh one.
        let (previous, closed) = match shown.remove(&slot) {
            Some(previous) if !previous.closed.load(Ordering::Acquire) => {
                (Some(previous.posted), previous.closed)
            }
            _ => (None, Arc::new(AtomicBool::new(false))),
        };

        let mut notification = Notification::new();
        notification
            .appname(&self.app_name)
            .summary(&content.title)
            .body(&content.body)
            .timeout(self.timeout_for(content));

        let watch = content.channel == Channel::Alerter && !content.ongoing;
        match platform::post(&mut notification, content.channel, previous, &closed, watch) {
            Ok(posted) => {
                debug!(slot, watched = posted.watched(), "Notification shown");
                shown.insert(
                    slot,
                    Shown {
                        shown_at: Instant::now(),
                        ongoing: content.ongoing,
                        closed,
                        posted,
                    },
                );
            }
            Err(e) => warn!(slot, "Failed to show notification: {e}"),
        }
    }

    fn cancel(&self, slot: u32) {
        let removed = self
            .shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&slot);
        if let Some(previous) = removed {
            if previous.closed.load(Ordering::Acquire) {
                debug!(slot, "Notification already closed");
            } else {
                debug!(slot, "Notification cancelled");
                platform::withdraw(previous.posted);
            }
        }
    }

    fn is_visible(&self, slot: u32) -> bool {
        self.shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&slot)
            .is_some_and(|shown| {
                on_screen(
                    &shown.closed,
                    shown.ongoing,
                    shown.posted.watched(),
                    shown.shown_at,
                    self.alert_timeout,
                )
            })
    }
}
