use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use super::{NotificationContent, Notifier, SERVICE_SLOT};

#[derive(Debug, Default)]
struct StatusState {
    shown: bool,
    paused: bool,
}

/// Sole owner of the ongoing status notification in [`SERVICE_SLOT`].
///
/// The text follows the polling state, but the notification only exists
/// between [`StatusLine::show`] and [`StatusLine::hide`]. A polling change
/// while hidden is remembered and rendered on the next `show`.
pub struct StatusLine {
    notifier: Arc<dyn Notifier>,
    state: Mutex<StatusState>,
}

impl std::fmt::Debug for StatusLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusLine")
            .field("state", &*self.state.lock().unwrap_or_else(PoisonError::into_inner))
            .finish_non_exhaustive()
    }
}

impl StatusLine {
    /// Create a hidden status line for a running poller.
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            state: Mutex::new(StatusState::default()),
        }
    }

    /// Put the status notification on screen.
    pub fn show(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.shown = true;
        self.render(&state);
    }

    /// Take the status notification off screen.
    pub fn hide(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.shown = false;
        self.notifier.cancel(SERVICE_SLOT);
    }

    /// Record whether polling is paused, updating the notification if shown.
    pub fn set_paused(&self, paused: bool) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.paused = paused;
        if state.shown {
            self.render(&state);
        } else {
            debug!(paused, "Status hidden, not rendering");
        }
    }

    /// Whether the status notification is meant to be on screen.
    #[must_use]
    pub fn is_shown(&self) -> bool {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).shown
    }

    // Rendering under the lock keeps show/hide/set_paused ordered on screen.
    fn render(&self, state: &StatusState) {
        let content = if state.paused {
            NotificationContent::service_paused()
        } else {
            NotificationContent::service_running()
        };
        self.notifier.show(SERVICE_SLOT, &content);
    }
}
