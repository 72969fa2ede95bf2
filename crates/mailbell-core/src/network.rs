//! Pauses and resumes engine polling on connectivity changes.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::engine::{Engine, run_blocking};
use crate::notification::{NotificationContent, Notifier, SERVICE_ERROR_SLOT, StatusLine};

/// Connectivity gate in front of the engine's poll loop.
///
/// Platforms tend to repeat connectivity callbacks, so a signal for the state
/// the gate is already in is ignored. A failed engine call leaves the state
/// untouched and the next signal tries again.
///
/// The status notification is updated through a shared [`StatusLine`], so a
/// transition while the service is stopped does not bring it back.
pub struct NetworkGate {
    engine: Arc<dyn Engine>,
    notifier: Arc<dyn Notifier>,
    status: Arc<StatusLine>,
    paused: Mutex<bool>,
}

impl std::fmt::Debug for NetworkGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkGate").finish_non_exhaustive()
    }
}

impl NetworkGate {
    /// Create a gate in the running state.
    #[must_use]
    pub fn new(engine: Arc<dyn Engine>, notifier: Arc<dyn Notifier>, status: Arc<StatusLine>) -> Self {
        Self {
            engine,
            notifier,
            status,
            paused: Mutex::new(false),
        }
    }

    /// Whether polling is currently paused by this gate.
    pub async fn is_paused(&self) -> bool {
        *self.paused.lock().await
    }

    /// Connectivity was lost: pause polling.
    pub async fn on_network_lost(&self) {
        let mut paused = self.paused.lock().await;
        if *paused {
            debug!("Network lost while already paused");
            return;
        }

        match run_blocking(&self.engine, |engine| engine.pause()).await {
            Ok(()) => {
                *paused = true;
                info!("Network lost, polling paused");
                self.status.set_paused(true);
            }
            Err(e) => error!("Failed to pause engine: {e}"),
        }
    }

    /// Connectivity is back: resume polling.
    ///
    /// A failed resume leaves the user with a service that no longer polls,
    /// so it is reported with its own notification.
    pub async fn on_network_available(&self) {
        let mut paused = self.paused.lock().await;
        if !*paused {
            debug!("Network available while already running");
            return;
        }

        match run_blocking(&self.engine, |engine| engine.resume()).await {
            Ok(()) => {
                *paused = false;
                info!("Network available, polling resumed");
                self.notifier.cancel(SERVICE_ERROR_SLOT);
                self.status.set_paused(false);
            }
            Err(e) => {
                error!("Failed to resume engine: {e}");
                self.notifier
                    .show(SERVICE_ERROR_SLOT, &NotificationContent::resume_failed(&e));
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::notification::SERVICE_SLOT;
    use crate::testing::{FakeEngine, RecordingNotifier};

    fn gate() -> (NetworkGate, Arc<FakeEngine>, Arc<RecordingNotifier>) {
        let (gate, engine, notifier, status) = gate_with_status();
        status.show();
        (gate, engine, notifier)
    }

    fn gate_with_status() -> (NetworkGate, Arc<FakeEngine>, Arc<RecordingNotifier>, Arc<StatusLine>) {
        let engine = FakeEngine::new();
        let notifier = RecordingNotifier::new();
        let status = Arc::new(StatusLine::new(notifier.clone()));
        let gate = NetworkGate::new(engine.clone(), notifier.clone(), status.clone());
        (gate, engine, notifier, status)
    }

    #[tokio::test]
    async fn test_loss_then_recovery() {
        let (gate, engine, notifier) = gate();

        gate.on_network_lost().await;
        assert!(gate.is_paused().await);
        assert_eq!(notifier.current(SERVICE_SLOT).unwrap().body, "Paused: no network connection");

        gate.on_network_available().await;
        assert!(!gate.is_paused().await);
        assert_eq!(engine.pause_calls(), 1);
        assert_eq!(engine.resume_calls(), 1);
        assert_eq!(notifier.current(SERVICE_SLOT).unwrap().body, "Running");
        assert!(notifier.current(SERVICE_ERROR_SLOT).is_none());
    }

    #[tokio::test]
    async fn test_repeated_signals_are_ignored() {
        let (gate, engine, _notifier) = gate();

        gate.on_network_available().await;
        gate.on_network_lost().await;
        gate.on_network_lost().await;
        gate.on_network_available().await;
        gate.on_network_available().await;

        assert_eq!(engine.pause_calls(), 1);
        assert_eq!(engine.resume_calls(), 1);
    }

    #[tokio::test]
    async fn test_resume_failure_raises_error_notification() {
        let (gate, engine, notifier) = gate();
        gate.on_network_lost().await;

        engine.fail_resume(true);
        gate.on_network_available().await;

        assert!(gate.is_paused().await);
        let error = notifier.current(SERVICE_ERROR_SLOT).unwrap();
        assert!(error.body.contains("restart"));
        assert_eq!(notifier.current(SERVICE_SLOT).unwrap().body, "Paused: no network connection");

        // Next signal retries and clears the error.
        engine.fail_resume(false);
        gate.on_network_available().await;
        assert!(!gate.is_paused().await);
        assert_eq!(engine.resume_calls(), 2);
        assert!(notifier.current(SERVICE_ERROR_SLOT).is_none());
    }

    #[tokio::test]
    async fn test_hidden_status_stays_hidden() {
        let (gate, engine, notifier, status) = gate_with_status();

        gate.on_network_lost().await;
        gate.on_network_available().await;

        assert_eq!(engine.pause_calls(), 1);
        assert_eq!(engine.resume_calls(), 1);
        assert!(!status.is_shown());
        assert!(notifier.current(SERVICE_SLOT).is_none());
    }

    #[tokio::test]
    async fn test_pause_failure_is_silent() {
        let (gate, engine, notifier) = gate();
        engine.fail_pause(true);

        gate.on_network_lost().await;

        assert!(!gate.is_paused().await);
        assert_eq!(notifier.current(SERVICE_SLOT).unwrap().body, "Running");
        assert!(notifier.current(SERVICE_ERROR_SLOT).is_none());
    }
}
