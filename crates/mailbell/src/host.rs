//! Desktop host: owns the service for the lifetime of the process and maps
//! host lifecycle signals onto it.

use std::str::FromStr;
use std::sync::Arc;

use mailbell_core::{Engine, EngineResult, EventSink, Notifier, ObserverService, SecureStore};
use tracing::{error, info};

use crate::desktop::DesktopNotifier;
use crate::error::{HostError, HostResult};
use crate::keystore::KeyringStore;
use crate::settings::HostSettings;

/// Lifecycle command sent to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostAction {
    /// Put the service in the foreground.
    Start,
    /// Take the service out of the foreground.
    Stop,
}

impl FromStr for HostAction {
    type Err = HostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "START" => Ok(Self::Start),
            "STOP" => Ok(Self::Stop),
            _ => Err(HostError::UnknownAction(s.to_string())),
        }
    }
}

/// The running host.
///
/// The host does not watch connectivity itself. Whatever source the platform
/// offers (`NetworkManager`, `SCNetworkReachability`, a periodic probe) should
/// report changes through [`ObserverService::network_lost`] and
/// [`ObserverService::network_available`] on [`Host::service`].
#[derive(Debug)]
pub struct Host {
    service: ObserverService,
    settings: HostSettings,
}

impl Host {
    /// Launch with desktop notifications and keyring storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine could not be created.
    pub async fn launch<F>(settings: HostSettings, make_engine: F) -> HostResult<Self>
    where
        F: FnOnce(EventSink, Option<String>) -> EngineResult<Arc<dyn Engine>>,
    {
        let notifier = Arc::new(DesktopNotifier::new(&settings));
        let store = Arc::new(KeyringStore::new(settings.keyring_service.clone()));
        Self::launch_with(settings, notifier, store, make_engine).await
    }

    /// Launch with the given notifier and storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine could not be created.
    pub async fn launch_with<F>(
        settings: HostSettings,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn SecureStore>,
        make_engine: F,
    ) -> HostResult<Self>
    where
        F: FnOnce(EventSink, Option<String>) -> EngineResult<Arc<dyn Engine>>,
    {
        let service = ObserverService::create(notifier, store, make_engine)
            .await
            .inspect_err(|e| error!("Failed to create service: {e}"))?;
        Ok(Self { service, settings })
    }

    /// Apply a lifecycle command given by name. Unknown names are logged and
    /// ignored.
    pub fn handle_action(&self, action: &str) {
        info!("Received action {action}");
        match action.parse::<HostAction>() {
            Ok(action) => self.apply(action),
            Err(e) => error!("{e}"),
        }
    }

    /// Apply a lifecycle command.
    pub fn apply(&self, action: HostAction) {
        match action {
            HostAction::Start => {
                self.service.start();
            }
            HostAction::Stop => {
                self.service.stop();
            }
        }
    }

    /// The hosted service.
    #[must_use]
    pub const fn service(&self) -> &ObserverService {
        &self.service
    }

    /// Settings the host was launched with.
    #[must_use]
    pub const fn settings(&self) -> &HostSettings {
        &self.settings
    }

    /// Start the service, run until Ctrl-C, then shut down.
    ///
    /// # Errors
    ///
    /// Returns an error if the signal handler could not be installed.
    pub async fn run_until_ctrl_c(self) -> HostResult<()> {
        self.apply(HostAction::Start);
        let waited = tokio::signal::ctrl_c().await;
        self.shutdown().await;
        waited.map_err(HostError::from)
    }

    /// Destroy the service.
    pub async fn shutdown(self) {
        self.service.destroy().await;
    }
}
