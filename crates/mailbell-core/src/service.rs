//! The observer service: one explicitly owned context tying the engine to
//! notifications, storage and the account list.
//!
//! The host creates it once, passes it to whatever needs it, and destroys it
//! when the platform stops the service.

use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::account::{AccountId, BackendInfo};
use crate::dispatcher::{EventDispatcher, EventSink, event_channel};
use crate::engine::{Engine, EngineResult, PendingAccount, run_blocking};
use crate::error::{Error, Result};
use crate::network::NetworkGate;
use crate::notification::{NotificationRegistry, Notifier, StatusLine};
use crate::publisher::{AccountListPublisher, AccountSnapshot};
use crate::storage::{ConfigStore, SecureStore};
use crate::unread::UnreadCounter;

/// Poll interval assumed until the engine reports its own.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Whether the foreground service is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceState {
    /// Service is running in the foreground.
    Started,
    /// Service is not running.
    #[default]
    Stopped,
}

/// Where a login stands after the password step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStep {
    /// The backend wants a TOTP code, see [`ObserverService::submit_totp`].
    AwaitingTotp,
    /// Credentials accepted, call [`ObserverService::finish_login`].
    Ready,
}

/// Process-wide service context.
pub struct ObserverService {
    engine: Arc<dyn Engine>,
    status: Arc<StatusLine>,
    config: ConfigStore,
    registry: Arc<NotificationRegistry>,
    unread: Arc<UnreadCounter>,
    publisher: Arc<AccountListPublisher>,
    gate: NetworkGate,
    sink: EventSink,
    worker: StdMutex<Option<JoinHandle<()>>>,
    state: watch::Sender<ServiceState>,
    poll_interval: watch::Sender<Duration>,
    pending: Mutex<Option<Arc<dyn PendingAccount>>>,
}

impl std::fmt::Debug for ObserverService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverService")
            .field("state", &*self.state.borrow())
            .field("poll_interval", &*self.poll_interval.borrow())
            .field("publisher", &self.publisher)
            .finish_non_exhaustive()
    }
}

impl ObserverService {
    /// Create the service.
    ///
    /// Loads the saved engine config, builds the engine with `make_engine`
    /// (which receives the sink to push events into and the saved config, if
    /// any), shows the status notification, starts the event worker and
    /// publishes the first account list.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine could not be created.
    pub async fn create<F>(
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn SecureStore>,
        make_engine: F,
    ) -> Result<Self>
    where
        F: FnOnce(EventSink, Option<String>) -> EngineResult<Arc<dyn Engine>>,
    {
        let config = ConfigStore::new(store);
        let saved = config.load().await;
        let (sink, queue) = event_channel();
        let engine = make_engine(sink.clone(), saved)?;

        let status = Arc::new(StatusLine::new(Arc::clone(&notifier)));
        status.show();

        let registry = Arc::new(NotificationRegistry::new());
        let unread = Arc::new(UnreadCounter::new());
        let publisher = Arc::new(AccountListPublisher::new(Arc::clone(&engine), config.clone()));
        let worker = EventDispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&unread),
            Arc::clone(&notifier),
            Arc::clone(&publisher),
        )
        .spawn(queue);
        let gate = NetworkGate::new(Arc::clone(&engine), notifier, Arc::clone(&status));

        let interval = run_blocking(&engine, |engine| engine.poll_interval())
            .await
            .unwrap_or_else(|e| {
                warn!("Failed to read poll interval, assuming default: {e}");
                DEFAULT_POLL_INTERVAL
            });
        let (state, _) = watch::channel(ServiceState::Stopped);
        let (poll_interval, _) = watch::channel(interval);

        let service = Self {
            engine,
            status,
            config,
            registry,
            unread,
            publisher,
            gate,
            sink,
            worker: StdMutex::new(Some(worker)),
            state,
            poll_interval,
            pending: Mutex::new(None),
        };
        service.publisher.refresh().await;
        info!("Service has been created");
        Ok(service)
    }

    /// Mark the service as started. Returns `false` if it already was.
    pub fn start(&self) -> bool {
        let changed = self.state.send_if_modified(|state| {
            if *state == ServiceState::Started {
                return false;
            }
            *state = ServiceState::Started;
            true
        });
        if changed {
            info!("Starting foreground service");
            self.status.show();
        } else {
            debug!("Service already started");
        }
        changed
    }

    /// Mark the service as stopped and remove its status notification.
    /// Returns `false` if it already was stopped.
    pub fn stop(&self) -> bool {
        let changed = self.state.send_if_modified(|state| {
            if *state == ServiceState::Stopped {
                return false;
            }
            *state = ServiceState::Stopped;
            true
        });
        if changed {
            info!("Stopping foreground service");
            self.status.hide();
        }
        changed
    }

    /// Current service state.
    #[must_use]
    pub fn state(&self) -> ServiceState {
        *self.state.borrow()
    }

    /// Receiver notified on service state changes.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<ServiceState> {
        self.state.subscribe()
    }

    /// Handle to push engine events into.
    #[must_use]
    pub fn event_sink(&self) -> EventSink {
        self.sink.clone()
    }

    /// Receiver for the published account list.
    #[must_use]
    pub fn accounts(&self) -> watch::Receiver<AccountSnapshot> {
        self.publisher.subscribe()
    }

    /// Latest published account list.
    #[must_use]
    pub fn account_snapshot(&self) -> AccountSnapshot {
        self.publisher.snapshot()
    }

    /// Re-query the engine and publish its account list.
    pub async fn refresh_accounts(&self) {
        self.publisher.refresh().await;
    }

    /// Unread total currently shown for `account`.
    #[must_use]
    pub fn unread_count(&self, account: &AccountId) -> u64 {
        self.unread.get(account)
    }

    /// Notification slots of `account`, if it has produced any notification.
    #[must_use]
    pub fn notification_ids(&self, account: &AccountId) -> Option<crate::NotificationIds> {
        self.registry.get(account)
    }

    /// Backends accounts can be created for.
    pub async fn backends(&self) -> Vec<BackendInfo> {
        run_blocking(&self.engine, |engine| Ok(engine.backends()))
            .await
            .unwrap_or_else(|e| {
                warn!("Failed to list backends: {e}");
                Vec::new()
            })
    }

    /// Last known poll interval.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        *self.poll_interval.borrow()
    }

    /// Receiver notified when the poll interval changes.
    #[must_use]
    pub fn subscribe_poll_interval(&self) -> watch::Receiver<Duration> {
        self.poll_interval.subscribe()
    }

    /// Change the engine's poll interval and persist the config.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the interval.
    pub async fn set_poll_interval(&self, interval: Duration) -> Result<()> {
        run_blocking(&self.engine, move |engine| engine.set_poll_interval(interval)).await?;
        self.poll_interval.send_replace(interval);
        info!(secs = interval.as_secs(), "Poll interval updated");
        self.config.save(&self.engine).await;
        Ok(())
    }

    /// Connectivity was lost.
    pub async fn network_lost(&self) {
        self.gate.on_network_lost().await;
    }

    /// Connectivity came back.
    pub async fn network_available(&self) {
        self.gate.on_network_available().await;
    }

    /// Start logging in to `email` on `backend`.
    ///
    /// Any login already in progress is abandoned and its account released.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot create the account.
    pub async fn begin_login(&self, backend: &str, email: &str) -> Result<()> {
        let (backend, email) = (backend.to_string(), email.to_string());
        let account = run_blocking(&self.engine, move |engine| engine.new_account(&backend, &email)).await?;
        info!(account = %account.email(), "Login started");

        let previous = self.pending.lock().await.replace(account);
        if let Some(previous) = previous {
            debug!(account = %previous.email(), "Released superseded login");
        }
        Ok(())
    }

    /// Email of the login in progress.
    pub async fn pending_login(&self) -> Option<AccountId> {
        self.pending.lock().await.as_ref().map(|a| a.email().clone())
    }

    async fn pending_account(&self) -> Result<Arc<dyn PendingAccount>> {
        self.pending.lock().await.clone().ok_or(Error::NoPendingLogin)
    }

    /// Submit the password for the login in progress.
    ///
    /// A rejected password keeps the login open so it can be retried.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoPendingLogin`] without a login in progress, or the
    /// engine error if the password is rejected.
    pub async fn login(&self, password: &str) -> Result<LoginStep> {
        let account = self.pending_account().await?;
        let password = password.to_string();
        let awaiting_totp = run_blocking(&account, move |account| {
            account.login(&password)?;
            Ok(account.is_awaiting_totp())
        })
        .await?;

        if awaiting_totp {
            info!(account = %account.email(), "Login awaiting TOTP");
            Ok(LoginStep::AwaitingTotp)
        } else {
            Ok(LoginStep::Ready)
        }
    }

    /// Submit a TOTP code for the login in progress.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoPendingLogin`] without a login in progress, or the
    /// engine error if the code is rejected.
    pub async fn submit_totp(&self, code: &str) -> Result<()> {
        let account = self.pending_account().await?;
        let code = code.to_string();
        run_blocking(&account, move |account| account.submit_totp(&code)).await?;
        Ok(())
    }

    /// Hand the logged in account to the engine and release the login.
    ///
    /// The login is released whether or not the engine accepts the account.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoPendingLogin`] without a login in progress, or the
    /// engine error if the account could not be added.
    pub async fn finish_login(&self) -> Result<AccountId> {
        let account = self.pending.lock().await.take().ok_or(Error::NoPendingLogin)?;
        let email = account.email().clone();
        run_blocking(&self.engine, move |engine| engine.add_account(account)).await?;
        info!(account = %email, "Account added");
        self.publisher.refresh().await;
        Ok(email)
    }

    /// Abandon the login in progress. Returns `false` if there was none.
    pub async fn cancel_login(&self) -> bool {
        let released = self.pending.lock().await.take();
        if let Some(account) = &released {
            debug!(account = %account.email(), "Login cancelled");
        }
        released.is_some()
    }

    /// End the session of `email`.
    ///
    /// # Errors
    ///
    /// Returns the engine error if logout failed.
    pub async fn logout_account(&self, email: &AccountId) -> Result<()> {
        let target = email.clone();
        run_blocking(&self.engine, move |engine| engine.logout_account(&target)).await?;
        info!(account = %email, "Account logged out by user");
        self.publisher.refresh().await;
        Ok(())
    }

    /// Stop observing `email`.
    ///
    /// # Errors
    ///
    /// Returns the engine error if the account could not be removed.
    pub async fn remove_account(&self, email: &AccountId) -> Result<()> {
        let target = email.clone();
        run_blocking(&self.engine, move |engine| engine.remove_account(&target)).await?;
        info!(account = %email, "Account removed by user");
        self.publisher.refresh().await;
        Ok(())
    }

    /// Tear the service down: drain and stop the worker, release any pending
    /// login, persist the engine config and remove the status notification.
    pub async fn destroy(self) {
        if let Err(e) = self.sink.flush().await {
            debug!("Event worker already gone: {e}");
        }
        self.abort_worker();
        if self.cancel_login().await {
            debug!("Released pending login on shutdown");
        }
        self.config.save(&self.engine).await;
        self.stop();
        self.status.hide();
        info!("The service has been destroyed");
    }

    fn abort_worker(&self) {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            worker.abort();
        }
    }
}

impl Drop for ObserverService {
    fn drop(&mut self) {
        self.abort_worker();
    }
}
