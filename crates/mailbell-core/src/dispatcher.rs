//! Fan-out of engine events to notifications and the account list.
//!
//! Engine callbacks can fire on any thread. They only push into an
//! [`EventSink`]; a single worker task drains the queue in arrival order and
//! runs the reactions.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::account::AccountId;
use crate::engine::{EngineError, EngineEvent};
use crate::error::{Error, Result};
use crate::notification::{NotificationContent, NotificationRegistry, Notifier};
use crate::publisher::AccountListPublisher;
use crate::unread::UnreadCounter;

enum Envelope {
    Event(EngineEvent),
    Flush(oneshot::Sender<()>),
}

/// Cloneable handle the engine pushes its events into.
///
/// Sending never blocks, so it is safe to call from platform callback threads.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Receiving end of the event channel, consumed by [`EventDispatcher::spawn`].
pub struct EventQueue {
    rx: mpsc::UnboundedReceiver<Envelope>,
}

/// Create a connected sink/queue pair.
#[must_use]
pub fn event_channel() -> (EventSink, EventQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSink { tx }, EventQueue { rx })
}

impl EventSink {
    /// Queue an event for the worker.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerClosed`] if the worker has stopped.
    pub fn send(&self, event: EngineEvent) -> Result<()> {
        self.tx
            .send(Envelope::Event(event))
            .map_err(|_| Error::WorkerClosed)
    }

    /// New messages arrived for `account`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerClosed`] if the worker has stopped.
    pub fn new_mail(&self, account: impl Into<AccountId>, backend: &str, count: u64) -> Result<()> {
        self.send(EngineEvent::NewMail {
            account: account.into(),
            backend: backend.to_string(),
            count,
        })
    }

    /// Polling `account` failed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerClosed`] if the worker has stopped.
    pub fn account_error(&self, account: impl Into<AccountId>, error: EngineError) -> Result<()> {
        self.send(EngineEvent::AccountError {
            account: account.into(),
            error,
        })
    }

    /// Wait until every event sent before this call has been handled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerClosed`] if the worker has stopped.
    pub async fn flush(&self) -> Result<()> {
        let (done, wait) = oneshot::channel();
        self.tx
            .send(Envelope::Flush(done))
            .map_err(|_| Error::WorkerClosed)?;
        wait.await.map_err(|_| Error::WorkerClosed)
    }

    /// Whether the worker has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Reactions to engine events.
pub struct EventDispatcher {
    registry: Arc<NotificationRegistry>,
    unread: Arc<UnreadCounter>,
    notifier: Arc<dyn Notifier>,
    publisher: Arc<AccountListPublisher>,
}

impl EventDispatcher {
    /// Create a dispatcher over shared state.
    #[must_use]
    pub fn new(
        registry: Arc<NotificationRegistry>,
        unread: Arc<UnreadCounter>,
        notifier: Arc<dyn Notifier>,
        publisher: Arc<AccountListPublisher>,
    ) -> Self {
        Self {
            registry,
            unread,
            notifier,
            publisher,
        }
    }

    /// Start the worker that drains `queue`.
    ///
    /// The worker ends when every [`EventSink`] is dropped or the returned
    /// handle is aborted.
    #[must_use]
    pub fn spawn(self, mut queue: EventQueue) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(envelope) = queue.rx.recv().await {
                match envelope {
                    Envelope::Event(event) => self.handle(event).await,
                    Envelope::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            debug!("Event worker stopped");
        })
    }

    /// React to a single event.
    pub async fn handle(&self, event: EngineEvent) {
        debug!(account = %event.account(), "Handling engine event: {:?}", event);
        match event {
            EngineEvent::NewMail {
                account,
                backend,
                count,
            } => self.on_new_mail(&account, &backend, count),
            EngineEvent::AccountLoggedOut(account) => {
                self.publisher.refresh().await;
                let ids = self.registry.get_or_create(&account);
                info!(%account, "Account logged out");
                self.notifier
                    .show(ids.status_update, &NotificationContent::logged_out(&account));
            }
            EngineEvent::AccountRemoved(account) => {
                self.unread.clear(&account);
                info!(%account, "Account removed");
                self.publisher.refresh().await;
            }
            EngineEvent::AccountAdded(account)
            | EngineEvent::AccountOffline(account)
            | EngineEvent::AccountOnline(account) => {
                debug!(%account, "Account state changed");
                self.publisher.refresh().await;
            }
            EngineEvent::AccountError { account, error } => {
                warn!(%account, "Account error: {error}");
                let ids = self.registry.get_or_create(&account);
                self.notifier
                    .show(ids.errors, &NotificationContent::account_error(&account, &error));
            }
        }
    }

    fn on_new_mail(&self, account: &AccountId, backend: &str, count: u64) {
        if count == 0 {
            debug!(%account, "Ignoring empty new mail event");
            return;
        }

        let ids = self.registry.get_or_create(account);
        let visible = self.notifier.is_visible(ids.new_messages);
        let total = self.unread.record(account, count, visible);
        info!(%account, backend, count, total, "New mail");
        self.notifier
            .show(ids.new_messages, &NotificationContent::new_mail(account, total));
    }
}
