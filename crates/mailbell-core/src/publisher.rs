//! Observable snapshot of the engine's account list.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info};

use crate::account::ObservedAccount;
use crate::engine::{Engine, run_blocking};
use crate::storage::ConfigStore;

/// Shared, immutable account list snapshot.
pub type AccountSnapshot = Arc<Vec<ObservedAccount>>;

/// Publishes the latest account list to any number of observers.
///
/// Refreshes are single-flight: at most one engine query runs at a time. A
/// caller that arrives while a refresh is running waits for it, then returns
/// as soon as a refresh that started after its own call has completed. Bursts
/// of requests therefore collapse into at most one extra query, and a result
/// fetched before a request was made is never the last word for it.
pub struct AccountListPublisher {
    engine: Arc<dyn Engine>,
    config: ConfigStore,
    snapshot: watch::Sender<AccountSnapshot>,
    in_flight: Mutex<()>,
    /// Number of refreshes that have started.
    started: AtomicU64,
    /// Sequence number of the last refresh that finished.
    completed: AtomicU64,
}

impl std::fmt::Debug for AccountListPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountListPublisher")
            .field("accounts", &self.snapshot.borrow().len())
            .field("started", &self.started.load(Ordering::Relaxed))
            .field("completed", &self.completed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl AccountListPublisher {
    /// Create a publisher with an empty snapshot.
    #[must_use]
    pub fn new(engine: Arc<dyn Engine>, config: ConfigStore) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            engine,
            config,
            snapshot,
            in_flight: Mutex::new(()),
            started: AtomicU64::new(0),
            completed: AtomicU64::new(0),
        }
    }

    /// Latest published account list.
    #[must_use]
    pub fn snapshot(&self) -> AccountSnapshot {
        Arc::clone(&self.snapshot.borrow())
    }

    /// Receiver notified whenever a new snapshot is published.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AccountSnapshot> {
        self.snapshot.subscribe()
    }

    /// Query the engine and publish its account list.
    ///
    /// On success the snapshot is replaced and the engine config persisted.
    /// On failure the previous snapshot stays and the error is only logged.
    pub async fn refresh(&self) {
        let requested_after = self.started.load(Ordering::Acquire);
        let _guard = self.in_flight.lock().await;

        if self.completed.load(Ordering::Acquire) > requested_after {
            debug!("Account refresh satisfied by a concurrent refresh");
            return;
        }

        let run = self.started.fetch_add(1, Ordering::AcqRel) + 1;
        match run_blocking(&self.engine, |engine| engine.observed_accounts()).await {
            Ok(accounts) => {
                info!(count = accounts.len(), "Account list refreshed");
                self.snapshot.send_replace(Arc::new(accounts));
                self.config.save(&self.engine).await;
            }
            Err(e) => error!("Failed to refresh account list: {e}"),
        }
        self.completed.store(run, Ordering::Release);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::account::AccountStatus;
    use crate::storage::{CONFIG_KEY, MemoryStore, SecureStore};
    use crate::testing::FakeEngine;

    fn publisher(engine: &Arc<FakeEngine>) -> (AccountListPublisher, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let engine: Arc<dyn Engine> = engine.clone();
        let publisher = AccountListPublisher::new(engine, ConfigStore::new(store.clone()));
        (publisher, store)
    }

    #[tokio::test]
    async fn test_refresh_publishes_and_persists() {
        let engine = FakeEngine::new();
        engine.add_observed(ObservedAccount::new("a@x.com", "proton", AccountStatus::Online));
        engine.set_config("cfg-1");
        let (publisher, store) = publisher(&engine);
        let mut rx = publisher.subscribe();

        publisher.refresh().await;

        assert!(rx.has_changed().unwrap());
        let accounts = rx.borrow_and_update().clone();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].email.as_str(), "a@x.com");
        assert_eq!(store.get(CONFIG_KEY).unwrap(), Some("cfg-1".to_string()));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let engine = FakeEngine::new();
        engine.add_observed(ObservedAccount::new("a@x.com", "proton", AccountStatus::Online));
        let (publisher, _store) = publisher(&engine);
        publisher.refresh().await;
        let before = publisher.snapshot();

        engine.add_observed(ObservedAccount::new("b@x.com", "proton", AccountStatus::Online));
        engine.fail_accounts(true);
        publisher.refresh().await;

        assert_eq!(publisher.snapshot(), before);
        assert_eq!(publisher.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_is_replaced_wholesale() {
        let engine = FakeEngine::new();
        engine.add_observed(ObservedAccount::new("a@x.com", "proton", AccountStatus::Online));
        let (publisher, _store) = publisher(&engine);
        publisher.refresh().await;

        engine.set_observed(vec![ObservedAccount::new("b@x.com", "imap", AccountStatus::Offline)]);
        publisher.refresh().await;

        let accounts = publisher.snapshot();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].email.as_str(), "b@x.com");
        assert_eq!(accounts[0].status, AccountStatus::Offline);
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_are_coalesced() {
        let engine = FakeEngine::new();
        engine.set_accounts_delay(Duration::from_millis(50));
        let (publisher, _store) = publisher(&engine);

        tokio::join!(
            publisher.refresh(),
            publisher.refresh(),
            publisher.refresh(),
            publisher.refresh(),
            publisher.refresh(),
        );

        // The first call runs, every waiter is served by one follow-up query.
        assert_eq!(engine.accounts_calls(), 2);
    }

    #[tokio::test]
    async fn test_sequential_refreshes_each_query() {
        let engine = FakeEngine::new();
        let (publisher, _store) = publisher(&engine);
        publisher.refresh().await;
        publisher.refresh().await;
        assert_eq!(engine.accounts_calls(), 2);
    }
}
