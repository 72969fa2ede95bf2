//! Test doubles for the engine, notifier and storage seams.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use crate::account::{AccountId, AccountStatus, BackendInfo, ObservedAccount};
use crate::dispatcher::EventSink;
use crate::engine::{Engine, EngineError, EngineErrorKind, EngineEvent, EngineResult, PendingAccount};
use crate::notification::{NotificationContent, Notifier};
use crate::storage::{SecureStore, StorageError, StorageResult};

pub const PASSWORD: &str = "hunter2";
pub const TOTP_CODE: &str = "123456";

fn failure(what: &str) -> EngineError {
    EngineError::new(EngineErrorKind::Other, format!("{what} failed"))
}

#[derive(Default)]
struct EngineState {
    accounts: Vec<ObservedAccount>,
    config: String,
    poll_interval: Duration,
    accounts_delay: Duration,
    pause_calls: usize,
    resume_calls: usize,
    accounts_calls: usize,
    fail_pause: bool,
    fail_resume: bool,
    fail_accounts: bool,
    fail_config: bool,
    totp_required: bool,
    pending: Vec<Weak<FakePending>>,
    sink: Option<EventSink>,
}

/// Scriptable in-memory engine that counts calls.
pub struct FakeEngine {
    state: Mutex<EngineState>,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(EngineState {
                config: "{}".to_string(),
                poll_interval: Duration::from_secs(900),
                ..EngineState::default()
            }),
        })
    }

    fn with<T>(&self, f: impl FnOnce(&mut EngineState) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }

    pub fn attach_sink(&self, sink: EventSink) {
        self.with(|s| s.sink = Some(sink));
    }

    fn emit(&self, event: EngineEvent) {
        let sink = self.with(|s| s.sink.clone());
        if let Some(sink) = sink {
            let _ = sink.send(event);
        }
    }

    pub fn add_observed(&self, account: ObservedAccount) {
        self.with(|s| s.accounts.push(account));
    }

    pub fn set_observed(&self, accounts: Vec<ObservedAccount>) {
        self.with(|s| s.accounts = accounts);
    }

    pub fn set_config(&self, config: &str) {
        self.with(|s| s.config = config.to_string());
    }

    pub fn set_accounts_delay(&self, delay: Duration) {
        self.with(|s| s.accounts_delay = delay);
    }

    pub fn require_totp(&self, required: bool) {
        self.with(|s| s.totp_required = required);
    }

    pub fn fail_pause(&self, fail: bool) {
        self.with(|s| s.fail_pause = fail);
    }

    pub fn fail_resume(&self, fail: bool) {
        self.with(|s| s.fail_resume = fail);
    }

    pub fn fail_accounts(&self, fail: bool) {
        self.with(|s| s.fail_accounts = fail);
    }

    pub fn fail_config(&self, fail: bool) {
        self.with(|s| s.fail_config = fail);
    }

    pub fn pause_calls(&self) -> usize {
        self.with(|s| s.pause_calls)
    }

    pub fn resume_calls(&self) -> usize {
        self.with(|s| s.resume_calls)
    }

    pub fn accounts_calls(&self) -> usize {
        self.with(|s| s.accounts_calls)
    }

    /// Number of pending accounts created by this engine that are still alive.
    pub fn live_pending(&self) -> usize {
        self.with(|s| s.pending.iter().filter(|p| p.strong_count() > 0).count())
    }
}

impl Engine for FakeEngine {
    fn pause(&self) -> EngineResult<()> {
        self.with(|s| {
            s.pause_calls += 1;
            if s.fail_pause { Err(failure("pause")) } else { Ok(()) }
        })
    }

    fn resume(&self) -> EngineResult<()> {
        self.with(|s| {
            s.resume_calls += 1;
            if s.fail_resume { Err(failure("resume")) } else { Ok(()) }
        })
    }

    fn observed_accounts(&self) -> EngineResult<Vec<ObservedAccount>> {
        let delay = self.with(|s| {
            s.accounts_calls += 1;
            s.accounts_delay
        });
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        self.with(|s| {
            if s.fail_accounts {
                Err(failure("observed_accounts"))
            } else {
                Ok(s.accounts.clone())
            }
        })
    }

    fn config(&self) -> EngineResult<String> {
        self.with(|s| if s.fail_config { Err(failure("config")) } else { Ok(s.config.clone()) })
    }

    fn poll_interval(&self) -> EngineResult<Duration> {
        self.with(|s| Ok(s.poll_interval))
    }

    fn set_poll_interval(&self, interval: Duration) -> EngineResult<()> {
        if interval.is_zero() {
            return Err(EngineError::new(EngineErrorKind::Config, "poll interval must be positive"));
        }
        self.with(|s| s.poll_interval = interval);
        Ok(())
    }

    fn backends(&self) -> Vec<BackendInfo> {
        vec![BackendInfo {
            name: "fake".to_string(),
            description: "In-memory test backend".to_string(),
        }]
    }

    fn new_account(&self, backend: &str, email: &str) -> EngineResult<Arc<dyn PendingAccount>> {
        if backend != "fake" {
            return Err(EngineError::new(EngineErrorKind::Config, format!("unknown backend {backend}")));
        }
        let totp_required = self.with(|s| s.totp_required);
        let account = Arc::new(FakePending {
            email: AccountId::new(email),
            backend: backend.to_string(),
            totp_required,
            progress: Mutex::new(LoginProgress::Started),
        });
        self.with(|s| s.pending.push(Arc::downgrade(&account)));
        Ok(account)
    }

    fn add_account(&self, account: Arc<dyn PendingAccount>) -> EngineResult<()> {
        if account.is_awaiting_totp() {
            return Err(EngineError::new(EngineErrorKind::Auth, "login not complete"));
        }
        let email = account.email().clone();
        self.with(|s| {
            s.accounts
                .push(ObservedAccount::new(email.clone(), account.backend(), AccountStatus::Online));
        });
        self.emit(EngineEvent::AccountAdded(email));
        Ok(())
    }

    fn logout_account(&self, email: &AccountId) -> EngineResult<()> {
        let found = self.with(|s| {
            s.accounts
                .iter_mut()
                .find(|a| &a.email == email)
                .map(|a| a.status = AccountStatus::LoggedOut)
                .is_some()
        });
        if !found {
            return Err(EngineError::new(EngineErrorKind::Other, format!("unknown account {email}")));
        }
        self.emit(EngineEvent::AccountLoggedOut(email.clone()));
        Ok(())
    }

    fn remove_account(&self, email: &AccountId) -> EngineResult<()> {
        let removed = self.with(|s| {
            let before = s.accounts.len();
            s.accounts.retain(|a| &a.email != email);
            before != s.accounts.len()
        });
        if !removed {
            return Err(EngineError::new(EngineErrorKind::Other, format!("unknown account {email}")));
        }
        self.emit(EngineEvent::AccountRemoved(email.clone()));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoginProgress {
    Started,
    AwaitingTotp,
    LoggedIn,
}

/// Pending account accepting [`PASSWORD`] and [`TOTP_CODE`].
pub struct FakePending {
    email: AccountId,
    backend: String,
    totp_required: bool,
    progress: Mutex<LoginProgress>,
}

impl PendingAccount for FakePending {
    fn email(&self) -> &AccountId {
        &self.email
    }

    fn backend(&self) -> &str {
        &self.backend
    }

    fn login(&self, password: &str) -> EngineResult<()> {
        if password != PASSWORD {
            return Err(EngineError::new(EngineErrorKind::Auth, "invalid password"));
        }
        *self.progress.lock().unwrap() = if self.totp_required {
            LoginProgress::AwaitingTotp
        } else {
            LoginProgress::LoggedIn
        };
        Ok(())
    }

    fn is_awaiting_totp(&self) -> bool {
        *self.progress.lock().unwrap() == LoginProgress::AwaitingTotp
    }

    fn submit_totp(&self, code: &str) -> EngineResult<()> {
        let mut progress = self.progress.lock().unwrap();
        if *progress != LoginProgress::AwaitingTotp || code != TOTP_CODE {
            return Err(EngineError::new(EngineErrorKind::Auth, "invalid code"));
        }
        *progress = LoginProgress::LoggedIn;
        Ok(())
    }
}

#[derive(Default)]
struct NotifierState {
    visible: HashMap<u32, NotificationContent>,
    shown: usize,
}

/// Notifier that keeps what is "on screen" in memory.
#[derive(Default)]
pub struct RecordingNotifier {
    state: Mutex<NotifierState>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Content currently visible in `slot`.
    pub fn current(&self, slot: u32) -> Option<NotificationContent> {
        self.state.lock().unwrap().visible.get(&slot).cloned()
    }

    /// Simulate the user swiping the notification away.
    pub fn dismiss(&self, slot: u32) {
        self.state.lock().unwrap().visible.remove(&slot);
    }

    /// Number of `show` calls so far.
    pub fn shown_count(&self) -> usize {
        self.state.lock().unwrap().shown
    }
}

impl Notifier for RecordingNotifier {
    fn show(&self, slot: u32, content: &NotificationContent) {
        let mut state = self.state.lock().unwrap();
        state.visible.insert(slot, content.clone());
        state.shown += 1;
    }

    fn cancel(&self, slot: u32) {
        self.state.lock().unwrap().visible.remove(&slot);
    }

    fn is_visible(&self, slot: u32) -> bool {
        self.state.lock().unwrap().visible.contains_key(&slot)
    }
}

/// Store whose every operation fails.
pub struct FailingStore;

impl SecureStore for FailingStore {
    fn get(&self, _key: &str) -> StorageResult<Option<String>> {
        Err(StorageError::AccessDenied("locked".to_string()))
    }

    fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
        Err(StorageError::Backend("read-only".to_string()))
    }

    fn delete(&self, _key: &str) -> StorageResult<()> {
        Err(StorageError::Backend("read-only".to_string()))
    }
}
