//! Per-account notification slot allocation.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use super::FIRST_ACCOUNT_SLOT;
use crate::account::AccountId;

/// Slots used for one account's notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotificationIds {
    /// New mail alert.
    pub new_messages: u32,
    /// Session status (logged out).
    pub status_update: u32,
    /// Polling errors.
    pub errors: u32,
}

impl NotificationIds {
    /// All three slots.
    #[must_use]
    pub const fn slots(&self) -> [u32; 3] {
        [self.new_messages, self.status_update, self.errors]
    }
}

#[derive(Debug)]
struct Inner {
    next: u32,
    ids: HashMap<AccountId, NotificationIds>,
}

/// Hands out a stable [`NotificationIds`] triple per account.
///
/// Entries live for the lifetime of the registry, including for accounts
/// that have since been removed.
#[derive(Debug)]
pub struct NotificationRegistry {
    inner: Mutex<Inner>,
}

impl Default for NotificationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationRegistry {
    /// Create an empty registry starting at [`FIRST_ACCOUNT_SLOT`].
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(FIRST_ACCOUNT_SLOT)
    }

    /// Create an empty registry whose first allocation starts at `first_slot`.
    #[must_use]
    pub fn starting_at(first_slot: u32) -> Self {
        Self {
            inner: Mutex::new(Inner {
                next: first_slot,
                ids: HashMap::new(),
            }),
        }
    }

    /// Slots for `account`, allocating three consecutive ones on first use.
    pub fn get_or_create(&self, account: &AccountId) -> NotificationIds {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(ids) = inner.ids.get(account) {
            return *ids;
        }

        let base = inner.next;
        let ids = NotificationIds {
            new_messages: base,
            status_update: base.wrapping_add(1),
            errors: base.wrapping_add(2),
        };
        inner.next = base.wrapping_add(3);
        inner.ids.insert(account.clone(), ids);
        debug!(%account, base, "Allocated notification slots");
        ids
    }

    /// Slots for `account` if any were allocated.
    #[must_use]
    pub fn get(&self, account: &AccountId) -> Option<NotificationIds> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .ids
            .get(account)
            .copied()
    }

    /// Number of accounts with allocated slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).ids.len()
    }

    /// Whether no slots have been allocated yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
