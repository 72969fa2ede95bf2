//! Unread mail counts per account.
//!
//! The count tracks mail that arrived since the user last saw the account's
//! new-mail notification, not a lifetime total. When the notification is
//! still on screen new arrivals are merged into it. Once it has been
//! dismissed the next arrival starts a fresh count.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::account::AccountId;

/// Shared unread counts, guarded by one lock.
#[derive(Debug, Default)]
pub struct UnreadCounter {
    totals: Mutex<HashMap<AccountId, u64>>,
}

impl UnreadCounter {
    /// Create an empty counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `delta` new messages for `account` and return the total to display.
    ///
    /// With `notification_visible` the delta is added to the current total,
    /// otherwise the total is reset to `delta`. The whole read-modify-write
    /// runs under the lock.
    pub fn record(&self, account: &AccountId, delta: u64, notification_visible: bool) -> u64 {
        let mut totals = self.totals.lock().unwrap_or_else(PoisonError::into_inner);
        let total = totals.entry(account.clone()).or_insert(0);
        *total = if notification_visible {
            total.saturating_add(delta)
        } else {
            delta
        };
        *total
    }

    /// Current total for `account` (zero when unknown).
    #[must_use]
    pub fn get(&self, account: &AccountId) -> u64 {
        self.totals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(account)
            .copied()
            .unwrap_or(0)
    }

    /// Forget the total for `account`.
    pub fn clear(&self, account: &AccountId) {
        self.totals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(account);
    }
}
