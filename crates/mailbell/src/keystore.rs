//! Secure storage using the system keyring.
//!
//! Backs the engine config slot with the platform's native credential
//! storage:
//! - Linux: Secret Service (GNOME Keyring, `KWallet`)
//! - macOS: Keychain
//! - Windows: Credential Manager

use keyring::Entry;
use mailbell_core::{SecureStore, StorageError, StorageResult};
use tracing::{debug, warn};

/// [`SecureStore`] keeping each slot as one keyring entry.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    /// Create a store whose entries live under `service`.
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Generates the keyring entry user for a slot.
    fn entry_key(&self, key: &str) -> String {
        format!("{}_{}", self.service, key.to_lowercase())
    }

    fn entry(&self, key: &str) -> StorageResult<Entry> {
        Entry::new(&self.service, &self.entry_key(key)).map_err(map_keyring_error)
    }
}

fn map_keyring_error(error: keyring::Error) -> StorageError {
    match error {
        keyring::Error::NoStorageAccess(e) => StorageError::AccessDenied(e.to_string()),
        other => StorageError::Backend(other.to_string()),
    }
}

impl SecureStore for KeyringStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => {
                debug!("No keyring entry for {key}");
                Ok(None)
            }
            Err(e) => Err(map_keyring_error(e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entry(key)?
            .set_password(value)
            .map_err(map_keyring_error)?;
        debug!("Stored keyring entry for {key}");
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) => {
                debug!("Deleted keyring entry for {key}");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => {
                debug!("No keyring entry to delete for {key}");
                Ok(())
            }
            Err(e) => {
                warn!("Failed to delete keyring entry {key}: {e}");
                Err(map_keyring_error(e))
            }
        }
    }
}
