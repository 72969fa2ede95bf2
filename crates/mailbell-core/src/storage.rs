//! Protected key-value storage and engine config persistence.
//!
//! The engine configuration is an opaque string owned by the engine. It is
//! kept in a single slot, [`CONFIG_KEY`], of a [`SecureStore`]. Persistence
//! is best-effort: a lost config means starting fresh, never a crash.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, error, info};

use crate::engine::Engine;

/// Slot under which the engine configuration is stored.
pub const CONFIG_KEY: &str = "CONFIG";

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The storage backend failed.
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// The backend refused access (locked keyring, missing permission).
    #[error("Storage access denied: {0}")]
    AccessDenied(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Protected storage for small string values.
pub trait SecureStore: Send + Sync + 'static {
    /// Read `key`, returning `None` when nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn delete(&self, key: &str) -> StorageResult<()>;
}

/// In-process [`SecureStore`]; contents are lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecureStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// Saves and loads the engine configuration blob.
#[derive(Clone)]
pub struct ConfigStore {
    store: Arc<dyn SecureStore>,
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore").finish_non_exhaustive()
    }
}

impl ConfigStore {
    /// Create a config store backed by `store`.
    #[must_use]
    pub fn new(store: Arc<dyn SecureStore>) -> Self {
        Self { store }
    }

    /// Previously saved configuration, or `None` on first run or read failure.
    pub async fn load(&self) -> Option<String> {
        let store = Arc::clone(&self.store);
        match tokio::task::spawn_blocking(move || store.get(CONFIG_KEY)).await {
            Ok(Ok(Some(config))) => {
                debug!("Loaded engine config ({} bytes)", config.len());
                Some(config)
            }
            Ok(Ok(None)) => {
                info!("No saved engine config, starting fresh");
                None
            }
            Ok(Err(e)) => {
                error!("Failed to load engine config: {e}");
                None
            }
            Err(e) => {
                error!("Config load task failed: {e}");
                None
            }
        }
    }

    /// Serialize the engine configuration and store it.
    ///
    /// Failures are logged and otherwise ignored.
    pub async fn save(&self, engine: &Arc<dyn Engine>) {
        let store = Arc::clone(&self.store);
        let engine = Arc::clone(engine);
        let result = tokio::task::spawn_blocking(move || -> crate::Result<usize> {
            let config = engine.config()?;
            store.set(CONFIG_KEY, &config)?;
            Ok(config.len())
        })
        .await;

        match result {
            Ok(Ok(len)) => debug!("Saved engine config ({len} bytes)"),
            Ok(Err(e)) => error!("Failed to save engine config: {e}"),
            Err(e) => error!("Config save task failed: {e}"),
        }
    }

    /// Delete the stored configuration.
    pub async fn clear(&self) {
        let store = Arc::clone(&self.store);
        match tokio::task::spawn_blocking(move || store.delete(CONFIG_KEY)).await {
            Ok(Ok(())) => info!("Cleared engine config"),
            Ok(Err(e)) => error!("Failed to clear engine config: {e}"),
            Err(e) => error!("Config clear task failed: {e}"),
        }
    }
}
