//! Host settings that persist across sessions.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{HostError, HostResult};

/// Directory name under the platform config directory.
const CONFIG_DIR_NAME: &str = "mailbell";

/// Settings file name.
const SETTINGS_FILE: &str = "settings.json";

/// Settings of the desktop host.
///
/// Missing fields fall back to their defaults, so older files keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    /// Application name shown on notifications.
    pub app_name: String,
    /// Keyring service name the engine config is stored under.
    pub keyring_service: String,
    /// Log filter used when `RUST_LOG` is not set.
    pub log_filter: String,
    /// How long alerts stay on screen, in milliseconds.
    pub notification_timeout_ms: u32,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            app_name: "You Have Mail".to_string(),
            keyring_service: "mailbell".to_string(),
            log_filter: "mailbell=info,mailbell_core=info".to_string(),
            notification_timeout_ms: 10_000,
        }
    }
}

impl HostSettings {
    /// Default location of the settings file.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::NoConfigDir`] if the platform has no config directory.
    pub fn default_path() -> HostResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME).join(SETTINGS_FILE))
            .ok_or(HostError::NoConfigDir)
    }

    /// Load settings from the default location, falling back to defaults on
    /// any error.
    #[must_use]
    pub fn load() -> Self {
        match Self::default_path().and_then(|path| Self::load_from(&path)) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Failed to load settings, using defaults: {e}");
                Self::default()
            }
        }
    }

    /// Load settings from `path`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> HostResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write settings to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to(&self, path: &Path) -> HostResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        debug!("Saved settings to {}", path.display());
        Ok(())
    }

    /// How long an alert is considered on screen.
    #[must_use]
    pub fn alert_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.notification_timeout_ms))
    }
}
