//! Camera connection configuration and persisted application settings.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default address of the camera on its own access point.
pub const DEFAULT_CAMERA_HOST: &str = "192.168.0.10";

/// Folder the camera stores its pictures in.
pub const DEFAULT_REMOTE_FOLDER: &str = "/DCIM/100OLYMP";

/// Environment variable overriding the settings directory.
pub const CONFIG_DIR_ENV: &str = "CAMSYNC_CONFIG_DIR";

/// Configuration for talking to the camera.
#[derive(Debug, Clone)]
pub struct CameraConfig {
    /// Host (and optional port) of the camera's HTTP server.
    pub host: String,
    /// Timeout applied to the identity probe only.
    pub probe_timeout: Duration,
    /// Interval between two connection probes.
    pub poll_interval: Duration,
    /// Remote folder synchronized into the catalog.
    pub remote_folder: String,
    /// Long edge, in pixels, requested for reduced-size downloads.
    pub resize_edge: u32,
    /// Whether to remove a half-written file when a transfer fails.
    pub cleanup_on_error: bool,
    /// Delay between a power command and the follow-up connection probe.
    pub reconnect_delay: Duration,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_CAMERA_HOST.to_string(),
            probe_timeout: Duration::from_secs(2),
            poll_interval: Duration::from_secs(5),
            remote_folder: DEFAULT_REMOTE_FOLDER.to_string(),
            resize_edge: 2048,
            cleanup_on_error: false,
            reconnect_delay: Duration::from_millis(100),
        }
    }
}

impl CameraConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the camera host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the identity probe timeout.
    #[must_use]
    pub const fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Sets the connection poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the remote folder to synchronize.
    #[must_use]
    pub fn with_remote_folder(mut self, folder: impl Into<String>) -> Self {
        self.remote_folder = folder.into();
        self
    }

    /// Sets the long edge requested for reduced-size downloads.
    #[must_use]
    pub const fn with_resize_edge(mut self, edge: u32) -> Self {
        self.resize_edge = edge;
        self
    }

    /// Sets whether to remove half-written files on transfer failure.
    #[must_use]
    pub const fn with_cleanup_on_error(mut self, cleanup: bool) -> Self {
        self.cleanup_on_error = cleanup;
        self
    }

    /// Sets the delay before re-probing after a power command.
    #[must_use]
    pub const fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }
}

/// Settings persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Root directory downloads are written under.
    pub download_path: PathBuf,
    /// When the application last shut down.
    pub last_run: DateTime<Utc>,
}

impl Default for Settings {
    fn default() -> Self {
        let base = dirs::picture_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            download_path: base.join("Camera"),
            last_run: Utc::now(),
        }
    }
}

impl Settings {
    /// Returns the directory settings files live in.
    ///
    /// Uses `CAMSYNC_CONFIG_DIR` when set, falling back to
    /// `$XDG_CONFIG_HOME/camsync`.
    #[must_use]
    pub fn config_dir() -> PathBuf {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            PathBuf::from(dir)
        } else {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("camsync")
        }
    }

    /// Returns the settings file path for this crate version.
    #[must_use]
    pub fn default_path() -> PathBuf {
        Self::config_dir().join(format!("settings_{}.json", crate::VERSION))
    }

    /// Loads settings from `path`, falling back to defaults when the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        log::info!("Loaded settings from {}", path.display());
        Ok(serde_json::from_str(&data)?)
    }

    /// Stamps `last_run` and writes the settings to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file cannot be written.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        self.last_run = Utc::now();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
