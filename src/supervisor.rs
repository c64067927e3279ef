//! Connection supervision: periodic identity and mode probes.
//!
//! The supervisor is level-triggered. Every tick re-probes the camera
//! regardless of the current state, except while a batch download is running
//! or a previous probe is still in flight.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::commands::CameraCommand;
use crate::config::CameraConfig;
use crate::error::Result;
use crate::protocol::{CONNECT_MODE_ENDPOINT, CameraClient, IDENTITY_ENDPOINT};
use crate::session::Session;
use crate::sync::CatalogSynchronizer;

/// Element holding the camera model in the identity document.
pub const MODEL_PATH: &str = "/caminfo/model";

/// Element holding the connection mode.
pub const CONNECT_MODE_PATH: &str = "/connectmode";

/// Connection mode reported when the camera is reached through its relay.
pub const OPC_MODE: &str = "OPC";

/// Where the supervisor stands with the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// The last probe found no camera.
    Disconnected = 0,
    /// A probe is in flight.
    Probing = 1,
    /// The last probe returned a model name.
    Connected = 2,
}

impl From<u8> for ConnectionState {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Probing,
            2 => Self::Connected,
            _ => Self::Disconnected,
        }
    }
}

/// Probes the camera on a fixed interval and keeps the session's connection state current.
#[derive(Clone)]
pub struct ConnectionSupervisor {
    client: CameraClient,
    session: Session,
    state: Arc<AtomicU8>,
    poll_interval: Duration,
    probe_timeout: Duration,
    catalog: Option<(Arc<CatalogSynchronizer>, String)>,
}

impl ConnectionSupervisor {
    /// Creates a supervisor polling at the configured interval, starting disconnected.
    #[must_use]
    pub fn new(client: CameraClient, session: Session, config: &CameraConfig) -> Self {
        Self {
            client,
            session,
            state: Arc::new(AtomicU8::new(ConnectionState::Disconnected as u8)),
            poll_interval: config.poll_interval,
            probe_timeout: config.probe_timeout,
            catalog: None,
        }
    }

    /// Synchronizes `folder` through `synchronizer` after every successful probe.
    #[must_use]
    pub fn with_synchronizer(
        mut self,
        synchronizer: Arc<CatalogSynchronizer>,
        folder: impl Into<String>,
    ) -> Self {
        self.catalog = Some((synchronizer, folder.into()));
        self
    }

    /// Returns the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from(self.state.load(Ordering::Acquire))
    }

    /// Moves to `Probing` unless a probe is already in flight.
    fn begin_probe(&self) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current == ConnectionState::Probing as u8 {
                return false;
            }
            match self.state.compare_exchange(
                current,
                ConnectionState::Probing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    async fn probe_model(&self) -> Result<String> {
        self.client.query_scalar(IDENTITY_ENDPOINT, MODEL_PATH).await
    }

    /// Asks whether the camera is reached through its relay.
    ///
    /// Bounded by the probe timeout so an unreachable camera cannot hold the
    /// probe open; `None` means the mode is unknown this cycle.
    async fn probe_mode(&self) -> Option<bool> {
        let query = self
            .client
            .query_scalar(CONNECT_MODE_ENDPOINT, CONNECT_MODE_PATH);
        match tokio::time::timeout(self.probe_timeout, query).await {
            Ok(Ok(mode)) => Some(mode == OPC_MODE),
            Ok(Err(e)) => {
                log::debug!("Connection mode probe failed: {e}");
                None
            }
            Err(_) => {
                log::debug!("Connection mode probe timed out");
                None
            }
        }
    }

    /// Runs one probe cycle.
    ///
    /// Returns the resulting state, or `None` if another probe was in flight.
    pub async fn probe(&self) -> Option<ConnectionState> {
        if !self.begin_probe() {
            log::debug!("Probe already in flight, skipping");
            return None;
        }
        let was_connected = self.session.is_connected().await;

        let (mut model, mode) = tokio::join!(self.probe_model(), self.probe_mode());

        // an unknown mode keeps the flag but never drives relay commands
        let reports_opc = mode == Some(true);
        let opc = match mode {
            Some(opc) => opc,
            None => self.session.is_opc().await,
        };
        if reports_opc {
            self.client.send(&CameraCommand::UseWifi, true).await;
        }
        self.session.set_opc(opc).await;

        if reports_opc && !matches!(&model, Ok(m) if !m.is_empty()) {
            if !was_connected {
                self.client
                    .send(&CameraCommand::SwitchMode("standalone".to_string()), true)
                    .await;
            }
            model = self.probe_model().await;
        }

        let (connected, model) = match model {
            Ok(model) if !model.is_empty() => (true, model),
            Ok(_) => {
                log::debug!("Camera answered without a model name");
                (false, String::new())
            }
            Err(e) => {
                log::debug!("Identity probe failed: {e}");
                (false, String::new())
            }
        };
        if connected != was_connected {
            if connected {
                log::info!("Connected to {model}");
            } else {
                log::info!("Camera disconnected");
            }
        }
        self.session.set_connection(connected, model).await;

        let state = if connected {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        };
        self.state.store(state as u8, Ordering::Release);

        if connected && let Some((synchronizer, folder)) = &self.catalog {
            let synchronizer = Arc::clone(synchronizer);
            let folder = folder.clone();
            tokio::spawn(async move {
                if let Err(e) = synchronizer.sync(&folder).await {
                    log::warn!("Catalog sync of {folder} failed: {e}");
                }
            });
        }

        Some(state)
    }

    /// Handles one timer tick: starts a background probe unless a batch
    /// download is running or a probe is already in flight.
    pub async fn tick(&self) {
        if self.session.is_downloading().await {
            log::debug!("Download in progress, skipping probe");
            return;
        }
        if self.state() == ConnectionState::Probing {
            return;
        }
        let this = self.clone();
        tokio::spawn(async move {
            this.probe().await;
        });
    }

    /// Ticks forever at the configured poll interval, starting immediately.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.tick().await;
        }
    }
}
