//! The coordinator a presentation layer talks to.
//!
//! Every operation that touches the network runs as its own Tokio task and
//! hands back the [`JoinHandle`]; callers that only care about the resulting
//! state changes can drop it and listen on [`Bridge::subscribe`] instead.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::catalog::Catalog;
use crate::commands::CameraCommand;
use crate::config::CameraConfig;
use crate::download::{BatchSummary, DownloadManager};
use crate::error::Result;
use crate::event::SessionEvent;
use crate::profile::{DeviceProfile, FixedSliceProfile, LOCATOR_SCHEME};
use crate::protocol::CameraClient;
use crate::session::{Session, SessionState};
use crate::supervisor::ConnectionSupervisor;
use crate::sync::CatalogSynchronizer;

/// Result of an image fetch keyed by locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Thumbnail {
    /// The thumbnail served by the camera.
    Fetched(Bytes),
    /// The configured fallback icon, served when disconnected or on failure.
    Fallback(Bytes),
}

impl Thumbnail {
    /// Returns true if no image could be fetched.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    /// Returns the image bytes, fetched or fallback.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Fetched(bytes) | Self::Fallback(bytes) => bytes,
        }
    }
}

/// Point-in-time copy of everything the presentation layer renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Connection and activity state.
    pub state: SessionState,
    /// Catalog entries, newest first.
    pub catalog: Catalog,
}

/// Owns the session and the background workers acting on it.
pub struct Bridge {
    config: CameraConfig,
    client: CameraClient,
    session: Session,
    supervisor: ConnectionSupervisor,
    synchronizer: Arc<CatalogSynchronizer>,
    downloads: Arc<DownloadManager>,
    fallback_icon: Bytes,
}

impl Bridge {
    /// Creates a bridge for an Olympus camera, downloading under `download_root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: CameraConfig, download_root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_profile(config, download_root, Arc::new(FixedSliceProfile::olympus()))
    }

    /// Creates a bridge using a custom identifier convention.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_profile(
        config: CameraConfig,
        download_root: impl Into<PathBuf>,
        profile: Arc<dyn DeviceProfile>,
    ) -> Result<Self> {
        let client = CameraClient::new(&config)?;
        let session = Session::new(download_root);
        let synchronizer = Arc::new(CatalogSynchronizer::new(
            client.clone(),
            session.clone(),
            profile,
        ));
        let supervisor = ConnectionSupervisor::new(client.clone(), session.clone(), &config)
            .with_synchronizer(Arc::clone(&synchronizer), config.remote_folder.clone());
        let downloads = Arc::new(DownloadManager::new(client.clone(), session.clone(), &config));

        Ok(Self {
            config,
            client,
            session,
            supervisor,
            synchronizer,
            downloads,
            fallback_icon: Bytes::new(),
        })
    }

    /// Sets the icon returned by [`Bridge::thumbnail`] when no image can be fetched.
    #[must_use]
    pub fn with_fallback_icon(mut self, icon: impl Into<Bytes>) -> Self {
        self.fallback_icon = icon.into();
        self
    }

    /// Returns the camera configuration.
    #[must_use]
    pub const fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Returns the shared session.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Subscribes to session change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.session.subscribe()
    }

    /// Copies the current state and catalog.
    pub async fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.session.state().await,
            catalog: self.session.catalog().await,
        }
    }

    /// Starts the periodic connection supervisor.
    #[must_use = "dropping the handle detaches the supervisor"]
    pub fn start(&self) -> JoinHandle<()> {
        log::info!("Supervising camera at {}", self.client.host());
        tokio::spawn(self.supervisor.clone().run())
    }

    /// Probes the camera once, outside the regular schedule.
    pub fn connect(&self) -> JoinHandle<()> {
        let supervisor = self.supervisor.clone();
        tokio::spawn(async move {
            supervisor.probe().await;
        })
    }

    /// Powers the camera on or off, then re-probes after a short delay.
    pub fn switch_power(&self, on: bool) -> JoinHandle<()> {
        let command = if on {
            CameraCommand::PowerOn
        } else {
            CameraCommand::PowerOff
        };
        let delay = self.config.reconnect_delay;
        let client = self.client.clone();
        let session = self.session.clone();
        let supervisor = self.supervisor.clone();
        tokio::spawn(async move {
            client.send(&command, session.is_opc().await).await;
            tokio::time::sleep(delay).await;
            supervisor.probe().await;
        })
    }

    /// Switches the camera to `mode` (`rec`, `play`, `shutter`, `standalone`).
    pub fn switch_mode(&self, mode: impl Into<String>) -> JoinHandle<()> {
        self.command(CameraCommand::SwitchMode(mode.into()))
    }

    /// Presses or releases the shutter.
    pub fn shutter(&self, press: bool) -> JoinHandle<()> {
        self.command(if press {
            CameraCommand::ShutterPress
        } else {
            CameraCommand::ShutterRelease
        })
    }

    /// Half-presses or releases the shutter to focus.
    pub fn half_press(&self, press: bool) -> JoinHandle<()> {
        self.command(if press {
            CameraCommand::FocusPress
        } else {
            CameraCommand::FocusRelease
        })
    }

    fn command(&self, command: CameraCommand) -> JoinHandle<()> {
        let client = self.client.clone();
        let session = self.session.clone();
        tokio::spawn(async move {
            client.send(&command, session.is_opc().await).await;
        })
    }

    /// Synchronizes the configured remote folder.
    pub fn refresh_catalog(&self) -> JoinHandle<()> {
        let synchronizer = Arc::clone(&self.synchronizer);
        let folder = self.config.remote_folder.clone();
        tokio::spawn(async move {
            match synchronizer.sync(&folder).await {
                Ok(outcome) => log::debug!("Sync of {folder}: {outcome:?}"),
                Err(e) => log::warn!("Sync of {folder} failed: {e}"),
            }
        })
    }

    /// Selects or deselects one entry; unknown identifiers are logged.
    pub fn set_selected(&self, id: impl Into<String>, selected: bool) -> JoinHandle<()> {
        let downloads = Arc::clone(&self.downloads);
        let id = id.into();
        tokio::spawn(async move {
            if let Err(e) = downloads.set_selected(&id, selected).await {
                log::warn!("Cannot change selection of {id}: {e}");
            }
        })
    }

    /// Deselects every entry not being transferred; the handle yields the count.
    pub fn clear_selection(&self) -> JoinHandle<usize> {
        let downloads = Arc::clone(&self.downloads);
        tokio::spawn(async move { downloads.clear_selection().await })
    }

    /// Downloads one entry; the handle yields the byte count or `-1`.
    pub fn download_one(&self, id: impl Into<String>, reduced: bool) -> JoinHandle<i64> {
        let downloads = Arc::clone(&self.downloads);
        let id = id.into();
        tokio::spawn(async move { downloads.download_one(&id, reduced).await })
    }

    /// Downloads every selected entry in catalog order.
    pub fn download_selected(&self, reduced: bool) -> JoinHandle<BatchSummary> {
        let downloads = Arc::clone(&self.downloads);
        tokio::spawn(async move { downloads.download_selected(reduced).await })
    }

    /// Fetches the thumbnail for an entry locator such as `camera:///DCIM/100OLYMP/P1010001.JPG`.
    pub async fn thumbnail(&self, locator: &str) -> Thumbnail {
        if !self.session.is_connected().await {
            return Thumbnail::Fallback(self.fallback_icon.clone());
        }
        let Some(camera_path) = locator.strip_prefix(LOCATOR_SCHEME) else {
            log::warn!("Not a camera locator: {locator}");
            return Thumbnail::Fallback(self.fallback_icon.clone());
        };
        match self.client.fetch_thumbnail(camera_path).await {
            Ok(bytes) => Thumbnail::Fetched(bytes),
            Err(e) => {
                log::debug!("Thumbnail of {camera_path} unavailable: {e}");
                Thumbnail::Fallback(self.fallback_icon.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockCamera, Reply, eventually};
    use tempfile::TempDir;

    const LISTING: &str = "VER_100\n\
        /DCIM/100OLYMP,P1010001.JPG,5,0,0,0\n\
        /DCIM/100OLYMP,P1010002.JPG,4,0,0,0\n";

    fn bridge(camera: &MockCamera, root: &std::path::Path) -> Bridge {
        Bridge::new(camera.config(), root)
            .unwrap()
            .with_fallback_icon(&b"icon"[..])
    }

    #[tokio::test]
    async fn connect_then_sync() {
        let dir = TempDir::new().unwrap();
        let camera = MockCamera::start().await;
        camera.set_model("E-M10");
        camera.set_listing(Reply::text(LISTING));
        let bridge = bridge(&camera, dir.path());

        bridge.connect().await.unwrap();
        eventually(|| {
            let session = bridge.session().clone();
            async move { session.state().await.file_count == 2 }
        })
        .await;

        let snapshot = bridge.snapshot().await;
        assert!(snapshot.state.connected);
        assert_eq!(snapshot.state.model, "E-M10");
        assert_eq!(snapshot.catalog.newest().map(|e| e.id.as_str()), Some("0002JPG"));
    }

    #[tokio::test]
    async fn start_supervises_in_background() {
        let dir = TempDir::new().unwrap();
        let camera = MockCamera::start().await;
        camera.set_model("E-M10");
        let bridge = bridge(&camera, dir.path());

        let handle = bridge.start();
        eventually(|| {
            let session = bridge.session().clone();
            async move { session.is_connected().await }
        })
        .await;
        handle.abort();
    }

    #[tokio::test]
    async fn power_on_reprobes() {
        let dir = TempDir::new().unwrap();
        let camera = MockCamera::start().await;
        camera.set_model("E-M10");
        let bridge = bridge(&camera, dir.path());

        bridge.switch_power(true).await.unwrap();

        assert!(camera.saw("/exec_pwon.cgi"));
        let targets = camera.targets();
        let power = targets.iter().position(|t| t == "/exec_pwon.cgi").unwrap();
        let probe = targets.iter().position(|t| t == "/get_caminfo.cgi").unwrap();
        assert!(power < probe);
        assert!(bridge.session().is_connected().await);
    }

    #[tokio::test]
    async fn commands_follow_connection_mode() {
        let dir = TempDir::new().unwrap();
        let camera = MockCamera::start().await;
        let bridge = bridge(&camera, dir.path());

        bridge.switch_mode("shutter").await.unwrap();
        bridge.shutter(true).await.unwrap();
        bridge.half_press(false).await.unwrap();
        assert!(camera.saw("/switch_cammode.cgi?mode=shutter"));
        assert!(camera.saw("/exec_shutter.cgi?com=1st2ndpush"));
        assert!(camera.saw("/exec_shutter.cgi?com=1strelease"));

        bridge.session().set_opc(true).await;
        bridge.switch_mode("shutter").await.unwrap();
        bridge.shutter(false).await.unwrap();
        assert!(camera.saw("/switch_cameramode.cgi?mode=rec"));
        assert!(camera.saw("/exec_takemotion.cgi?com=newstoptake"));
    }

    #[tokio::test]
    async fn thumbnail_falls_back() {
        let dir = TempDir::new().unwrap();
        let camera = MockCamera::start().await;
        camera.set_model("E-M10");
        let bridge = bridge(&camera, dir.path());
        let locator = "camera:///DCIM/100OLYMP/P1010001.JPG";

        // disconnected: no request at all
        let thumb = bridge.thumbnail(locator).await;
        assert_eq!(thumb, Thumbnail::Fallback(Bytes::from_static(b"icon")));
        assert_eq!(camera.count("/get_thumbnail.cgi?DIR=/DCIM/100OLYMP/P1010001.JPG"), 0);

        bridge.connect().await.unwrap();
        // connected but the camera has nothing to serve
        assert!(bridge.thumbnail(locator).await.is_fallback());
        assert!(bridge.thumbnail("file:///tmp/x.jpg").await.is_fallback());

        camera.set_thumbnail(b"thumb".to_vec());
        let thumb = bridge.thumbnail(locator).await;
        assert_eq!(thumb, Thumbnail::Fetched(Bytes::from_static(b"thumb")));
        assert!(camera.saw("/get_thumbnail.cgi?DIR=/DCIM/100OLYMP/P1010001.JPG"));
    }

    #[tokio::test]
    async fn select_and_download() {
        let dir = TempDir::new().unwrap();
        let camera = MockCamera::start().await;
        camera.set_model("E-M10");
        camera.set_listing(Reply::text(LISTING));
        camera.add_file("/DCIM/100OLYMP/P1010002.JPG", Reply::bytes(b"abcd"));
        let bridge = bridge(&camera, dir.path());
        bridge
            .session()
            .set_connection(true, "E-M10".to_string())
            .await;
        bridge.refresh_catalog().await.unwrap();
        assert_eq!(bridge.snapshot().await.catalog.len(), 2);

        bridge.set_selected("0002JPG", true).await.unwrap();
        bridge.set_selected("0001JPG", true).await.unwrap();
        assert_eq!(bridge.clear_selection().await.unwrap(), 2);
        bridge.set_selected("0002JPG", true).await.unwrap();
        // unknown identifiers are logged, not propagated
        bridge.set_selected("9999JPG", true).await.unwrap();

        let summary = bridge.download_selected(false).await.unwrap();
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.bytes, 4);
        assert!(dir.path().join("E-M10/P1010002.JPG").exists());

        assert_eq!(bridge.download_one("0001JPG", false).await.unwrap(), -1);
    }
}
