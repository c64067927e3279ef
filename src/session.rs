//! Shared session state and the catalog, behind one coordinating lock.
//!
//! Every write goes through a [`Session`] method which emits the matching
//! [`SessionEvent`] while the lock is held, so subscribers observe writes in
//! the order they happened. The catalog synchronizer is the only caller of
//! [`Session::replace_catalog`]; the download manager is the only caller of
//! the per-entry update methods.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, broadcast};

use crate::catalog::{Catalog, CatalogEntry};
use crate::error::{Error, Result};
use crate::event::{EventBus, SessionEvent};

/// Connection and activity state shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Camera model, empty when unknown.
    pub model: String,
    pub connected: bool,
    /// A batch download is in progress.
    pub downloading: bool,
    /// The camera is reached through its access-point relay mode.
    pub opc: bool,
    /// Number of catalog entries.
    pub file_count: usize,
}

#[derive(Debug, Default)]
struct Shared {
    state: SessionState,
    catalog: Catalog,
}

/// Cloneable handle to the state shared by all background tasks.
#[derive(Debug, Clone)]
pub struct Session {
    shared: Arc<Mutex<Shared>>,
    events: EventBus,
    download_root: Arc<PathBuf>,
}

impl Session {
    /// Creates an empty, disconnected session downloading under `download_root`.
    #[must_use]
    pub fn new(download_root: impl Into<PathBuf>) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared::default())),
            events: EventBus::new(),
            download_root: Arc::new(download_root.into()),
        }
    }

    /// Subscribes to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Emits an event that does not correspond to a state write.
    pub(crate) fn notify(&self, event: SessionEvent) {
        self.events.emit(event);
    }

    /// Root directory downloads are written under.
    #[must_use]
    pub fn download_root(&self) -> &Path {
        &self.download_root
    }

    /// Snapshot of the session state.
    pub async fn state(&self) -> SessionState {
        self.shared.lock().await.state.clone()
    }

    /// Snapshot of the catalog.
    pub async fn catalog(&self) -> Catalog {
        self.shared.lock().await.catalog.clone()
    }

    /// Camera model, empty when disconnected.
    pub async fn model(&self) -> String {
        self.shared.lock().await.state.model.clone()
    }

    /// Whether the last probe found the camera.
    pub async fn is_connected(&self) -> bool {
        self.shared.lock().await.state.connected
    }

    /// Whether the camera is reached through its relay.
    pub async fn is_opc(&self) -> bool {
        self.shared.lock().await.state.opc
    }

    /// Whether a batch download is running.
    pub async fn is_downloading(&self) -> bool {
        self.shared.lock().await.state.downloading
    }

    /// Identifier of the newest cached entry.
    pub async fn newest_id(&self) -> Option<String> {
        self.shared
            .lock()
            .await
            .catalog
            .newest()
            .map(|e| e.id.clone())
    }

    /// Writes the connected flag and model together.
    pub async fn set_connection(&self, connected: bool, model: String) {
        let mut shared = self.shared.lock().await;
        shared.state.connected = connected;
        shared.state.model.clone_from(&model);
        self.events
            .emit(SessionEvent::ConnectionChanged { connected, model });
    }

    /// Writes the relay flag.
    pub async fn set_opc(&self, opc: bool) {
        let mut shared = self.shared.lock().await;
        shared.state.opc = opc;
        self.events.emit(SessionEvent::OpcChanged(opc));
    }

    /// Writes the batch download flag.
    pub async fn set_downloading(&self, downloading: bool) {
        let mut shared = self.shared.lock().await;
        shared.state.downloading = downloading;
        self.events.emit(SessionEvent::DownloadingChanged(downloading));
    }

    /// Replaces the catalog wholesale and announces every entry and the new count.
    pub async fn replace_catalog(&self, catalog: Catalog) {
        let mut shared = self.shared.lock().await;
        self.events.emit(SessionEvent::CatalogCleared);
        for entry in catalog.entries() {
            self.events.emit(SessionEvent::EntryAnnounced(entry.clone()));
        }
        shared.state.file_count = catalog.len();
        self.events.emit(SessionEvent::CountChanged(catalog.len()));
        shared.catalog = catalog;
    }

    /// Re-announces every cached entry without changing anything.
    pub async fn announce_catalog(&self) {
        let shared = self.shared.lock().await;
        for entry in shared.catalog.entries() {
            self.events.emit(SessionEvent::EntryAnnounced(entry.clone()));
        }
    }

    /// Applies `update` to the entry with the given identifier and announces it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEntry`] if no entry carries `id`.
    pub async fn update_entry<F>(&self, id: &str, update: F) -> Result<CatalogEntry>
    where
        F: FnOnce(&mut CatalogEntry),
    {
        let mut shared = self.shared.lock().await;
        let entry = shared
            .catalog
            .get_mut(id)
            .ok_or_else(|| Error::UnknownEntry(id.to_string()))?;
        update(entry);
        let entry = entry.clone();
        self.events.emit(SessionEvent::EntryUpdated(entry.clone()));
        Ok(entry)
    }

    /// Applies `update` to every entry for which `filter` holds, announcing each.
    ///
    /// Returns the identifiers touched, in catalog order.
    pub async fn update_entries<P, F>(&self, filter: P, mut update: F) -> Vec<String>
    where
        P: Fn(&CatalogEntry) -> bool,
        F: FnMut(&mut CatalogEntry),
    {
        let mut shared = self.shared.lock().await;
        let mut touched = Vec::new();
        for entry in shared.catalog.iter_mut().filter(|e| filter(e)) {
            update(entry);
            touched.push(entry.id.clone());
            self.events.emit(SessionEvent::EntryUpdated(entry.clone()));
        }
        touched
    }
}
