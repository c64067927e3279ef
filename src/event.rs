//! Change notifications for the presentation layer.

use tokio::sync::broadcast;

use crate::catalog::CatalogEntry;

/// Number of events a slow subscriber may fall behind before it starts lagging.
const EVENT_CAPACITY: usize = 1024;

/// Events emitted whenever session or catalog state is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The connected flag and camera model were written.
    ConnectionChanged { connected: bool, model: String },
    /// The access-point relay (OPC) flag was written.
    OpcChanged(bool),
    /// The session-level batch download flag was written.
    DownloadingChanged(bool),
    /// The cached catalog was discarded ahead of a rebuild.
    CatalogCleared,
    /// An entry is (re-)announced after a sync.
    EntryAnnounced(CatalogEntry),
    /// Selection or download flags of an entry changed.
    EntryUpdated(CatalogEntry),
    /// Total number of catalog entries.
    CountChanged(usize),
    /// Bytes received so far for the entry being transferred.
    TransferProgress { id: String, bytes: u64 },
}

/// Fan-out of [`SessionEvent`]s to any number of subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    /// Subscribes to all events emitted from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Emits an event; having no subscriber is not an error.
    pub fn emit(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
pub(crate) fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
