//! camsync - Connection, catalog and transfer engine for WiFi cameras.
//!
//! The engine keeps a connection to a camera's HTTP control interface alive,
//! mirrors the camera's file listing into an ordered catalog, and streams
//! selected files to local storage. A presentation layer drives it through
//! [`Bridge`] and observes it through [`SessionEvent`]s.
//!
//! # Example
//!
//! ```no_run
//! use camsync::{Bridge, CameraConfig, SessionEvent};
//! use tokio::sync::broadcast::error::RecvError;
//!
//! # async fn example() -> camsync::Result<()> {
//! let bridge = Bridge::new(CameraConfig::default(), "/tmp/Camera")?;
//! let mut events = bridge.subscribe();
//! let _supervisor = bridge.start();
//!
//! loop {
//!     match events.recv().await {
//!         Ok(SessionEvent::CountChanged(count)) => {
//!             println!("{count} files on the camera");
//!             break;
//!         }
//!         Ok(_) | Err(RecvError::Lagged(_)) => {}
//!         Err(RecvError::Closed) => break,
//!     }
//! }
//!
//! bridge.set_selected("0001JPG", true).await.ok();
//! let summary = bridge.download_selected(false).await.ok();
//! println!("{summary:?}");
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod bridge;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod download;
pub mod error;
pub mod event;
pub mod fs;
pub mod listing;
pub mod profile;
pub mod protocol;
pub mod session;
pub mod supervisor;
pub mod sync;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(test)]
mod test_support;

/// Crate version, part of the settings file name.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-export main types for convenience
pub use bridge::{Bridge, Snapshot, Thumbnail};
pub use catalog::{Catalog, CatalogEntry, LocalCopy};
pub use commands::CameraCommand;
pub use config::{CameraConfig, Settings};
pub use download::{BatchSummary, DownloadManager, FAILED_TRANSFER};
pub use error::{Error, Result};
pub use event::{EventBus, SessionEvent};
pub use fs::{FileSystem, PathKind, TokioFileSystem};
pub use profile::{DeviceProfile, FixedSliceProfile};
pub use protocol::CameraClient;
pub use session::{Session, SessionState};
pub use supervisor::{ConnectionState, ConnectionSupervisor};
pub use sync::{CatalogSynchronizer, SyncOutcome};
