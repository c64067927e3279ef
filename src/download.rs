//! Selection and transfer of catalog entries to local storage.

use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::catalog::CatalogEntry;
use crate::config::CameraConfig;
use crate::error::{Error, Result};
use crate::event::SessionEvent;
use crate::fs::{FileSystem, PathKind, TokioFileSystem};
use crate::protocol::{CameraClient, RequestKind};
use crate::session::Session;

/// Byte count reported by [`DownloadManager::download_one`] when a transfer fails.
pub const FAILED_TRANSFER: i64 = -1;

/// Endpoint serving server-side resized images.
pub const RESIZE_ENDPOINT: &str = "get_resizeimg";

/// Outcome of a batch download.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Number of entries that were selected when the batch started.
    pub attempted: usize,
    /// Entries written completely.
    pub succeeded: usize,
    /// Entries whose transfer failed.
    pub failed: usize,
    /// Total bytes written by successful transfers.
    pub bytes: u64,
}

/// Owns the selection and download lifecycle flags of catalog entries.
pub struct DownloadManager<F: FileSystem = TokioFileSystem> {
    client: CameraClient,
    session: Session,
    fs: F,
    resize_edge: u32,
    cleanup_on_error: bool,
}

impl DownloadManager<TokioFileSystem> {
    /// Creates a download manager writing through `tokio::fs`.
    #[must_use]
    pub fn new(client: CameraClient, session: Session, config: &CameraConfig) -> Self {
        Self::with_fs(client, session, config, TokioFileSystem)
    }
}

impl<F: FileSystem> DownloadManager<F> {
    /// Creates a download manager with a custom file system implementation.
    #[must_use]
    pub fn with_fs(client: CameraClient, session: Session, config: &CameraConfig, fs: F) -> Self {
        Self {
            client,
            session,
            fs,
            resize_edge: config.resize_edge,
            cleanup_on_error: config.cleanup_on_error,
        }
    }

    /// Sets the selection flag of one entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEntry`] if no entry carries `id`.
    pub async fn set_selected(&self, id: &str, value: bool) -> Result<()> {
        self.session.update_entry(id, |e| e.selected = value).await?;
        Ok(())
    }

    /// Deselects every entry that is not being transferred.
    ///
    /// Returns the number of entries deselected.
    pub async fn clear_selection(&self) -> usize {
        self.session
            .update_entries(|e| e.selected && !e.downloading, |e| e.selected = false)
            .await
            .len()
    }

    /// Downloads one entry, returning the bytes written or [`FAILED_TRANSFER`].
    pub async fn download_one(&self, id: &str, reduced: bool) -> i64 {
        match self.try_download_one(id, reduced).await {
            Ok(bytes) => i64::try_from(bytes).unwrap_or(i64::MAX),
            Err(e) => {
                log::error!("Download of {id} failed: {e}");
                FAILED_TRANSFER
            }
        }
    }

    /// Downloads one entry, full size or resized by the camera.
    ///
    /// On success the entry ends up downloaded and deselected, flagged
    /// `partial` for reduced copies. On failure it ends up neither downloading
    /// nor downloaded, with its selection untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry is unknown, the transfer fails or the
    /// file cannot be written.
    pub async fn try_download_one(&self, id: &str, reduced: bool) -> Result<u64> {
        let entry = self.session.update_entry(id, |e| e.downloading = true).await?;
        let model = self.session.model().await;

        let result = self.transfer(&entry, &model, reduced).await;
        let settled = match &result {
            Ok(bytes) => {
                log::info!("Downloaded {} ({bytes} bytes)", entry.file_name);
                self.session
                    .update_entry(id, |e| {
                        e.downloaded = true;
                        e.downloading = false;
                        e.selected = false;
                        e.partial = reduced;
                    })
                    .await
            }
            Err(_) => {
                self.session
                    .update_entry(id, |e| {
                        e.downloaded = false;
                        e.downloading = false;
                    })
                    .await
            }
        };
        if let Err(e) = settled {
            log::warn!("Could not record download state of {id}: {e}");
        }
        result
    }

    /// Downloads every selected entry one at a time, in catalog order.
    ///
    /// All selected entries are flagged `downloading` before the first byte
    /// moves. Individual failures are logged and counted; the session-level
    /// downloading flag is cleared once the batch is over.
    pub async fn download_selected(&self, reduced: bool) -> BatchSummary {
        self.session.set_downloading(true).await;
        let ids = self
            .session
            .update_entries(|e| e.selected, |e| e.downloading = true)
            .await;

        let mut summary = BatchSummary {
            attempted: ids.len(),
            ..BatchSummary::default()
        };
        for id in &ids {
            match self.try_download_one(id, reduced).await {
                Ok(bytes) => {
                    summary.succeeded += 1;
                    summary.bytes += bytes;
                }
                Err(e) => {
                    summary.failed += 1;
                    log::error!("Download of {id} failed: {e}");
                }
            }
        }

        self.session.set_downloading(false).await;
        log::info!(
            "Batch finished: {} of {} downloaded, {} failed",
            summary.succeeded,
            summary.attempted,
            summary.failed
        );
        summary
    }

    /// Fetches the entry and writes it to `<root>/<model>/<file name>`.
    async fn transfer(&self, entry: &CatalogEntry, model: &str, reduced: bool) -> Result<u64> {
        let dir = self.session.download_root().join(model);
        match self.fs.probe(&dir).await {
            PathKind::Directory => {}
            PathKind::Missing => self.fs.create_dir_all(&dir).await?,
            PathKind::File(_) => {
                return Err(Error::NotADirectory {
                    path: dir.display().to_string(),
                });
            }
        }

        let camera_path = entry.camera_path();
        let response = if reduced {
            let dir_param = format!("DIR={camera_path}");
            let size_param = format!("size={}", self.resize_edge);
            self.client
                .query(RESIZE_ENDPOINT, &[&dir_param, &size_param], RequestKind::Command)
                .await?
        } else {
            self.client
                .query(camera_path.trim_start_matches('/'), &[], RequestKind::File)
                .await?
        };

        let path = dir.join(&entry.file_name);
        let mut file = self.fs.create_file(&path).await?;
        match self.stream_to(&entry.id, response, &mut file).await {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                drop(file);
                if self.cleanup_on_error {
                    let _ = self.fs.remove_file(&path).await;
                }
                Err(e)
            }
        }
    }

    /// Streams the response body into `file`, reporting progress per chunk.
    async fn stream_to(
        &self,
        id: &str,
        response: reqwest::Response,
        file: &mut tokio::fs::File,
    ) -> Result<u64> {
        let mut body = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            self.session.notify(SessionEvent::TransferProgress {
                id: id.to_string(),
                bytes: written,
            });
        }
        file.flush().await?;
        Ok(written)
    }
}
