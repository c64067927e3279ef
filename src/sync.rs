//! Incremental synchronization of the camera's file listing into the catalog.

use std::collections::HashSet;
use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;

use crate::catalog::{Catalog, CatalogEntry, LocalCopy};
use crate::error::Result;
use crate::fs::{FileSystem, TokioFileSystem};
use crate::listing::{ListingRecord, listing_rows, parse_record};
use crate::profile::DeviceProfile;
use crate::protocol::{CameraClient, RequestKind};
use crate::session::Session;

/// Endpoint returning the folder listing.
pub const LISTING_ENDPOINT: &str = "get_imglist";

/// What a sync did to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The newest remote file matches the cached catalog; entries were re-announced.
    Unchanged(usize),
    /// The catalog was discarded and rebuilt with this many entries.
    Rebuilt(usize),
    /// The camera did not answer with a listing; nothing changed.
    NoListing,
}

/// Builds a catalog entry from a listing record, or `None` if the file name
/// does not follow the device convention.
#[must_use]
pub fn entry_from_record(profile: &dyn DeviceProfile, record: ListingRecord) -> Option<CatalogEntry> {
    let id = profile.identifier(&record.file_name)?;
    Some(CatalogEntry {
        id,
        locator: profile.locator(&record.dir, &record.file_name),
        kind: profile.media_kind(&record.file_name),
        dir: record.dir,
        file_name: record.file_name,
        size: record.size,
        selected: false,
        downloading: false,
        downloaded: false,
        partial: false,
    })
}

fn is_plain_text(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("text/plain"))
}

/// Keeps the session catalog in step with the camera's folder listing.
pub struct CatalogSynchronizer<F: FileSystem = TokioFileSystem> {
    client: CameraClient,
    session: Session,
    profile: Arc<dyn DeviceProfile>,
    fs: F,
}

impl CatalogSynchronizer<TokioFileSystem> {
    #[must_use]
    pub fn new(client: CameraClient, session: Session, profile: Arc<dyn DeviceProfile>) -> Self {
        Self::with_fs(client, session, profile, TokioFileSystem)
    }
}

impl<F: FileSystem> CatalogSynchronizer<F> {
    /// Creates a synchronizer with a custom file system implementation.
    #[must_use]
    pub fn with_fs(
        client: CameraClient,
        session: Session,
        profile: Arc<dyn DeviceProfile>,
        fs: F,
    ) -> Self {
        Self {
            client,
            session,
            profile,
            fs,
        }
    }

    /// Fetches the listing of `remote_dir` and reconciles the catalog with it.
    ///
    /// When the newest remote file carries the identifier of the newest cached
    /// entry the listing is assumed unchanged and the cached entries are only
    /// re-announced. Anything else rebuilds the catalog from scratch.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Network`] if the listing cannot be fetched; the
    /// cached catalog is left untouched.
    pub async fn sync(&self, remote_dir: &str) -> Result<SyncOutcome> {
        let dir = format!("DIR={remote_dir}");
        let response = self
            .client
            .query(LISTING_ENDPOINT, &[&dir], RequestKind::Command)
            .await?;
        if !is_plain_text(&response) {
            log::warn!("Listing of {remote_dir} is not plain text, ignoring");
            return Ok(SyncOutcome::NoListing);
        }
        let body = response.text().await?;
        let Some(rows) = listing_rows(&body) else {
            log::warn!("Listing of {remote_dir} lacks the version marker, ignoring");
            return Ok(SyncOutcome::NoListing);
        };

        if let Some(cached) = self.session.newest_id().await {
            let newest_remote = rows
                .last()
                .and_then(|row| parse_record(row).ok())
                .and_then(|record| self.profile.identifier(&record.file_name));
            if newest_remote.as_deref() == Some(cached.as_str()) {
                self.session.announce_catalog().await;
                let count = self.session.state().await.file_count;
                log::debug!("Listing of {remote_dir} unchanged ({count} entries)");
                return Ok(SyncOutcome::Unchanged(count));
            }
            log::info!("Listing of {remote_dir} changed, rebuilding catalog");
        }

        let catalog = self.build(&rows).await;
        let count = catalog.len();
        self.session.replace_catalog(catalog).await;
        log::info!("Catalog rebuilt with {count} entries");
        Ok(SyncOutcome::Rebuilt(count))
    }

    /// Parses every row, probes local copies and sorts the result.
    async fn build(&self, rows: &[&str]) -> Catalog {
        let model = self.session.model().await;
        let root = self.session.download_root();
        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(rows.len());

        for row in rows {
            let record = match parse_record(row) {
                Ok(record) => record,
                Err(e) => {
                    log::warn!("Skipping listing row {row:?}: {e}");
                    continue;
                }
            };
            let Some(mut entry) = entry_from_record(self.profile.as_ref(), record) else {
                log::warn!("Skipping listing row {row:?}: file name has no identifier");
                continue;
            };
            if !seen.insert(entry.id.clone()) {
                log::warn!("Skipping {}: duplicate identifier {}", entry.file_name, entry.id);
                continue;
            }

            let local_size = self.fs.file_size(&entry.local_path(root, &model)).await;
            entry.apply_local(LocalCopy::classify(local_size, entry.size));
            entries.push(entry);
        }

        Catalog::from_entries(entries)
    }
}
