//! Catalog of files known to be on the camera.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Classification of the local copy of a remote file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalCopy {
    /// A local file exists with the remote size.
    Complete,
    /// A local file exists but its size differs (reduced or interrupted).
    Partial,
    /// No local file exists.
    Missing,
}

impl LocalCopy {
    /// Classifies a local file size against the size the camera reports.
    #[must_use]
    pub fn classify(local_size: Option<u64>, remote_size: u64) -> Self {
        match local_size {
            Some(size) if size == remote_size => Self::Complete,
            Some(_) => Self::Partial,
            None => Self::Missing,
        }
    }
}

/// A file on the camera together with its selection and download state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    /// Stable identifier derived from the file name.
    pub id: String,
    /// Remote directory.
    pub dir: String,
    /// Remote file name.
    pub file_name: String,
    /// Virtual locator used to address the thumbnail.
    pub locator: String,
    /// Media kind (file extension).
    pub kind: String,
    /// Size reported by the camera.
    pub size: u64,
    pub selected: bool,
    pub downloading: bool,
    pub downloaded: bool,
    /// A local copy exists whose size differs from the remote one.
    pub partial: bool,
}

impl CatalogEntry {
    /// Applies the state of the local copy to the download flags.
    pub fn apply_local(&mut self, local: LocalCopy) {
        self.downloaded = matches!(local, LocalCopy::Complete);
        self.partial = matches!(local, LocalCopy::Partial);
    }

    /// Absolute path of the file on the camera.
    #[must_use]
    pub fn camera_path(&self) -> String {
        format!("{}/{}", self.dir.trim_end_matches('/'), self.file_name)
    }

    /// Where the file lands locally: `<root>/<model>/<file name>`.
    #[must_use]
    pub fn local_path(&self, root: &Path, model: &str) -> PathBuf {
        root.join(model).join(&self.file_name)
    }
}

/// Ordering used by the catalog: newest (highest identifier) first.
fn newest_first(a: &CatalogEntry, b: &CatalogEntry) -> Ordering {
    b.id.cmp(&a.id)
}

/// Entries sorted by identifier, descending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Builds a catalog, sorting the entries newest first.
    #[must_use]
    pub fn from_entries(mut entries: Vec<CatalogEntry>) -> Self {
        entries.sort_by(newest_first);
        Self { entries }
    }

    #[must_use]
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry with the highest identifier.
    #[must_use]
    pub fn newest(&self) -> Option<&CatalogEntry> {
        self.entries.first()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut CatalogEntry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, CatalogEntry> {
        self.entries.iter_mut()
    }

    /// Identifiers of the selected entries, in catalog order.
    #[must_use]
    pub fn selected_ids(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.selected)
            .map(|e| e.id.clone())
            .collect()
    }

    /// Returns true if the entries are strictly descending by identifier.
    #[must_use]
    pub fn is_sorted_newest_first(&self) -> bool {
        self.entries.windows(2).all(|w| w[0].id > w[1].id)
    }
}

#[cfg(test)]
pub(crate) fn entry(id: &str, file_name: &str, size: u64) -> CatalogEntry {
    CatalogEntry {
        id: id.to_string(),
        dir: "/DCIM/100OLYMP".to_string(),
        file_name: file_name.to_string(),
        locator: format!("camera:///DCIM/100OLYMP/{file_name}"),
        kind: "JPG".to_string(),
        size,
        selected: false,
        downloading: false,
        downloaded: false,
        partial: false,
    }
}
