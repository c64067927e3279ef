//! Local disk abstraction for testability.

use async_trait::async_trait;
use std::path::Path;

/// What, if anything, sits at a local path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Nothing exists at the path.
    Missing,
    /// A directory exists at the path.
    Directory,
    /// A regular file of the given size exists at the path.
    File(u64),
}

/// Abstraction over the local file system operations the engine needs.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Classifies what exists at the given path.
    async fn probe(&self, path: &Path) -> PathKind;

    /// Creates all directories in the given path.
    async fn create_dir_all(&self, path: &Path) -> std::io::Result<()>;

    /// Creates (or truncates) a file for writing.
    async fn create_file(&self, path: &Path) -> std::io::Result<tokio::fs::File>;

    /// Removes a file.
    async fn remove_file(&self, path: &Path) -> std::io::Result<()>;

    /// Returns the size of a regular file if one exists at the path.
    async fn file_size(&self, path: &Path) -> Option<u64> {
        match self.probe(path).await {
            PathKind::File(size) => Some(size),
            PathKind::Missing | PathKind::Directory => None,
        }
    }
}

/// Default file system implementation using `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileSystem;

impl TokioFileSystem {
    /// Creates a new `TokioFileSystem` instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileSystem for TokioFileSystem {
    async fn probe(&self, path: &Path) -> PathKind {
        match tokio::fs::metadata(path).await {
            Ok(m) if m.is_dir() => PathKind::Directory,
            Ok(m) => PathKind::File(m.len()),
            Err(_) => PathKind::Missing,
        }
    }

    async fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::create_dir_all(path).await
    }

    async fn create_file(&self, path: &Path) -> std::io::Result<tokio::fs::File> {
        tokio::fs::File::create(path).await
    }

    async fn remove_file(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::remove_file(path).await
    }
}
