//! Error types for the camsync library.

use thiserror::Error;

/// Errors that can occur while talking to the camera or writing files locally.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport failure, timeout or non-success HTTP status.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The camera answered with a body we could not make sense of.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// I/O error during local file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The per-model download directory exists but is a regular file.
    #[error("download path is not a directory: {path}")]
    NotADirectory {
        /// Path that was expected to be a directory.
        path: String,
    },

    /// No catalog entry carries the given identifier.
    #[error("unknown catalog entry: {0}")]
    UnknownEntry(String),

    /// The persisted settings document could not be parsed or written.
    #[error("settings error: {0}")]
    Settings(#[from] serde_json::Error),
}

impl Error {
    /// Returns true for failures that originate on the local disk.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Io(_) | Self::NotADirectory { .. })
    }
}

/// A specialized `Result` type for camsync operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_errors_are_classified() {
        let io = Error::Io(std::io::Error::other("disk full"));
        assert!(io.is_local());
        let collision = Error::NotADirectory {
            path: "/tmp/E-M10".to_string(),
        };
        assert!(collision.is_local());
        assert!(!Error::Protocol("bad xml".to_string()).is_local());
    }

    #[test]
    fn display_includes_context() {
        let err = Error::UnknownEntry("0001JPG".to_string());
        assert_eq!(err.to_string(), "unknown catalog entry: 0001JPG");
    }
}
