//! Parser for the camera's folder listing format.
//!
//! ```text
//! VER_100
//! /DCIM/100OLYMP,P1010001.JPG,204800,0,18766,31073
//! /DCIM/100OLYMP,P1010002.JPG,307200,0,18766,31074
//! ```
//!
//! Records are CRLF separated; only the first three fields are used.

use thiserror::Error;

/// Version marker every listing body starts with.
pub const LISTING_MARKER: &str = "VER_100";

/// One file reported by the camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRecord {
    /// Remote directory holding the file.
    pub dir: String,
    /// File name inside `dir`.
    pub file_name: String,
    /// Size in bytes as reported by the camera.
    pub size: u64,
}

/// Why a single listing row was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// Fewer than the three required fields.
    #[error("expected at least 3 fields, found {0}")]
    TooFewFields(usize),
    /// The size field is not a non-negative integer.
    #[error("invalid size {0:?}")]
    BadSize(String),
}

/// Splits a listing body into its record rows.
///
/// Returns `None` when the body does not start with [`LISTING_MARKER`].
#[must_use]
pub fn listing_rows(body: &str) -> Option<Vec<&str>> {
    let rest = body.strip_prefix(LISTING_MARKER)?;
    Some(
        rest.lines()
            .map(str::trim)
            .filter(|row| !row.is_empty())
            .collect(),
    )
}

/// Parses one `dir,file,size,...` row.
///
/// # Errors
///
/// Returns a [`RecordError`] describing why the row is unusable.
pub fn parse_record(row: &str) -> Result<ListingRecord, RecordError> {
    let fields: Vec<&str> = row.split(',').collect();
    let [dir, file_name, size, ..] = fields.as_slice() else {
        return Err(RecordError::TooFewFields(fields.len()));
    };
    let size = size
        .trim()
        .parse()
        .map_err(|_| RecordError::BadSize((*size).to_string()))?;
    Ok(ListingRecord {
        dir: (*dir).to_string(),
        file_name: (*file_name).to_string(),
        size,
    })
}
