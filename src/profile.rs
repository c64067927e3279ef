//! Device naming conventions.
//!
//! Catalog identifiers are derived from file names alone, so that two
//! listings of an unchanged card produce identical identifiers. How a name
//! maps to an identifier depends on the camera, hence the [`DeviceProfile`]
//! trait.

/// Prefix of every entry locator.
pub const LOCATOR_SCHEME: &str = "camera://";

/// Naming rules of one family of cameras.
pub trait DeviceProfile: Send + Sync {
    /// Derives the stable catalog identifier for a file name.
    ///
    /// Returns `None` when the name does not follow the device convention.
    fn identifier(&self, file_name: &str) -> Option<String>;

    /// Derives the media kind from the file name (the extension, or empty).
    fn media_kind(&self, file_name: &str) -> String {
        file_name
            .rfind('.')
            .map(|dot| file_name[dot + 1..].to_string())
            .unwrap_or_default()
    }

    /// Builds the virtual locator the presentation layer uses for thumbnails.
    fn locator(&self, dir: &str, file_name: &str) -> String {
        format!("{LOCATOR_SCHEME}{}/{file_name}", dir.trim_end_matches('/'))
    }
}

/// Identifier made of a fixed-width slice of the file name plus the media kind.
///
/// Olympus names files `PMDDNNNN.EXT`; the four characters at offset 4 are
/// the running number, so `P1010001.JPG` becomes `0001JPG`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSliceProfile {
    /// Byte offset of the slice inside the file name.
    pub offset: usize,
    /// Width of the slice in bytes.
    pub width: usize,
}

impl FixedSliceProfile {
    /// The Olympus `PMDDNNNN.EXT` convention.
    #[must_use]
    pub const fn olympus() -> Self {
        Self {
            offset: 4,
            width: 4,
        }
    }
}

impl Default for FixedSliceProfile {
    fn default() -> Self {
        Self::olympus()
    }
}

impl DeviceProfile for FixedSliceProfile {
    fn identifier(&self, file_name: &str) -> Option<String> {
        let slice = file_name.get(self.offset..self.offset + self.width)?;
        Some(format!("{slice}{}", self.media_kind(file_name)))
    }
}
