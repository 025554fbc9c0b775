//! File formats and extension-based dispatch.

use std::fmt;
use std::path::Path;

/// A file format a map can be loaded from or saved to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    /// JSON5 text (`.json`).
    Json,
    /// Level 5 MAT-file (`.mat`).
    Mat,
    /// NumPy archive of `.npy` members (`.npz`).
    Npz,
}

impl Format {
    /// Selects a format from the file extension of `path`.
    ///
    /// Matching is exact and case-sensitive: `data.JSON` has no format.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Format> {
        let extension = path.as_ref().extension()?.to_str()?;
        [Format::Json, Format::Mat, Format::Npz]
            .into_iter()
            .find(|format| format.extension() == extension)
    }

    /// The file extension, without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Mat => "mat",
            Format::Npz => "npz",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Json => f.write_str("JSON"),
            Format::Mat => f.write_str("MAT-file"),
            Format::Npz => f.write_str(".npz"),
        }
    }
}
