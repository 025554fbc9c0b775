use crate::format::Format;
use crate::mat::{ReadMatError, WriteMatError};
use crate::npz::{ReadNpzError, WriteNpzError};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// An error from an [`AttrMap`](crate::AttrMap) or
/// [`NumAttrMap`](crate::NumAttrMap) operation.
#[derive(Debug, Error)]
pub enum Error {
    /// A file could not be opened, read or written.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A JSON document could not be parsed.
    #[error("error parsing {}: {source}", .path.display())]
    ParseJson {
        path: PathBuf,
        #[source]
        source: json5::Error,
    },
    /// A JSON document parsed, but its top-level value is not an object.
    #[error("top-level value of {} is a {kind}, not an object", .path.display())]
    NotAnObject { path: PathBuf, kind: &'static str },
    /// The contents could not be encoded as JSON.
    #[error("error writing JSON to {}: {source}", .path.display())]
    WriteJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// Lookup of an absent key.
    #[error("key not found: {0:?}")]
    KeyNotFound(String),
    /// The key exists or may exist, but cannot be used as an attribute.
    #[error("{0:?} cannot be accessed as an attribute")]
    NotAnAttribute(String),
    /// A value has no encoding in the target format.
    #[error("value under {key:?} cannot be stored in {format} format: {reason}")]
    Unrepresentable {
        key: String,
        format: Format,
        reason: String,
    },
    /// The map cannot be loaded from this format.
    #[error("loading .{} files is not supported by this map", .0.extension())]
    UnsupportedFormat(Format),
    #[error("error reading MAT-file {}: {source}", .path.display())]
    ReadMat {
        path: PathBuf,
        #[source]
        source: ReadMatError,
    },
    #[error("error writing MAT-file {}: {source}", .path.display())]
    WriteMat {
        path: PathBuf,
        #[source]
        source: WriteMatError,
    },
    #[error("error reading {}: {source}", .path.display())]
    ReadNpz {
        path: PathBuf,
        #[source]
        source: ReadNpzError,
    },
    #[error("error writing {}: {source}", .path.display())]
    WriteNpz {
        path: PathBuf,
        #[source]
        source: WriteNpzError,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Error {
        let path = path.into();
        move |source| Error::Io { path, source }
    }
}
