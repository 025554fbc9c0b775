//! Integration tests.

use std::path::PathBuf;
use tempfile::TempDir;

mod json;
mod map;
mod mat;
mod npz;

/// A scratch directory and the path of `name` inside it.
///
/// The directory is removed when the returned `TempDir` is dropped.
pub fn scratch(name: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    (dir, path)
}
