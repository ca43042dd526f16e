//! Local file comparison.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{SyncError, SyncResult};

/// Check whether the file at `path` holds exactly `expected`
///
/// A missing file matches only empty content: nothing expected, nothing
/// present. Any other I/O failure is an error.
pub fn file_matches(path: &Path, expected: &str) -> SyncResult<bool> {
    match fs::metadata(path) {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(expected.is_empty()),
        Err(source) => {
            return Err(SyncError::FileAccess {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    let content = fs::read(path).map_err(|source| SyncError::FileAccess {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(content == expected.as_bytes())
}
