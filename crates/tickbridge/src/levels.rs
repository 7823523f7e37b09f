//! Saved level listing for `getlevels`.
//!
//! Runs on the connection thread: it reads only the filesystem and never
//! touches host state.

use std::fs;
use std::io;

use camino::Utf8Path;
use thiserror::Error;

/// Errors raised while listing saved levels.
#[derive(Debug, Error)]
pub enum LevelsError {
    /// The saves directory exists but could not be read.
    #[error("failed to read saves directory {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    /// The listing could not be encoded.
    #[error("failed to encode level list: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Returns the sorted sub-directory names of `saves_dir` as a JSON array.
///
/// A missing directory yields `[]`.
pub fn list_levels(saves_dir: &Utf8Path) -> Result<String, LevelsError> {
    let read_error = |source| LevelsError::Read {
        path: saves_dir.to_string(),
        source,
    };
    let entries = match fs::read_dir(saves_dir) {
        Ok(entries) => entries,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok("[]".to_owned()),
        Err(error) => return Err(read_error(error)),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(read_error)?;
        if entry.file_type().map_err(read_error)?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(serde_json::to_string(&names)?)
}
