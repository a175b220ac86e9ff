//! Reading source files
//!
//! The core works on in-memory text; this is the single place where raw
//! bytes come in. Decoding failures are their own variant - a file that
//! is not valid UTF-8 must fail the call loudly, never be coerced.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Source not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Source is not valid UTF-8: {}", .0.display())]
    InvalidEncoding(PathBuf),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Reads a file and decodes it as UTF-8
pub fn read_source(path: &Path) -> Result<String, SourceError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(SourceError::NotFound(path.to_path_buf()))
        }
        Err(e) => {
            return Err(SourceError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    String::from_utf8(bytes).map_err(|_| SourceError::InvalidEncoding(path.to_path_buf()))
}
