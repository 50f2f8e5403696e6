//! Loading of JSON test files.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::model::SimpleTestFile;

/// A test file that could not be read or decoded.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads and decodes a simple-test file.
pub fn load_test_file(path: impl AsRef<Path>) -> Result<SimpleTestFile, LoadError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: SimpleTestFile = serde_json::from_str(&text).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(file = %file.name, sections = file.section.len(), "loaded test file");
    Ok(file)
}
