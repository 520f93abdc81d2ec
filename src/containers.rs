//! Pipeline containers exchanged between stages.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A remote filesystem location collected by an upstream stage.
///
/// The same shape is used for inputs and for the derived outputs this stage
/// republishes; downstream consumers treat the output collection as an
/// unordered set keyed by path + hostname.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteFsPath {
    pub hostname: String,
    pub path: String,
}

impl RemoteFsPath {
    pub fn new(hostname: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            path: path.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid manifest record on line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },
}

/// Read a JSONL manifest of collected artifacts, one record per line.
///
/// Blank lines are skipped; anything else must parse as a [`RemoteFsPath`].
pub fn read_manifest(path: &Path) -> Result<Vec<RemoteFsPath>, ManifestError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut artifacts = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let artifact =
            serde_json::from_str(trimmed).map_err(|source| ManifestError::Parse {
                line: idx + 1,
                source,
            })?;
        artifacts.push(artifact);
    }
    Ok(artifacts)
}
