//! Per-module list files read by downstream consumers.

use std::path::Path;

use crate::error::{GenError, Result};

const SEPARATOR: &str = "\n";

pub fn write_list<S: AsRef<str>>(path: &Path, items: &[S]) -> Result<()> {
    tracing::info!(path = %path.display(), entries = items.len(), "writing list file");
    let body = items
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<&str>>()
        .join(SEPARATOR);
    std::fs::write(path, body).map_err(|source| GenError::ManifestWrite {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_list(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
