use crate::upload::types::{CandidateFile, DEFAULT_CONTENT_TYPE};
use ignore::Walk;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

fn guess_content_type(name: &str) -> String {
    mime_guess::from_path(name)
        .first()
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
}

/// Reads a file from disk into a candidate.
pub fn from_path(path: &Path) -> io::Result<CandidateFile> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Invalid filename encoding"))?
        .to_string();
    let bytes = fs::read(path)?;
    Ok(from_bytes(&name, bytes))
}

/// Builds a candidate from bytes already in memory, e.g. a file dropped on the window.
pub fn from_bytes(name: &str, bytes: impl Into<bytes::Bytes>) -> CandidateFile {
    CandidateFile::new(name, guess_content_type(name), bytes)
}

/// Every regular file under `folder`, honoring `.gitignore` rules.
pub fn collect_folder(folder: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for entry in Walk::new(folder) {
        match entry {
            Ok(entry) => {
                let path = entry.path();
                if path.is_file() {
                    paths.push(path.to_path_buf());
                }
            }
            Err(e) => warn!("Error walking {}: {}", folder.display(), e),
        }
    }
    paths.sort();
    paths
}
