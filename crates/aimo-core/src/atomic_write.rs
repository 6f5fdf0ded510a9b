//! Atomic file operations used for every Evidence Bundle file and persisted
//! artifact.
//!
//! Writes go through a temp file in the destination directory, `fsync`, then
//! an atomic rename — never a direct truncate-and-write — so a crash mid-run
//! cannot leave a partially-written bundle file that a later reader mistakes
//! for complete (`spec.md` §4.9 "Ordering": writes are atomic per file).

use camino::Utf8Path;
use std::fs;
use std::io::{self, Write};
use tempfile::NamedTempFile;
use thiserror::Error;

#[cfg(target_os = "windows")]
use std::{thread, time::Duration};

#[derive(Debug, Error)]
pub enum AtomicWriteError {
    #[error("failed to create parent directory {path}: {source}")]
    CreateDir { path: String, source: io::Error },
    #[error("failed to create temp file in {dir}: {source}")]
    TempFile { dir: String, source: io::Error },
    #[error("failed to write content: {0}")]
    Write(io::Error),
    #[error("failed to fsync temp file: {0}")]
    Fsync(io::Error),
    #[error("failed to rename temp file to {path}: {source}")]
    Rename { path: String, source: io::Error },
}

/// Result of an atomic write, carrying any warnings worth surfacing in the
/// human-facing KPI block (`spec.md` §7).
#[derive(Debug, Clone, Default)]
pub struct AtomicWriteResult {
    pub rename_retry_count: u32,
    pub used_cross_filesystem_fallback: bool,
    pub warnings: Vec<String>,
}

/// Atomically write `content` (raw bytes) to `path`.
pub fn write_file_atomic(path: &Utf8Path, content: &[u8]) -> Result<AtomicWriteResult, AtomicWriteError> {
    let mut result = AtomicWriteResult::default();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| AtomicWriteError::CreateDir {
            path: parent.to_string(),
            source,
        })?;
    }

    let temp_dir = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let mut temp_file = NamedTempFile::new_in(temp_dir).map_err(|source| AtomicWriteError::TempFile {
        dir: temp_dir.to_string(),
        source,
    })?;

    temp_file.write_all(content).map_err(AtomicWriteError::Write)?;
    temp_file.as_file().sync_all().map_err(AtomicWriteError::Fsync)?;

    let retry_count = atomic_rename(temp_file, path)?;
    result.rename_retry_count = retry_count;
    if retry_count > 0 {
        result
            .warnings
            .push(format!("rename required {retry_count} retries"));
    }

    Ok(result)
}

/// Convenience wrapper for UTF-8 text content.
pub fn write_text_atomic(path: &Utf8Path, content: &str) -> Result<AtomicWriteResult, AtomicWriteError> {
    write_file_atomic(path, content.as_bytes())
}

#[cfg(target_os = "windows")]
fn atomic_rename(temp_file: NamedTempFile, target: &Utf8Path) -> Result<u32, AtomicWriteError> {
    const MAX_RETRIES: u32 = 5;
    const INITIAL_DELAY_MS: u64 = 10;

    let mut retry_count = 0;
    let mut delay_ms = INITIAL_DELAY_MS;
    let mut temp_file = temp_file;

    loop {
        match temp_file.persist(target.as_std_path()) {
            Ok(_) => return Ok(retry_count),
            Err(e) if retry_count < MAX_RETRIES => {
                retry_count += 1;
                thread::sleep(Duration::from_millis(delay_ms));
                delay_ms = (delay_ms * 2).min(100);
                temp_file = e.file;
            }
            Err(e) => {
                return Err(AtomicWriteError::Rename {
                    path: target.to_string(),
                    source: e.error,
                });
            }
        }
    }
}

#[cfg(not(target_os = "windows"))]
fn atomic_rename(temp_file: NamedTempFile, target: &Utf8Path) -> Result<u32, AtomicWriteError> {
    temp_file
        .persist(target.as_std_path())
        .map_err(|e| AtomicWriteError::Rename {
            path: target.to_string(),
            source: e.error,
        })?;
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    #[test]
    fn write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("out.json")).unwrap();
        write_text_atomic(&path, "{\"a\":1}").unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\"a\":1}");
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("nested/deep/out.txt")).unwrap();
        write_text_atomic(&path, "x").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn overwrites_existing_file_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("out.txt")).unwrap();
        write_text_atomic(&path, "first").unwrap();
        write_text_atomic(&path, "second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
    }
}
