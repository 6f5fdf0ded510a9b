//! `checksums.json` (`spec.md` §4.9, I6) — must cover every other file in
//! the bundle. Computed last, after every content file has been written and
//! fsynced, so the hashes reflect what actually landed on disk.

use aimo_core::hashing::sha256_file;
use camino::Utf8Path;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io;

const ALGORITHM: &str = "SHA-256";

#[derive(Debug, Clone, Serialize)]
pub struct ChecksumManifest {
    pub algorithm: String,
    pub files: BTreeMap<String, String>,
}

/// Hashes every file under `bundle_dir` whose relative path is in
/// `relative_paths`, keyed by that same relative path.
pub fn build_checksum_manifest(bundle_dir: &Utf8Path, relative_paths: &[String]) -> io::Result<ChecksumManifest> {
    let mut files = BTreeMap::new();
    for rel in relative_paths {
        let path = bundle_dir.join(rel);
        let digest = sha256_file(path.as_std_path())?;
        files.insert(rel.clone(), digest);
    }
    Ok(ChecksumManifest { algorithm: ALGORITHM.to_string(), files })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_every_listed_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        std::fs::write(root.join("a.json"), b"{}").unwrap();
        std::fs::create_dir_all(root.join("logs")).unwrap();
        std::fs::write(root.join("logs").join("b.jsonl"), b"{}\n").unwrap();

        let manifest = build_checksum_manifest(root, &["a.json".to_string(), "logs/b.jsonl".to_string()]).unwrap();
        assert_eq!(manifest.algorithm, "SHA-256");
        assert_eq!(manifest.files.len(), 2);
        assert!(manifest.files.contains_key("a.json"));
        assert!(manifest.files.contains_key("logs/b.jsonl"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        assert!(build_checksum_manifest(root, &["missing.json".to_string()]).is_err());
    }
}
