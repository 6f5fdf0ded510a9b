//! File-existence and checksum-coverage checks (`spec.md` §4.10 step 2c, I6).

use camino::Utf8Path;

/// Verifies every `evidence_files[*].filename` points at a file that exists
/// inside the bundle directory.
pub fn check_evidence_files_exist(bundle_dir: &Utf8Path, filenames: &[String]) -> Vec<String> {
    filenames
        .iter()
        .filter(|f| !bundle_dir.join(f.as_str()).is_file())
        .map(|f| format!("evidence file '{f}' listed in evidence_pack_manifest.json does not exist in the bundle"))
        .collect()
}

/// Verifies `checksums.json` covers every file `relative_paths` names.
pub fn check_checksums_cover_all_files(checksummed: &std::collections::BTreeMap<String, String>, relative_paths: &[String]) -> Vec<String> {
    relative_paths
        .iter()
        .filter(|p| !checksummed.contains_key(p.as_str()))
        .map(|p| format!("checksums.json does not cover bundle file '{p}'"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_evidence_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        std::fs::write(root.join("a.json"), b"{}").unwrap();
        let errors = check_evidence_files_exist(root, &["a.json".to_string(), "missing.json".to_string()]);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn uncovered_file_is_reported() {
        let mut checksummed = std::collections::BTreeMap::new();
        checksummed.insert("a.json".to_string(), "deadbeef".to_string());
        let errors = check_checksums_cover_all_files(&checksummed, &["a.json".to_string(), "b.json".to_string()]);
        assert_eq!(errors.len(), 1);
    }
}
