//! Mirrors the Standard artifact tree into a content-addressed local cache
//! (`spec.md` §4.2 "Cache sync").

use aimo_core::hashing::{blake3_tree_hash, sha256_file};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::io;

/// The directories mirrored from the submodule tree into the cache, in the
/// order the original sync script copies them.
pub const KEY_DIRECTORIES: &[&str] = &["schemas", "data", "artifacts", "source_pack", "templates", "examples"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheManifest {
    pub version: String,
    pub cache_dir: String,
    pub files: Vec<String>,
    pub file_count: usize,
    pub directory_sha256: String,
}

/// Lists every regular file under `root`, relative paths, sorted.
fn walk_files(root: &Utf8Path) -> io::Result<Vec<Utf8PathBuf>> {
    let mut out = Vec::new();
    walk_files_into(root, root, &mut out)?;
    out.sort();
    Ok(out)
}

fn walk_files_into(root: &Utf8Path, dir: &Utf8Path, out: &mut Vec<Utf8PathBuf>) -> io::Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = Utf8PathBuf::from_path_buf(entry.path()).expect("non-utf8 path in standard artifact tree");
        if path.is_dir() {
            walk_files_into(root, &path, out)?;
        } else if path.is_file() {
            out.push(path.strip_prefix(root).unwrap_or(&path).to_path_buf());
        }
    }
    Ok(())
}

fn directory_sha256(root: &Utf8Path) -> io::Result<String> {
    let files = walk_files(root)?;
    let mut entries: Vec<(String, Vec<u8>)> = Vec::with_capacity(files.len());
    for rel in &files {
        let abs = root.join(rel);
        let content_hash = sha256_file(abs.as_std_path())?;
        entries.push((rel.as_str().to_string(), content_hash.into_bytes()));
    }
    let borrowed: Vec<(&str, &[u8])> = entries.iter().map(|(p, h)| (p.as_str(), h.as_slice())).collect();
    Ok(blake3_tree_hash(borrowed))
}

fn copy_dir_recursive(src: &Utf8Path, dst: &Utf8Path) -> io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = Utf8PathBuf::from_path_buf(entry.path()).expect("non-utf8 path in standard artifact tree");
        let dst_path = dst.join(src_path.file_name().unwrap_or_default());
        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Syncs the key artifact directories from `submodule_dir` into
/// `cache_dir/v<version>/`, reusing a present, valid manifest instead of
/// re-copying.
pub fn sync_to_cache(submodule_dir: &Utf8Path, cache_base: &Utf8Path, version: &str) -> io::Result<(Utf8PathBuf, CacheManifest)> {
    let version_tag = if version.starts_with('v') { version.to_string() } else { format!("v{version}") };
    let version_cache_dir = cache_base.join(&version_tag);
    let manifest_path = version_cache_dir.join("manifest.json");

    if manifest_path.exists() {
        if let Ok(content) = std::fs::read_to_string(&manifest_path) {
            if let Ok(manifest) = serde_json::from_str::<CacheManifest>(&content) {
                if !manifest.directory_sha256.is_empty() && version_cache_dir.exists() {
                    return Ok((version_cache_dir, manifest));
                }
            }
        }
    }

    if version_cache_dir.exists() {
        std::fs::remove_dir_all(&version_cache_dir)?;
    }
    std::fs::create_dir_all(&version_cache_dir)?;

    for dir_name in KEY_DIRECTORIES {
        let src_dir = submodule_dir.join(dir_name);
        if src_dir.exists() {
            copy_dir_recursive(&src_dir, &version_cache_dir.join(dir_name))?;
        }
    }

    let dir_sha = directory_sha256(&version_cache_dir)?;
    let files: Vec<String> = walk_files(&version_cache_dir)?.into_iter().map(|p| p.into_string()).collect();

    let manifest = CacheManifest {
        version: version.to_string(),
        cache_dir: version_cache_dir.to_string(),
        file_count: files.len(),
        files,
        directory_sha256: dir_sha,
    };
    std::fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;

    Ok((version_cache_dir, manifest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn sync_mirrors_key_directories_and_writes_manifest() {
        let submodule = tempfile::tempdir().unwrap();
        let submodule_dir = Utf8PathBuf::from_path_buf(submodule.path().to_path_buf()).unwrap();
        fs::create_dir_all(submodule_dir.join("schemas")).unwrap();
        fs::write(submodule_dir.join("schemas").join("evidence_pack_manifest.schema.json"), "{}").unwrap();

        let cache = tempfile::tempdir().unwrap();
        let cache_base = Utf8PathBuf::from_path_buf(cache.path().to_path_buf()).unwrap();

        let (cache_dir, manifest) = sync_to_cache(&submodule_dir, &cache_base, "0.1.7").unwrap();
        assert!(cache_dir.ends_with("v0.1.7"));
        assert_eq!(manifest.file_count, 1);
        assert!(cache_dir.join("schemas").join("evidence_pack_manifest.schema.json").exists());
    }

    #[test]
    fn second_sync_reuses_manifest_without_resync() {
        let submodule = tempfile::tempdir().unwrap();
        let submodule_dir = Utf8PathBuf::from_path_buf(submodule.path().to_path_buf()).unwrap();
        fs::create_dir_all(submodule_dir.join("data")).unwrap();
        fs::write(submodule_dir.join("data").join("x.csv"), "a,b\n1,2\n").unwrap();

        let cache = tempfile::tempdir().unwrap();
        let cache_base = Utf8PathBuf::from_path_buf(cache.path().to_path_buf()).unwrap();

        let (_, first) = sync_to_cache(&submodule_dir, &cache_base, "0.1.7").unwrap();
        fs::write(submodule_dir.join("data").join("y.csv"), "c,d\n3,4\n").unwrap();
        let (_, second) = sync_to_cache(&submodule_dir, &cache_base, "0.1.7").unwrap();
        assert_eq!(first.directory_sha256, second.directory_sha256);
        assert_eq!(second.file_count, 1);
    }
}
