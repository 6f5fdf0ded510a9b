//! Config-file discovery: search upward from a start directory for
//! `.aimo/config.toml`, stopping at a repository root marker, matching the
//! teacher's `discover_config_file_from` search strategy.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::model::{LlmConfig, PathsConfig, PersistenceConfig, ThresholdsConfig, Versions};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TomlConfig {
    pub versions: Option<Versions>,
    pub thresholds: Option<ThresholdsConfig>,
    pub llm: Option<LlmConfig>,
    pub paths: Option<PathsConfig>,
    pub persistence: Option<PersistenceConfig>,
}

/// Search upward from `start_dir` for `.aimo/config.toml`, stopping at a
/// VCS-root marker if no config file is found first.
pub fn discover_config_file_from(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    loop {
        let candidate = current.join(".aimo").join("config.toml");
        if candidate.exists() {
            return Some(candidate);
        }
        if current.parent().is_none() {
            return None;
        }
        if current.join(".git").exists() {
            return None;
        }
        current = current.parent()?.to_path_buf();
    }
}

pub(crate) fn load_config_file(path: &Path) -> Result<TomlConfig> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            toml::from_str(&content).with_context(|| format!("failed to parse config file: {}", path.display()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(TomlConfig::default()),
        Err(e) => Err(e).with_context(|| format!("failed to read config file: {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovers_config_in_ancestor_directory() {
        let root = tempfile::tempdir().unwrap();
        let aimo_dir = root.path().join(".aimo");
        std::fs::create_dir_all(&aimo_dir).unwrap();
        std::fs::write(aimo_dir.join("config.toml"), "").unwrap();

        let nested = root.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();

        let found = discover_config_file_from(&nested).unwrap();
        assert_eq!(found, aimo_dir.join("config.toml"));
    }

    #[test]
    fn stops_at_git_root_when_nothing_found() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join(".git")).unwrap();
        let nested = root.path().join("a");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(discover_config_file_from(&nested), None);
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = load_config_file(&path).unwrap();
        assert!(cfg.versions.is_none());
    }
}
