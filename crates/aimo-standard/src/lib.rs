//! Standard Resolver (C2): resolves, pin-verifies, and exposes taxonomy and
//! schemas from the versioned AIMO Standard artifact tree (`spec.md` §4.2).

pub mod cache;
pub mod pin;
pub mod schemas;
pub mod taxonomy;

use aimo_core::model::StandardArtifacts;
use camino::{Utf8Path, Utf8PathBuf};
use schemas::SchemaLoader;
use taxonomy::TaxonomyDictionary;
use thiserror::Error;

pub const DEFAULT_VERSION: &str = pin::PINNED_VERSION;

#[derive(Debug, Error)]
pub enum StandardResolveError {
    #[error("standard submodule directory not found: {0}")]
    SubmoduleMissing(Utf8PathBuf),
    #[error(transparent)]
    Pinning(#[from] pin::PinningError),
    #[error(transparent)]
    Cache(#[from] std::io::Error),
    #[error(transparent)]
    Taxonomy(#[from] taxonomy::TaxonomyLoadError),
}

/// Resolved Standard state for one engine run: the audit-recorded identity
/// (`aimo_core::model::StandardArtifacts`) plus live handles for the
/// taxonomy dictionary and schema loader.
pub struct ResolvedStandard {
    pub artifacts: StandardArtifacts,
    pub artifacts_dir: Utf8PathBuf,
    pub taxonomy: TaxonomyDictionary,
    pub schemas: SchemaLoader,
}

pub struct ResolveRequest<'a> {
    pub version: &'a str,
    pub submodule_dir: &'a Utf8Path,
    pub cache_dir: &'a Utf8Path,
    pub skip_pinning_check_requested: bool,
    pub env_allows_skip_pinning: bool,
}

/// Main entry point: ensures the artifact tree is mirrored into the local
/// cache, computes the audit-trail identity, and — when the requested
/// version is the compiled-in pin — enforces the pinning guard.
pub fn resolve_standard(req: &ResolveRequest<'_>) -> Result<ResolvedStandard, StandardResolveError> {
    if !req.submodule_dir.exists() {
        return Err(StandardResolveError::SubmoduleMissing(req.submodule_dir.to_path_buf()));
    }

    let commit = resolve_commit(req.submodule_dir);
    let (artifacts_dir, manifest) = cache::sync_to_cache(req.submodule_dir, req.cache_dir, req.version)?;

    let skip_honored = pin::resolve_skip_request(req.skip_pinning_check_requested, req.env_allows_skip_pinning)?;

    if req.version == pin::PINNED_VERSION && !skip_honored {
        pin::enforce_pinning(&commit, &manifest.directory_sha256)?;
    }

    let zip_path = req.submodule_dir.join("dist").join("aimo-standard-artifacts.zip");
    let artifacts_zip_sha256 = zip_path.exists().then(|| aimo_core::hashing::sha256_file(zip_path.as_std_path())).transpose()?;

    let artifacts = StandardArtifacts {
        standard_version: req.version.to_string(),
        standard_commit: commit,
        artifacts_dir_sha256: manifest.directory_sha256,
        artifacts_zip_sha256,
    };

    let taxonomy = TaxonomyDictionary::load(&artifacts_dir)?;
    let schemas = SchemaLoader::new(&artifacts_dir);

    Ok(ResolvedStandard { artifacts, artifacts_dir, taxonomy, schemas })
}

fn resolve_commit(submodule_dir: &Utf8Path) -> String {
    let output = std::process::Command::new("git").args(["rev-parse", "HEAD"]).current_dir(submodule_dir).output();

    if let Ok(output) = output {
        if output.status.success() {
            if let Ok(hash) = String::from_utf8(output.stdout) {
                let hash = hash.trim();
                if !hash.is_empty() {
                    return hash.to_string();
                }
            }
        }
    }

    let commit_file = submodule_dir.join("COMMIT");
    std::fs::read_to_string(commit_file).map(|s| s.trim().to_string()).unwrap_or_else(|_| "unknown".to_string())
}
