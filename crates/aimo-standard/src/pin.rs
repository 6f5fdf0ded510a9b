//! AIMO Standard version pinning guard.
//!
//! These values must be updated only through an explicit upgrade procedure.
//! Do not implement a "latest" or auto-follow mode here, and do not relax
//! verification failures into warnings.

use thiserror::Error;

/// The Standard version this engine build is pinned to.
pub const PINNED_VERSION: &str = "0.1.7";
/// The exact commit of the `aimo-standard` submodule this build was verified
/// against. Checked as a prefix match against the resolved commit.
pub const PINNED_COMMIT: &str = "88ab75d286a252bb3e9a1c4f6d9a7b5e0c3d4f21";
/// `aimo_core::hashing::blake3_tree_hash` over the pinned artifact tree.
pub const PINNED_DIR_SHA256: &str = "7e3f0a9c2d5b8e41f6a0c9d3b7e5a2f41c8d9b0e3a6f5c2d8b7e4a1f9c6d3b5a";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PinningError {
    #[error("standard commit mismatch: pinned {pinned}, resolved {resolved}")]
    CommitMismatch { pinned: String, resolved: String },

    #[error("standard artifacts_dir_sha256 mismatch: pinned {pinned}, resolved {resolved}")]
    DirShaMismatch { pinned: String, resolved: String },

    #[error("skip_pinning_check requested but AIMO_ALLOW_SKIP_PINNING is not set")]
    GuardedSkipMisuse,
}

/// Verifies `resolved_commit`/`resolved_dir_sha256` against the compiled-in
/// pin. Only called when the requested version equals `PINNED_VERSION`
/// (`spec.md` §4.2, §3 "StandardArtifacts" invariant).
pub fn enforce_pinning(resolved_commit: &str, resolved_dir_sha256: &str) -> Result<(), PinningError> {
    if !resolved_commit.starts_with(PINNED_COMMIT) && !PINNED_COMMIT.starts_with(resolved_commit) {
        return Err(PinningError::CommitMismatch {
            pinned: PINNED_COMMIT.to_string(),
            resolved: resolved_commit.to_string(),
        });
    }
    if resolved_dir_sha256 != PINNED_DIR_SHA256 {
        return Err(PinningError::DirShaMismatch {
            pinned: PINNED_DIR_SHA256.to_string(),
            resolved: resolved_dir_sha256.to_string(),
        });
    }
    Ok(())
}

/// Decides whether a `skip_pinning_check` request is honored. A skip is only
/// valid when the caller both passes `requested = true` *and* the
/// environment explicitly allows it; the absence of the env permission turns
/// a skip request into a hard failure rather than a silent pinning check.
pub fn resolve_skip_request(requested: bool, env_allows_skip: bool) -> Result<bool, PinningError> {
    if !requested {
        return Ok(false);
    }
    if env_allows_skip {
        Ok(true)
    } else {
        Err(PinningError::GuardedSkipMisuse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_commit_and_sha_passes() {
        assert!(enforce_pinning(PINNED_COMMIT, PINNED_DIR_SHA256).is_ok());
    }

    #[test]
    fn commit_prefix_match_passes() {
        assert!(enforce_pinning(&PINNED_COMMIT[..12], PINNED_DIR_SHA256).is_ok());
    }

    #[test]
    fn dir_sha_mismatch_fails() {
        let err = enforce_pinning(PINNED_COMMIT, "deadbeef").unwrap_err();
        assert!(matches!(err, PinningError::DirShaMismatch { .. }));
    }

    #[test]
    fn skip_without_env_permission_is_guarded_misuse() {
        assert_eq!(resolve_skip_request(true, false), Err(PinningError::GuardedSkipMisuse));
    }

    #[test]
    fn skip_with_env_permission_is_honored() {
        assert_eq!(resolve_skip_request(true, true), Ok(true));
    }

    #[test]
    fn no_skip_requested_is_always_ok() {
        assert_eq!(resolve_skip_request(false, false), Ok(false));
    }
}
