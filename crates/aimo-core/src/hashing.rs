//! sha256/blake3 helpers used throughout the pipeline for identity and
//! content-addressing.
//!
//! All hashes returned by this module are lowercase hex, per the data model's
//! global invariant (`spec.md` §3: "All identifiers and hashes are lowercase
//! hex unless noted").

use sha2::{Digest, Sha256};
use std::io::{self, Read};
use std::path::Path;

/// sha256 over raw bytes, lowercase hex.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// sha256 over a pipe-joined sequence of fields, in the convention used by
/// `run_key`, `ingest_lineage_hash`, and `url_signature` (`"field|field|..."`).
#[must_use]
pub fn sha256_joined<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = fields
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join("|");
    sha256_hex(joined.as_bytes())
}

/// The first 8 bytes of `sha256(input)`, interpreted as a big-endian `u64`.
///
/// This is the exact construction the coverage-sample predicate (C) uses for
/// its deterministic selection (`spec.md` §4.5, §9): codified, not
/// reinterpreted, because the spec explicitly calls out this construction as
/// load-bearing for reproducibility.
#[must_use]
pub fn sha256_first8_be_u64(input: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(buf)
}

/// sha256 over file contents, streamed in fixed-size chunks so large log
/// files don't need to be held in memory for manifest hashing.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// blake3 hash over an ordered list of `(relative_path, content)` pairs,
/// used to compute `artifacts_dir_sha256` for the Standard Resolver (C2).
///
/// blake3 is used here (rather than sha256, used elsewhere in the data
/// model) because the engine's Standard-artifact mirroring already reaches
/// for it as a whole-tree content hash, matching the teacher crate family's
/// use of blake3 for content-addressed caches.
#[must_use]
pub fn blake3_tree_hash<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let mut sorted: Vec<(&str, &[u8])> = entries.into_iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let mut hasher = blake3::Hasher::new();
    for (path, content) in sorted {
        hasher.update(path.as_bytes());
        hasher.update(b"\0");
        hasher.update(content);
        hasher.update(b"\0");
    }
    hasher.finalize().to_hex().to_string()
}
