//! Deterministic `url_signature` construction (`spec.md` §4.4).

use crate::normalize::{bytes_bucket, dest_domain, method_bucket, normalize_url};
use aimo_core::hashing::sha256_hex;
use aimo_core::model::{BytesBucket, MethodBucket};

/// Current signature-hashing scheme version. Bumping this invalidates every
/// cache entry, since the cache is keyed on `url_signature` alone
/// (`spec.md` §4.4).
pub const SIGNATURE_VERSION: &str = "v1";

/// The full set of derived components plus the resulting signature, so
/// callers can persist both (`SignatureStats` needs `norm_host` and
/// `norm_path_template` directly).
#[derive(Debug, Clone)]
pub struct UrlSignatureResult {
    pub url_signature: String,
    pub norm_host: String,
    pub norm_path_template: String,
    pub norm_query_key_set: Vec<String>,
    pub bytes_bucket: BytesBucket,
    pub method_bucket: MethodBucket,
}

/// Build a `url_signature` from a raw URL and the event's method/bytes.
///
/// `url_signature = sha256("sig|v|host|path_template|sorted_query_keys|method_bucket|bytes_bucket")`.
#[must_use]
pub fn build_signature(
    url_full: &str,
    fallback_host: Option<&str>,
    http_method: &str,
    bytes_sent: u64,
) -> UrlSignatureResult {
    let normalized = normalize_url(url_full, fallback_host);
    let mbucket = method_bucket(http_method);
    let bbucket = bytes_bucket(bytes_sent);

    let sorted_query = normalized.norm_query_key_set.join(",");
    let input = format!(
        "sig|{}|{}|{}|{}|{}|{}",
        SIGNATURE_VERSION,
        normalized.norm_host,
        normalized.norm_path_template,
        sorted_query,
        mbucket,
        bbucket,
    );

    UrlSignatureResult {
        url_signature: sha256_hex(input.as_bytes()),
        norm_host: normalized.norm_host,
        norm_path_template: normalized.norm_path_template,
        norm_query_key_set: normalized.norm_query_key_set,
        bytes_bucket: bbucket,
        method_bucket: mbucket,
    }
}

/// eTLD+1 for an already-normalized (lower-cased) host.
#[must_use]
pub fn signature_dest_domain(norm_host: &str) -> String {
    dest_domain(norm_host)
}
