//! URL normalization rules (`spec.md` §4.4).

use crate::psl::etld_plus_one;
use aimo_core::model::{BytesBucket, MethodBucket};
use aimo_redaction::is_pii_suspect;

/// The components a raw URL normalizes into, ahead of signature hashing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUrl {
    pub norm_host: String,
    pub norm_path_template: String,
    pub norm_query_key_set: Vec<String>,
}

/// Lower-case the scheme/host and elide default ports (`80` for `http`,
/// `443` for `https`).
#[must_use]
pub fn normalize_host(host: &str, scheme: Option<&str>, port: Option<u16>) -> String {
    let host = host.to_ascii_lowercase();
    match (scheme.map(str::to_ascii_lowercase).as_deref(), port) {
        (Some("http"), Some(80)) | (Some("https"), Some(443)) | (_, None) => host,
        (_, Some(p)) => format!("{host}:{p}"),
    }
}

/// Replace PII-suspect path segments with placeholders and lower-case the
/// remainder, producing `norm_path_template`.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_string();
    }
    let segments: Vec<String> = path
        .split('/')
        .map(|seg| {
            if seg.is_empty() {
                String::new()
            } else if is_pii_suspect(seg) {
                aimo_redaction::placeholder_for(aimo_redaction::classify_segment(seg)).to_string()
            } else {
                seg.to_ascii_lowercase()
            }
        })
        .collect();
    segments.join("/")
}

/// Extract and sort query key names, dropping all values (`spec.md` §4.4:
/// "values are PII-suspect").
#[must_use]
pub fn normalize_query_keys(query: &str) -> Vec<String> {
    let mut keys: Vec<String> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split('=').next().unwrap_or("").to_ascii_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    keys.sort();
    keys.dedup();
    keys
}

/// Derive `dest_domain` (eTLD+1) from a lower-cased host.
#[must_use]
pub fn dest_domain(host: &str) -> String {
    etld_plus_one(&host.to_ascii_lowercase())
}

/// Run the full normalization pipeline for one URL.
#[must_use]
pub fn normalize_url(url_full: &str, fallback_host: Option<&str>) -> NormalizedUrl {
    let (scheme, rest) = match url_full.split_once("://") {
        Some((s, r)) => (Some(s), r),
        None => (None, url_full),
    };

    let (authority, path_and_query) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, ""),
    };

    let (host_port, _userinfo_stripped) = match authority.rsplit_once('@') {
        Some((_, hp)) => (hp, true),
        None => (authority, false),
    };

    let (host, port) = match host_port.rsplit_once(':') {
        Some((h, p)) if !h.is_empty() => (h, p.parse::<u16>().ok()),
        _ => (host_port, None),
    };

    let host = if host.is_empty() {
        fallback_host.unwrap_or("")
    } else {
        host
    };

    let (path, query) = match path_and_query.split_once('?') {
        Some((p, q)) => (p, q),
        None => (path_and_query, ""),
    };

    NormalizedUrl {
        norm_host: normalize_host(host, scheme, port),
        norm_path_template: normalize_path(path),
        norm_query_key_set: normalize_query_keys(query),
    }
}

/// Coarse log-scale byte band boundary helper, re-exported for callers that
/// only have a raw byte count.
#[must_use]
pub fn bytes_bucket(bytes: u64) -> BytesBucket {
    BytesBucket::from_bytes(bytes)
}

/// `{read, write, other}` method collapsing.
#[must_use]
pub fn method_bucket(method: &str) -> MethodBucket {
    MethodBucket::from_method(method)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_default_https_port() {
        assert_eq!(normalize_host("API.OpenAI.com", Some("https"), Some(443)), "api.openai.com");
    }

    #[test]
    fn keeps_non_default_port() {
        assert_eq!(normalize_host("example.com", Some("http"), Some(8080)), "example.com:8080");
    }

    #[test]
    fn replaces_numeric_and_uuid_segments() {
        assert_eq!(normalize_path("/users/12345/profile"), "/users/{num}/profile");
        assert_eq!(
            normalize_path("/objects/550e8400-e29b-41d4-a716-446655440000"),
            "/objects/{uuid}"
        );
    }

    #[test]
    fn root_path_is_slash() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/"), "/");
    }

    #[test]
    fn query_keys_sorted_values_dropped() {
        let keys = normalize_query_keys("b=2&a=alice@example.com&c=");
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn full_url_normalizes_end_to_end() {
        let n = normalize_url("https://api.openai.com/v1/chat/completions?stream=true", None);
        assert_eq!(n.norm_host, "api.openai.com");
        assert_eq!(n.norm_path_template, "/v1/chat/completions");
        assert_eq!(n.norm_query_key_set, vec!["stream".to_string()]);
    }

    #[test]
    fn dest_domain_resolves_etld_plus_one() {
        assert_eq!(dest_domain("api.openai.com"), "openai.com");
    }
}
