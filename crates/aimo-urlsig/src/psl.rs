//! A small embedded, curated subset of the Mozilla Public Suffix List.
//!
//! Resolved as an offline, deterministic table rather than a live network
//! fetch or a full generated PSL (see `SPEC_FULL.md` §9.1): the pipeline is
//! batch and reproducible, so eTLD+1 resolution must never depend on
//! reachability of an external list. Entries here cover the common gTLDs,
//! ccTLD-with-second-level patterns (e.g. `co.uk`), and a handful of
//! multi-label public suffixes that show up in real proxy/firewall traffic.

/// Suffixes with exactly one extra reserved label below the TLD
/// (`"co.uk"` means `example.co.uk`'s eTLD+1 is `example.co.uk`, not
/// `co.uk`).
const TWO_LABEL_SUFFIXES: &[&str] = &[
    "co.uk", "org.uk", "ac.uk", "gov.uk", "me.uk", "ltd.uk", "plc.uk",
    "co.jp", "ne.jp", "or.jp", "ac.jp", "go.jp",
    "com.au", "net.au", "org.au", "edu.au", "gov.au",
    "com.br", "net.br", "org.br",
    "com.cn", "net.cn", "org.cn", "gov.cn",
    "co.in", "net.in", "org.in", "gov.in", "ac.in",
    "co.nz", "net.nz", "org.nz", "govt.nz",
    "com.mx", "com.ar", "com.sg", "com.hk", "co.kr", "co.za",
];

/// Single-label public suffixes (ordinary gTLDs/ccTLDs): anything not listed
/// in `TWO_LABEL_SUFFIXES` is treated as a one-label TLD.
fn is_two_label_suffix(candidate: &str) -> bool {
    TWO_LABEL_SUFFIXES.contains(&candidate)
}

/// Resolve the eTLD+1 ("registrable domain") of a lower-cased host.
///
/// Falls back to the host itself when it has fewer than two labels (e.g.
/// `localhost`, a bare IP literal).
#[must_use]
pub fn etld_plus_one(host: &str) -> String {
    let host = host.trim_end_matches('.');
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 {
        return host.to_string();
    }

    let last_two = format!("{}.{}", labels[labels.len() - 2], labels[labels.len() - 1]);
    if labels.len() >= 3 && is_two_label_suffix(&last_two) {
        format!(
            "{}.{}.{}",
            labels[labels.len() - 3],
            labels[labels.len() - 2],
            labels[labels.len() - 1]
        )
    } else {
        last_two
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_gtld_host() {
        assert_eq!(etld_plus_one("api.openai.com"), "openai.com");
        assert_eq!(etld_plus_one("openai.com"), "openai.com");
    }

    #[test]
    fn two_label_suffix_host() {
        assert_eq!(etld_plus_one("www.example.co.uk"), "example.co.uk");
        assert_eq!(etld_plus_one("deep.sub.example.co.uk"), "example.co.uk");
    }

    #[test]
    fn single_label_host_is_returned_as_is() {
        assert_eq!(etld_plus_one("localhost"), "localhost");
    }

    #[test]
    fn trailing_dot_is_trimmed() {
        assert_eq!(etld_plus_one("api.openai.com."), "openai.com");
    }
}
