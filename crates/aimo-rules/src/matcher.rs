//! Deterministic priority-ordered matching (`spec.md` §4.6 "Match priority").

use crate::loader::CompiledRule;
use aimo_core::model::{ClassificationSource, TaxonomyAssignment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchReason {
    SignatureExact,
    HostPathExact,
    HostPathRegex,
    HostPathSuffix,
    HostExact,
    HostSuffix,
}

impl MatchReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            MatchReason::SignatureExact => "signature_exact",
            MatchReason::HostPathExact => "host+path_exact",
            MatchReason::HostPathRegex => "host+path_regex",
            MatchReason::HostPathSuffix => "host+path_suffix",
            MatchReason::HostExact => "host_exact",
            MatchReason::HostSuffix => "host_suffix",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuleClassification {
    pub service_name: String,
    pub category: String,
    pub usage_type: String,
    pub risk_level: String,
    pub taxonomy: TaxonomyAssignment,
    pub classification_source: ClassificationSource,
    pub confidence: f32,
    pub match_reason: MatchReason,
    pub rule_id: String,
    pub rule_version: String,
}

pub struct Signature<'a> {
    pub url_signature: &'a str,
    pub norm_host: &'a str,
    pub norm_path_template: &'a str,
}

/// Tries each priority tier in order, returning the first (and only)
/// winning rule. Within a tier the lowest `priority` wins; ties break by
/// lexicographically-smallest `rule_id`.
#[must_use]
pub fn classify<'a>(sig: &Signature<'_>, rules: &'a [CompiledRule]) -> Option<RuleClassification> {
    if let Some((rule, reason)) = match_signature_exact(sig, rules) {
        return Some(to_classification(rule, reason));
    }
    if let Some((rule, reason)) = match_host_and_path(sig, rules) {
        return Some(to_classification(rule, reason));
    }
    if let Some((rule, reason)) = match_host_only(sig, rules) {
        return Some(to_classification(rule, reason));
    }
    None
}

fn best<'a>(candidates: Vec<(&'a CompiledRule, MatchReason)>) -> Option<(&'a CompiledRule, MatchReason)> {
    candidates.into_iter().min_by(|(a, _), (b, _)| a.rule.priority.cmp(&b.rule.priority).then_with(|| a.rule.rule_id.cmp(&b.rule.rule_id)))
}

fn match_signature_exact<'a>(sig: &Signature<'_>, rules: &'a [CompiledRule]) -> Option<(&'a CompiledRule, MatchReason)> {
    let candidates: Vec<_> = rules
        .iter()
        .filter(|r| r.rule.match_block.url_signatures.iter().any(|s| s == sig.url_signature))
        .map(|r| (r, MatchReason::SignatureExact))
        .collect();
    best(candidates)
}

fn match_host_and_path<'a>(sig: &Signature<'_>, rules: &'a [CompiledRule]) -> Option<(&'a CompiledRule, MatchReason)> {
    let exact_candidates: Vec<_> = rules
        .iter()
        .filter(|r| r.rule.match_block.has_path_constraint())
        .filter(|r| r.rule.match_block.domain_exact.iter().any(|h| h == sig.norm_host))
        .filter_map(|r| path_match_reason(sig, r))
        .collect();
    if let Some(winner) = best(exact_candidates) {
        return Some(winner);
    }

    let suffix_candidates: Vec<_> = rules
        .iter()
        .filter(|r| r.rule.match_block.has_path_constraint())
        .filter(|r| domain_suffix_matches(r, sig.norm_host))
        .filter_map(|r| path_match_reason(sig, r))
        .collect();
    best(suffix_candidates)
}

fn path_match_reason<'a>(sig: &Signature<'_>, rule: &'a CompiledRule) -> Option<(&'a CompiledRule, MatchReason)> {
    let is_exact_host = rule.rule.match_block.domain_exact.iter().any(|h| h == sig.norm_host);
    if rule.rule.match_block.path_prefix.iter().any(|p| sig.norm_path_template.starts_with(p.as_str())) {
        let reason = if is_exact_host { MatchReason::HostPathExact } else { MatchReason::HostPathSuffix };
        return Some((rule, reason));
    }
    if rule.url_regexes.iter().any(|re| re.is_match(sig.norm_path_template)) {
        return Some((rule, MatchReason::HostPathRegex));
    }
    None
}

fn match_host_only<'a>(sig: &Signature<'_>, rules: &'a [CompiledRule]) -> Option<(&'a CompiledRule, MatchReason)> {
    let exact_candidates: Vec<_> = rules
        .iter()
        .filter(|r| !r.rule.match_block.has_path_constraint())
        .filter(|r| r.rule.match_block.domain_exact.iter().any(|h| h == sig.norm_host))
        .map(|r| (r, MatchReason::HostExact))
        .collect();
    if let Some(winner) = best(exact_candidates) {
        return Some(winner);
    }

    let suffix_candidates: Vec<_> = rules
        .iter()
        .filter(|r| !r.rule.match_block.has_path_constraint())
        .filter(|r| domain_suffix_matches(r, sig.norm_host))
        .map(|r| (r, MatchReason::HostSuffix))
        .collect();
    best(suffix_candidates)
}

fn domain_suffix_matches(rule: &CompiledRule, norm_host: &str) -> bool {
    rule.rule.match_block.domain_suffixes.iter().any(|suffix| norm_host == suffix || norm_host.ends_with(&format!(".{suffix}")))
}

fn to_classification(rule: &CompiledRule, reason: MatchReason) -> RuleClassification {
    RuleClassification {
        service_name: rule.rule.service_name.clone(),
        category: rule.rule.category.clone(),
        usage_type: rule.rule.usage_type.clone(),
        risk_level: rule.rule.default_risk.clone(),
        taxonomy: rule.rule.taxonomy_codes.to_assignment(),
        classification_source: ClassificationSource::Rule,
        confidence: 1.0,
        match_reason: reason,
        rule_id: rule.rule.rule_id.clone(),
        rule_version: rule.rule.rule_version.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_rules_dir;

    fn write_rule(dir: &std::path::Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn domain_suffix_rule_matches_s4_scenario() {
        let dir = tempfile::tempdir().unwrap();
        write_rule(
            dir.path(),
            "genai.toml",
            r#"
[[rule]]
rule_id = "genai-openai-001"
rule_version = "1.0"
priority = 10
service_name = "ChatGPT / OpenAI"
category = "GenAI"
usage_type = "genai"
default_risk = "high"

[rule.taxonomy_codes]
fs = ["FS-001"]
im = ["IM-001"]
uc = ["UC-001"]
dt = ["DT-001"]
ch = ["CH-001"]
rs = ["RS-001"]
ev = ["EV-001"]

[rule.match]
domain_suffixes = ["openai.com"]
"#,
        );
        let utf8_dir = camino::Utf8Path::from_path(dir.path()).unwrap();
        let rules = load_rules_dir(utf8_dir).unwrap();

        let sig = Signature { url_signature: "sig-abc", norm_host: "api.openai.com", norm_path_template: "/v1/chat/completions" };
        let result = classify(&sig, &rules).expect("expected a match");
        assert_eq!(result.service_name, "ChatGPT / OpenAI");
        assert_eq!(result.usage_type, "genai");
        assert_eq!(result.risk_level, "high");
        assert_eq!(result.match_reason, MatchReason::HostSuffix);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn exact_signature_beats_host_rules() {
        let dir = tempfile::tempdir().unwrap();
        write_rule(
            dir.path(),
            "both.toml",
            r#"
[[rule]]
rule_id = "host-rule"
rule_version = "1.0"
priority = 1
service_name = "HostService"
category = "C"
usage_type = "u"
default_risk = "low"
[rule.taxonomy_codes]
fs = ["FS-001"]
im = ["IM-001"]
uc = ["UC-001"]
dt = ["DT-001"]
ch = ["CH-001"]
rs = ["RS-001"]
ev = ["EV-001"]
[rule.match]
domain_exact = ["example.com"]

[[rule]]
rule_id = "sig-rule"
rule_version = "1.0"
priority = 99
service_name = "SigService"
category = "C"
usage_type = "u"
default_risk = "low"
[rule.taxonomy_codes]
fs = ["FS-002"]
im = ["IM-001"]
uc = ["UC-001"]
dt = ["DT-001"]
ch = ["CH-001"]
rs = ["RS-001"]
ev = ["EV-001"]
[rule.match]
url_signatures = ["sig-exact"]
"#,
        );
        let utf8_dir = camino::Utf8Path::from_path(dir.path()).unwrap();
        let rules = load_rules_dir(utf8_dir).unwrap();

        let sig = Signature { url_signature: "sig-exact", norm_host: "example.com", norm_path_template: "/" };
        let result = classify(&sig, &rules).unwrap();
        assert_eq!(result.service_name, "SigService");
        assert_eq!(result.match_reason, MatchReason::SignatureExact);
    }
}
