use crate::error::RuleLoadError;
use crate::model::{Rule, RuleFile};
use crate::schema::RULE_SCHEMA_JSON;
use camino::Utf8Path;
use regex::RegexBuilder;
use std::collections::HashSet;

/// A rule with its `url_regex` patterns pre-compiled.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: Rule,
    pub url_regexes: Vec<regex::Regex>,
}

fn schema_validator() -> &'static jsonschema::JSONSchema {
    static VALIDATOR: std::sync::OnceLock<jsonschema::JSONSchema> = std::sync::OnceLock::new();
    VALIDATOR.get_or_init(|| {
        let schema: serde_json::Value = serde_json::from_str(RULE_SCHEMA_JSON).expect("embedded rule schema is valid JSON");
        jsonschema::JSONSchema::compile(&schema).expect("embedded rule schema compiles")
    })
}

/// Loads every `*.toml` rule file directly under `dir` (non-recursive),
/// validating each rule against the schema and skipping incomplete ones.
pub fn load_rules_dir(dir: &Utf8Path) -> Result<Vec<CompiledRule>, RuleLoadError> {
    let mut compiled = Vec::new();
    let mut seen_ids: HashSet<String> = HashSet::new();

    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .map_err(|e| RuleLoadError::Io { path: dir.to_string(), source: e })?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|ext| ext.to_str()) == Some("toml"))
        .collect();
    entries.sort();

    for path in entries {
        let path_str = path.to_string_lossy().to_string();
        let content = std::fs::read_to_string(&path).map_err(|e| RuleLoadError::Io { path: path_str.clone(), source: e })?;
        let file: RuleFile = toml::from_str(&content).map_err(|e| RuleLoadError::Toml { path: path_str.clone(), source: e })?;

        for rule in file.rule {
            if !rule.enabled {
                tracing::debug!(rule_id = %rule.rule_id, "skipping disabled rule");
                continue;
            }
            if !rule.taxonomy_codes.is_complete() {
                tracing::warn!(rule_id = %rule.rule_id, path = %path_str, "rule has incomplete taxonomy_codes, skipping");
                continue;
            }
            if !seen_ids.insert(rule.rule_id.clone()) {
                return Err(RuleLoadError::DuplicateRuleId { rule_id: rule.rule_id });
            }

            let value = serde_json::to_value(&RuleAsJson::from(&rule)).expect("rule serializes to JSON");
            if let Err(first_error) = schema_validator().validate(&value) {
                let reason = first_error.map(|e| e.to_string()).collect::<Vec<_>>().join("; ");
                return Err(RuleLoadError::SchemaInvalid { path: path_str, rule_id: rule.rule_id, reason });
            }

            let mut url_regexes = Vec::with_capacity(rule.match_block.url_regex.len());
            for pattern in &rule.match_block.url_regex {
                let compiled_regex = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| RuleLoadError::BadRegex { rule_id: rule.rule_id.clone(), source })?;
                url_regexes.push(compiled_regex);
            }

            compiled.push(CompiledRule { rule, url_regexes });
        }
    }

    Ok(compiled)
}

/// Thin serde mirror used only to re-serialize a parsed `Rule` back to JSON
/// for schema validation (the TOML and JSON Schema shapes are identical).
#[derive(serde::Serialize)]
struct RuleAsJson<'a> {
    rule_id: &'a str,
    rule_version: &'a str,
    enabled: bool,
    priority: u32,
    service_name: &'a str,
    category: &'a str,
    usage_type: &'a str,
    default_risk: &'a str,
    taxonomy_codes: TaxonomyCodesAsJson<'a>,
    #[serde(rename = "match")]
    match_block: MatchBlockAsJson<'a>,
}

#[derive(serde::Serialize)]
struct TaxonomyCodesAsJson<'a> {
    fs: &'a [String],
    im: &'a [String],
    uc: &'a [String],
    dt: &'a [String],
    ch: &'a [String],
    rs: &'a [String],
    ev: &'a [String],
    ob: &'a [String],
}

#[derive(serde::Serialize)]
struct MatchBlockAsJson<'a> {
    url_signatures: &'a [String],
    domain_exact: &'a [String],
    domain_suffixes: &'a [String],
    path_prefix: &'a [String],
    url_regex: &'a [String],
}

impl<'a> From<&'a Rule> for RuleAsJson<'a> {
    fn from(rule: &'a Rule) -> Self {
        RuleAsJson {
            rule_id: &rule.rule_id,
            rule_version: &rule.rule_version,
            enabled: rule.enabled,
            priority: rule.priority,
            service_name: &rule.service_name,
            category: &rule.category,
            usage_type: &rule.usage_type,
            default_risk: &rule.default_risk,
            taxonomy_codes: TaxonomyCodesAsJson {
                fs: &rule.taxonomy_codes.fs,
                im: &rule.taxonomy_codes.im,
                uc: &rule.taxonomy_codes.uc,
                dt: &rule.taxonomy_codes.dt,
                ch: &rule.taxonomy_codes.ch,
                rs: &rule.taxonomy_codes.rs,
                ev: &rule.taxonomy_codes.ev,
                ob: &rule.taxonomy_codes.ob,
            },
            match_block: MatchBlockAsJson {
                url_signatures: &rule.match_block.url_signatures,
                domain_exact: &rule.match_block.domain_exact,
                domain_suffixes: &rule.match_block.domain_suffixes,
                path_prefix: &rule.match_block.path_prefix,
                url_regex: &rule.match_block.url_regex,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_valid_rule_file() {
        let dir = tempfile::tempdir().unwrap();
        let rules_path = dir.path().join("genai.toml");
        std::fs::write(
            &rules_path,
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
        )
        .unwrap();

        let utf8_dir = camino::Utf8Path::from_path(dir.path()).unwrap();
        let rules = load_rules_dir(utf8_dir).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].rule.rule_id, "genai-openai-001");
    }

    #[test]
    fn skips_incomplete_taxonomy_rule() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("incomplete.toml"),
            r#"
[[rule]]
rule_id = "incomplete-001"
rule_version = "1.0"
priority = 10
service_name = "X"
category = "Y"
usage_type = "z"
default_risk = "low"

[rule.taxonomy_codes]
fs = ["FS-001"]

[rule.match]
domain_exact = ["example.com"]
"#,
        )
        .unwrap();

        let utf8_dir = camino::Utf8Path::from_path(dir.path()).unwrap();
        let rules = load_rules_dir(utf8_dir).unwrap();
        assert!(rules.is_empty());
    }
}
