use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleLoadError {
    #[error("failed to read rule file {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },

    #[error("failed to parse rule file {path} as TOML: {source}")]
    Toml { path: String, #[source] source: toml::de::Error },

    #[error("rule '{rule_id}' in {path} failed schema validation: {reason}")]
    SchemaInvalid { path: String, rule_id: String, reason: String },

    #[error("invalid url_regex in rule '{rule_id}': {source}")]
    BadRegex { rule_id: String, #[source] source: regex::Error },

    #[error("duplicate rule_id '{rule_id}' across rule files")]
    DuplicateRuleId { rule_id: String },
}
