//! JSON Schema every rule is validated against at load time (`spec.md` §4.6
//! "validated at load time against a JSON Schema").

pub const RULE_SCHEMA_JSON: &str = r#"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "type": "object",
  "required": ["rule_id", "rule_version", "priority", "service_name", "category", "usage_type", "default_risk", "taxonomy_codes", "match"],
  "properties": {
    "rule_id": { "type": "string", "minLength": 1 },
    "rule_version": { "type": "string", "minLength": 1 },
    "enabled": { "type": "boolean" },
    "priority": { "type": "integer", "minimum": 0 },
    "service_name": { "type": "string", "minLength": 1 },
    "category": { "type": "string", "minLength": 1 },
    "usage_type": { "type": "string", "minLength": 1 },
    "default_risk": { "type": "string", "enum": ["low", "medium", "high", "critical"] },
    "taxonomy_codes": {
      "type": "object",
      "properties": {
        "fs": { "type": "array", "items": { "type": "string" } },
        "im": { "type": "array", "items": { "type": "string" } },
        "uc": { "type": "array", "items": { "type": "string" } },
        "dt": { "type": "array", "items": { "type": "string" } },
        "ch": { "type": "array", "items": { "type": "string" } },
        "rs": { "type": "array", "items": { "type": "string" } },
        "ev": { "type": "array", "items": { "type": "string" } },
        "ob": { "type": "array", "items": { "type": "string" } }
      }
    },
    "match": {
      "type": "object",
      "properties": {
        "url_signatures": { "type": "array", "items": { "type": "string" } },
        "domain_exact": { "type": "array", "items": { "type": "string" } },
        "domain_suffixes": { "type": "array", "items": { "type": "string" } },
        "path_prefix": { "type": "array", "items": { "type": "string" } },
        "url_regex": { "type": "array", "items": { "type": "string" } }
      }
    }
  }
}"#;
