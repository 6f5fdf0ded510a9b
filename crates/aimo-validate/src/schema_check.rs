//! Fallback schema-structure validation of `evidence_pack_manifest.json`
//! against the Standard's manifest schema (`spec.md` §4.10 step 2a).

use jsonschema::Draft;
use serde_json::Value;

/// Compiles `schema` and validates `document` against it, returning each
/// failure as a display string. Schema-structure warnings are returned
/// alongside content errors — callers that only care about content should
/// filter by message if the external CLI's strictness needs segregating.
pub fn validate_against_schema(schema: &Value, document: &Value) -> Vec<String> {
    let validator = match jsonschema::options().with_draft(Draft::Draft202012).build(schema) {
        Ok(v) => v,
        Err(err) => return vec![format!("invalid manifest schema: {err}")],
    };
    validator.iter_errors(document).map(|err| err.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_document_has_no_errors() {
        let schema = json!({"type": "object", "required": ["run_id"]});
        let document = json!({"run_id": "abc"});
        assert!(validate_against_schema(&schema, &document).is_empty());
    }

    #[test]
    fn missing_required_field_is_reported() {
        let schema = json!({"type": "object", "required": ["run_id"]});
        let document = json!({});
        assert!(!validate_against_schema(&schema, &document).is_empty());
    }
}
