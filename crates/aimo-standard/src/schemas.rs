//! Loads JSON Schemas from Standard artifacts, used to validate Evidence
//! Bundle documents (`spec.md` §4.2, §4.10).

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use thiserror::Error;

/// Known schema names and their artifact filenames.
const KNOWN_SCHEMAS: &[(&str, &str)] = &[
    ("evidence_pack_manifest", "evidence_pack_manifest.schema.json"),
    ("aimo_ev", "aimo-ev.schema.json"),
    ("aimo_dictionary", "aimo-dictionary.schema.json"),
    ("aimo_standard", "aimo-standard.schema.json"),
    ("shadow_ai_discovery", "shadow-ai-discovery.schema.json"),
    ("agent_activity", "agent-activity.schema.json"),
];

#[derive(Debug, Error)]
pub enum SchemaLoadError {
    #[error("schema '{0}' not found under the Standard artifact tree")]
    NotFound(String),
    #[error("failed to read schema file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse schema as JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub struct SchemaLoader {
    schema_dir: Option<Utf8PathBuf>,
    cache: RefCell<HashMap<String, Value>>,
}

impl SchemaLoader {
    #[must_use]
    pub fn new(artifacts_dir: &Utf8Path) -> Self {
        SchemaLoader {
            schema_dir: find_schema_dir(artifacts_dir),
            cache: RefCell::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn schema_dir(&self) -> Option<&Utf8Path> {
        self.schema_dir.as_deref()
    }

    #[must_use]
    pub fn list_available_schemas(&self) -> Vec<String> {
        let Some(dir) = &self.schema_dir else { return Vec::new() };
        let Ok(entries) = std::fs::read_dir(dir) else { return Vec::new() };
        let mut names: Vec<String> = entries
            .flatten()
            .filter_map(|e| {
                let path = Utf8PathBuf::from_path_buf(e.path()).ok()?;
                let name = path.file_name()?;
                name.strip_suffix(".schema.json").map(|s| s.replace('-', "_"))
            })
            .collect();
        names.sort();
        names
    }

    /// Loads a schema by known name, filename, or `<name>.schema.json`.
    pub fn load(&self, name_or_path: &str) -> Result<Value, SchemaLoadError> {
        if let Some(cached) = self.cache.borrow().get(name_or_path) {
            return Ok(cached.clone());
        }
        let path = self.resolve_path(name_or_path).ok_or_else(|| SchemaLoadError::NotFound(name_or_path.to_string()))?;
        let content = std::fs::read_to_string(&path)?;
        let value: Value = serde_json::from_str(&content)?;
        self.cache.borrow_mut().insert(name_or_path.to_string(), value.clone());
        Ok(value)
    }

    fn resolve_path(&self, name_or_path: &str) -> Option<Utf8PathBuf> {
        let dir = self.schema_dir.as_ref()?;

        if let Some((_, filename)) = KNOWN_SCHEMAS.iter().find(|(name, _)| *name == name_or_path) {
            let path = dir.join(filename);
            if path.exists() {
                return Some(path);
            }
        }
        let direct = dir.join(name_or_path);
        if direct.exists() {
            return Some(direct);
        }
        let with_suffix = dir.join(format!("{name_or_path}.schema.json"));
        if with_suffix.exists() {
            return Some(with_suffix);
        }
        let hyphenated = dir.join(format!("{}.schema.json", name_or_path.replace('_', "-")));
        if hyphenated.exists() {
            return Some(hyphenated);
        }
        None
    }
}

fn find_schema_dir(artifacts_dir: &Utf8Path) -> Option<Utf8PathBuf> {
    let preferred = artifacts_dir.join("schemas").join("jsonschema");
    if preferred.exists() {
        return Some(preferred);
    }
    search_for_dir_named(artifacts_dir, "jsonschema").or_else(|| search_for_schema_parent(artifacts_dir))
}

fn search_for_dir_named(dir: &Utf8Path, name: &str) -> Option<Utf8PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        let path = Utf8PathBuf::from_path_buf(entry.path()).ok()?;
        if path.is_dir() {
            if path.file_name() == Some(name) {
                return Some(path);
            }
            if let Some(found) = search_for_dir_named(&path, name) {
                return Some(found);
            }
        }
    }
    None
}

fn search_for_schema_parent(dir: &Utf8Path) -> Option<Utf8PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        let path = Utf8PathBuf::from_path_buf(entry.path()).ok()?;
        if path.is_dir() {
            if let Some(found) = search_for_schema_parent(&path) {
                return Some(found);
            }
        } else if path.as_str().ends_with(".schema.json") {
            return path.parent().map(Utf8Path::to_path_buf);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_known_schema_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let schema_dir = root.join("schemas").join("jsonschema");
        std::fs::create_dir_all(&schema_dir).unwrap();
        std::fs::write(schema_dir.join("evidence_pack_manifest.schema.json"), r#"{"type":"object"}"#).unwrap();

        let loader = SchemaLoader::new(&root);
        let schema = loader.load("evidence_pack_manifest").unwrap();
        assert_eq!(schema["type"], "object");
    }

    #[test]
    fn missing_schema_dir_yields_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let loader = SchemaLoader::new(&root);
        assert!(matches!(loader.load("evidence_pack_manifest"), Err(SchemaLoadError::NotFound(_))));
    }

    #[test]
    fn list_available_schemas_reports_sorted_names() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let schema_dir = root.join("schemas").join("jsonschema");
        std::fs::create_dir_all(&schema_dir).unwrap();
        std::fs::write(schema_dir.join("shadow-ai-discovery.schema.json"), "{}").unwrap();
        std::fs::write(schema_dir.join("agent-activity.schema.json"), "{}").unwrap();

        let loader = SchemaLoader::new(&root);
        assert_eq!(loader.list_available_schemas(), vec!["agent_activity", "shadow_ai_discovery"]);
    }
}
