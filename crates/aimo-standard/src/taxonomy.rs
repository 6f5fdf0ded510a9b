//! Loads and validates the 8-dimension taxonomy dictionary from Standard
//! artifacts. The English dictionary is the authoritative source of valid
//! codes; only `status = active` rows are loaded.

use aimo_core::model::Dimension;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize)]
struct TaxonomyRow {
    code: String,
    dimension: String,
    dimension_name: String,
    label: String,
    definition: String,
    status: String,
    introduced_in: String,
    #[serde(default)]
    scope_notes: String,
    #[serde(default)]
    examples: String,
}

#[derive(Debug, Clone)]
pub struct TaxonomyCode {
    pub code: String,
    pub dimension: String,
    pub dimension_name: String,
    pub label: String,
    pub definition: String,
    pub status: String,
    pub introduced_in: String,
    pub scope_notes: String,
    pub examples: Vec<String>,
}

#[derive(Debug, Error)]
pub enum TaxonomyLoadError {
    #[error("taxonomy dictionary (English) not found under {0}")]
    DictionaryNotFound(Utf8PathBuf),
    #[error("failed to read taxonomy dictionary: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse taxonomy dictionary: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Clone, Default)]
pub struct TaxonomyDictionary {
    codes_by_dimension: HashMap<Dimension, Vec<TaxonomyCode>>,
    all_codes: HashMap<String, TaxonomyCode>,
}

impl TaxonomyDictionary {
    /// Locates `artifacts/taxonomy/current/en/taxonomy_dictionary.csv` under
    /// an already-synced cache directory and loads active codes from it.
    pub fn load(artifacts_dir: &Utf8Path) -> Result<Self, TaxonomyLoadError> {
        let csv_path = find_taxonomy_csv(artifacts_dir)?;
        let mut reader = csv::Reader::from_path(&csv_path)?;

        let mut codes_by_dimension: HashMap<Dimension, Vec<TaxonomyCode>> = HashMap::new();
        let mut all_codes = HashMap::new();

        for record in reader.deserialize::<TaxonomyRow>() {
            let row = record?;
            if row.status != "active" {
                continue;
            }
            let Some(dim) = dimension_from_prefix(&row.dimension) else {
                continue;
            };
            let code = TaxonomyCode {
                code: row.code.clone(),
                dimension: row.dimension,
                dimension_name: row.dimension_name,
                label: row.label,
                definition: row.definition,
                status: row.status,
                introduced_in: row.introduced_in,
                scope_notes: row.scope_notes,
                examples: row.examples.split('|').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect(),
            };
            codes_by_dimension.entry(dim).or_default().push(code.clone());
            all_codes.insert(row.code, code);
        }

        Ok(TaxonomyDictionary { codes_by_dimension, all_codes })
    }

    #[must_use]
    pub fn allowed_codes(&self, dimension: Dimension) -> Vec<&str> {
        self.codes_by_dimension.get(&dimension).map(|v| v.iter().map(|c| c.code.as_str()).collect()).unwrap_or_default()
    }

    #[must_use]
    pub fn code_info(&self, code: &str) -> Option<&TaxonomyCode> {
        self.all_codes.get(code)
    }

    #[must_use]
    pub fn is_known_code(&self, code: &str) -> bool {
        self.all_codes.contains_key(code)
    }

    #[must_use]
    pub fn total_codes(&self) -> usize {
        self.all_codes.len()
    }
}

fn dimension_from_prefix(prefix: &str) -> Option<Dimension> {
    Dimension::all().into_iter().find(|d| d.as_prefix() == prefix)
}

fn find_taxonomy_csv(artifacts_dir: &Utf8Path) -> Result<Utf8PathBuf, TaxonomyLoadError> {
    let candidate = artifacts_dir.join("artifacts").join("taxonomy").join("current").join("en").join("taxonomy_dictionary.csv");
    if candidate.exists() {
        return Ok(candidate);
    }
    if let Some(found) = search_recursive(artifacts_dir) {
        return Ok(found);
    }
    Err(TaxonomyLoadError::DictionaryNotFound(artifacts_dir.to_path_buf()))
}

fn search_recursive(dir: &Utf8Path) -> Option<Utf8PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        let path = Utf8PathBuf::from_path_buf(entry.path()).ok()?;
        if path.is_dir() {
            if let Some(found) = search_recursive(&path) {
                return Some(found);
            }
        } else if path.file_name() == Some("taxonomy_dictionary.csv") && path.as_str().contains("/en/") {
            return Some(path);
        }
    }
    None
}
