//! Per-vendor field mapping records (`spec.md` §4.3, §9 "Dynamic dispatch").
//!
//! A vendor mapping is a plain, `serde`-deserializable TOML record — not a
//! trait object or subclass. Each canonical slot names an ordered list of
//! candidate source field names; the first non-empty, type-valid value in a
//! row wins.

use aimo_core::model::Action;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("failed to read vendor mapping file {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("failed to parse vendor mapping file {path}: {source}")]
    Parse { path: String, source: toml::de::Error },
}

/// Candidate field names for one canonical slot, tried in order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldCandidates {
    #[serde(default)]
    pub event_time: Vec<String>,
    #[serde(default)]
    pub bytes_sent: Vec<String>,
    #[serde(default)]
    pub bytes_received: Vec<String>,
    #[serde(default)]
    pub url_full: Vec<String>,
    #[serde(default)]
    pub dest_host: Vec<String>,
    #[serde(default)]
    pub user_id: Vec<String>,
    #[serde(default)]
    pub user_dept: Vec<String>,
    #[serde(default)]
    pub device_id: Vec<String>,
    #[serde(default)]
    pub src_ip: Vec<String>,
    #[serde(default)]
    pub http_method: Vec<String>,
    #[serde(default)]
    pub status_code: Vec<String>,
    #[serde(default)]
    pub app_name: Vec<String>,
    #[serde(default)]
    pub app_category: Vec<String>,
    #[serde(default)]
    pub content_type: Vec<String>,
    #[serde(default)]
    pub user_agent: Vec<String>,
    #[serde(default)]
    pub raw_event_id: Vec<String>,
}

/// Declarative mapping from vendor-specific action strings to the canonical
/// `Action` enum, with a declared default (`spec.md` §4.3 item 4).
#[derive(Debug, Clone, Deserialize)]
pub struct ActionMap {
    #[serde(default = "default_action_str")]
    pub default: String,
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub block: Vec<String>,
}

fn default_action_str() -> String {
    "unknown".to_string()
}

impl ActionMap {
    #[must_use]
    pub fn resolve(&self, raw: &str) -> Action {
        let lower = raw.to_ascii_lowercase();
        if self.allow.iter().any(|v| v.eq_ignore_ascii_case(&lower)) {
            return Action::Allow;
        }
        if self.block.iter().any(|v| v.eq_ignore_ascii_case(&lower)) {
            return Action::Block;
        }
        match self.default.as_str() {
            "allow" => Action::Allow,
            "block" => Action::Block,
            _ => Action::Unknown,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VendorMapping {
    pub vendor: String,
    pub log_type: String,
    pub fields: FieldCandidates,
    pub action_map: ActionMap,
}

impl VendorMapping {
    pub fn load_from_path(path: &Path) -> Result<Self, MappingError> {
        let text = std::fs::read_to_string(path).map_err(|source| MappingError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| MappingError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Try each candidate field name in order against a row, returning the
    /// first present, non-empty value.
    #[must_use]
    pub fn first_present<'a>(row: &'a HashMap<String, String>, candidates: &[String]) -> Option<&'a str> {
        for name in candidates {
            if let Some(value) = row.get(name) {
                if !value.is_empty() {
                    return Some(value.as_str());
                }
            }
        }
        None
    }
}
