//! On-disk rule representation (`spec.md` §4.6 "Rule format").

use aimo_core::model::{Dimension, TaxonomyAssignment};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RuleFile {
    #[serde(default)]
    pub rule: Vec<Rule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub rule_id: String,
    pub rule_version: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub priority: u32,
    pub service_name: String,
    pub category: String,
    pub usage_type: String,
    pub default_risk: String,
    pub taxonomy_codes: TaxonomyCodes,
    #[serde(rename = "match")]
    pub match_block: MatchBlock,
}

fn default_true() -> bool {
    true
}

/// One entry per taxonomy dimension; a rule missing any dimension's codes is
/// incomplete and is skipped at load time (`spec.md` §4.6).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaxonomyCodes {
    #[serde(default)]
    pub fs: Vec<String>,
    #[serde(default)]
    pub im: Vec<String>,
    #[serde(default)]
    pub uc: Vec<String>,
    #[serde(default)]
    pub dt: Vec<String>,
    #[serde(default)]
    pub ch: Vec<String>,
    #[serde(default)]
    pub rs: Vec<String>,
    #[serde(default)]
    pub ev: Vec<String>,
    #[serde(default)]
    pub ob: Vec<String>,
}

impl TaxonomyCodes {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.fs.is_empty()
            && !self.im.is_empty()
            && !self.uc.is_empty()
            && !self.dt.is_empty()
            && !self.ch.is_empty()
            && !self.rs.is_empty()
            && !self.ev.is_empty()
        // ob may be empty — spec.md §3 allows OB cardinality 0.
    }

    #[must_use]
    pub fn to_assignment(&self) -> TaxonomyAssignment {
        let mut assignment = TaxonomyAssignment::default();
        for code in &self.fs {
            assignment.insert(Dimension::Fs, code.clone());
        }
        for code in &self.im {
            assignment.insert(Dimension::Im, code.clone());
        }
        for code in &self.uc {
            assignment.insert(Dimension::Uc, code.clone());
        }
        for code in &self.dt {
            assignment.insert(Dimension::Dt, code.clone());
        }
        for code in &self.ch {
            assignment.insert(Dimension::Ch, code.clone());
        }
        for code in &self.rs {
            assignment.insert(Dimension::Rs, code.clone());
        }
        for code in &self.ev {
            assignment.insert(Dimension::Ev, code.clone());
        }
        for code in &self.ob {
            assignment.insert(Dimension::Ob, code.clone());
        }
        assignment
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchBlock {
    #[serde(default)]
    pub url_signatures: Vec<String>,
    #[serde(default)]
    pub domain_exact: Vec<String>,
    #[serde(default)]
    pub domain_suffixes: Vec<String>,
    #[serde(default)]
    pub path_prefix: Vec<String>,
    #[serde(default)]
    pub url_regex: Vec<String>,
}

impl MatchBlock {
    #[must_use]
    pub fn has_path_constraint(&self) -> bool {
        !self.path_prefix.is_empty() || !self.url_regex.is_empty()
    }
}
