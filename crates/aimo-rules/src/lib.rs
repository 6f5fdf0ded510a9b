//! Rule Classifier (`spec.md` §4.6): deterministic, confidence-1.0
//! classification of a signature from a priority-ordered set of TOML rules.

pub mod error;
pub mod loader;
pub mod matcher;
pub mod model;
pub mod schema;

pub use error::RuleLoadError;
pub use loader::{load_rules_dir, CompiledRule};
pub use matcher::{classify, MatchReason, RuleClassification, Signature};
