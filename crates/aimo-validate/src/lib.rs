//! Evidence Bundle Validator (C10): schema, taxonomy cardinality, and
//! file-existence checks over an emitted bundle (`spec.md` §4.10).

pub mod cardinality;
pub mod error;
pub mod file_check;
pub mod schema_check;
pub mod validator;

pub use error::ValidateError;
pub use validator::{validate_bundle, ValidationResult};
