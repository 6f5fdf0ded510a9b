//! Errors raised while validating an emitted Evidence Bundle.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("failed to read bundle file {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("failed to parse bundle file {path} as JSON: {source}")]
    Parse { path: String, source: serde_json::Error },
    #[error(transparent)]
    Schema(#[from] aimo_standard::schemas::SchemaLoadError),
}
