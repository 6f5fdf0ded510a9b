//! Errors raised while assembling or writing an Evidence Bundle.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error(transparent)]
    Persist(#[from] aimo_persistence::PersistError),
    #[error(transparent)]
    AtomicWrite(#[from] aimo_core::atomic_write::AtomicWriteError),
    #[error(transparent)]
    Jcs(#[from] aimo_core::jcs::JcsError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("no taxonomy code available to satisfy required dimension {dimension:?} and no fallback code exists in the Standard's dictionary")]
    NoFallbackCode { dimension: aimo_core::model::Dimension },
    #[error("run {run_id} not found while assembling evidence bundle")]
    RunNotFound { run_id: String },
}
