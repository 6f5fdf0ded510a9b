use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("write queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("flush deadline exceeded after {timeout_ms}ms")]
    FlushTimeout { timeout_ms: u64 },

    #[error("writer thread is no longer running")]
    WriterGone,

    #[error("updatable column list for table '{table}' is empty after excluding protected columns")]
    NoUpdatableColumns { table: &'static str },

    #[error("run_id {run_id} already exists with a different run_key (expected {expected}, found {found})")]
    RunKeyMismatch { run_id: String, expected: String, found: String },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
