//! Table DDL for the single SQLite store backing the Persistence Gateway.

pub const CREATE_TABLES_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS runs (
    run_id TEXT PRIMARY KEY,
    run_key TEXT NOT NULL,
    input_manifest_hash TEXT NOT NULL,
    versions_json TEXT NOT NULL,
    status TEXT NOT NULL,
    last_completed_stage INTEGER NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT
);

CREATE TABLE IF NOT EXISTS input_files (
    file_id TEXT PRIMARY KEY,
    run_id TEXT NOT NULL,
    file_path TEXT NOT NULL,
    file_size INTEGER NOT NULL,
    file_hash TEXT NOT NULL,
    vendor TEXT NOT NULL,
    log_type TEXT NOT NULL,
    row_count INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_input_files_run_id ON input_files(run_id);

CREATE TABLE IF NOT EXISTS signature_stats (
    run_id TEXT NOT NULL,
    url_signature TEXT NOT NULL,
    norm_host TEXT NOT NULL,
    norm_path_template TEXT NOT NULL,
    bytes_sent_bucket TEXT NOT NULL,
    access_count INTEGER NOT NULL,
    unique_users INTEGER NOT NULL,
    bytes_sent_sum INTEGER NOT NULL,
    bytes_sent_max INTEGER NOT NULL,
    first_seen TEXT NOT NULL,
    last_seen TEXT NOT NULL,
    candidate_flags TEXT NOT NULL,
    PRIMARY KEY (run_id, url_signature)
);

CREATE TABLE IF NOT EXISTS classification_cache (
    url_signature TEXT PRIMARY KEY,
    service_name TEXT,
    category TEXT,
    usage_type TEXT,
    risk_level TEXT,
    confidence REAL NOT NULL,
    rationale_short TEXT,
    classification_source TEXT NOT NULL,
    taxonomy_json TEXT NOT NULL,
    signature_version TEXT NOT NULL,
    rule_version TEXT NOT NULL,
    prompt_version TEXT NOT NULL,
    taxonomy_schema_version TEXT NOT NULL,
    model TEXT,
    status TEXT NOT NULL,
    is_human_verified INTEGER NOT NULL,
    failure_count INTEGER NOT NULL,
    error_type TEXT,
    error_reason TEXT,
    last_error_at TEXT,
    analysis_date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS performance_metrics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id TEXT NOT NULL,
    stage TEXT NOT NULL,
    metric_name TEXT NOT NULL,
    value REAL NOT NULL,
    unit TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    recorded_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS api_costs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id TEXT NOT NULL,
    provider TEXT NOT NULL,
    model TEXT NOT NULL,
    request_count INTEGER NOT NULL,
    input_tokens INTEGER NOT NULL,
    output_tokens INTEGER NOT NULL,
    cost_usd_estimated REAL NOT NULL
);
"#;
