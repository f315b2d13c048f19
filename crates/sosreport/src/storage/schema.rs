//! `SQLite` schema for the local report store.

/// Reports, one row per submission. `images` holds a JSON array so that
/// failed-upload `null` slots keep their positions.
pub const CREATE_REPORTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS reports (
    id TEXT PRIMARY KEY,
    collection TEXT NOT NULL,
    call_time TEXT NOT NULL,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    caller_name TEXT NOT NULL,
    caller_number TEXT NOT NULL,
    distress_type TEXT NOT NULL,
    message TEXT NOT NULL,
    voice_note TEXT,
    images TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// Listing scans one collection newest first.
pub const CREATE_CALL_TIME_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_reports_collection_call_time
    ON reports(collection, call_time DESC)
";

/// Key-value pairs, currently only the schema version.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_REPORTS_TABLE,
    CREATE_CALL_TIME_INDEX,
    CREATE_METADATA_TABLE,
];
