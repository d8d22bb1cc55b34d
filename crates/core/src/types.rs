/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Canonical versioned-field values keyed by field name, as stored in a
/// revision's `data` column.
pub type Snapshot = serde_json::Map<String, serde_json::Value>;

/// Opaque key-value payload attached to a revision.
pub type Metadata = serde_json::Map<String, serde_json::Value>;
