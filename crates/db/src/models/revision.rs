//! Revision row model.

use folio_core::revision::Revision;
use folio_core::types::{DbId, Timestamp};
use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;

/// A row from the `revisions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RevisionRow {
    pub id: DbId,
    pub entity_type: String,
    pub entity_id: DbId,
    pub action: String,
    pub description: Option<String>,
    pub metadata: Value,
    pub is_published: bool,
    pub data: Value,
    pub created_at: Timestamp,
}

impl From<RevisionRow> for Revision {
    fn from(row: RevisionRow) -> Self {
        Revision {
            id: row.id,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            action: row.action,
            description: row.description,
            metadata: into_object(row.metadata),
            is_published: row.is_published,
            data: into_object(row.data),
            created_at: row.created_at,
        }
    }
}

/// JSONB columns written by the engine always hold objects.
fn into_object(value: Value) -> serde_json::Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    }
}
