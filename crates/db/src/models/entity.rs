//! Decoding versioned entity rows.

use std::collections::BTreeMap;

use folio_core::entity::{empty_value, ContentEntity, FieldSlots};
use folio_core::schema::{EntityKind, EntitySchema};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::Row;

/// Bookkeeping columns shared by every versioned table, after the field
/// columns.
const TRAILING_COLUMNS: &[&str] = &[
    "last_draft_at",
    "published_at",
    "lock_version",
    "created_at",
    "updated_at",
];

/// Column list for a versioned table: `id`, then each field's live and draft
/// column, then the bookkeeping columns.
pub fn columns(schema: &EntitySchema) -> String {
    let mut columns = vec!["id"];
    for spec in schema.fields {
        columns.push(spec.column);
        columns.push(spec.draft_column);
    }
    columns.extend_from_slice(TRAILING_COLUMNS);
    columns.join(", ")
}

/// Decode a row selected with [`columns`].
pub fn entity_from_row(kind: EntityKind, row: &PgRow) -> Result<ContentEntity, sqlx::Error> {
    let schema = kind.schema();
    let mut fields = BTreeMap::new();
    for spec in schema.fields {
        let live: Option<Value> = row.try_get(spec.column)?;
        let draft: Option<Value> = row.try_get(spec.draft_column)?;
        fields.insert(
            spec.name.to_string(),
            FieldSlots {
                live: live.unwrap_or_else(|| empty_value(spec)),
                draft: draft.filter(|d| !d.is_null()),
            },
        );
    }
    Ok(ContentEntity {
        id: row.try_get("id")?,
        kind,
        fields,
        last_draft_at: row.try_get("last_draft_at")?,
        published_at: row.try_get("published_at")?,
        lock_version: row.try_get("lock_version")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
