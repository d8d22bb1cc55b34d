//! Repository for the versioned content tables (`forms`, `pages`,
//! `content_blocks`).
//!
//! Column lists come from each kind's schema, so one repository serves every
//! table.

use folio_core::entity::{empty_value, ContentEntity};
use folio_core::schema::EntityKind;
use folio_core::types::{DbId, Snapshot};
use serde_json::Value;
use sqlx::PgConnection;

use crate::models::entity::{columns, entity_from_row};

/// Provides create, read and version-checked update for versioned entities.
pub struct EntityRepo;

impl EntityRepo {
    /// Insert a new entity with the given live values and no draft.
    ///
    /// Fields missing from `live` get their empty value.
    pub async fn create(
        conn: &mut PgConnection,
        kind: EntityKind,
        live: &Snapshot,
    ) -> Result<ContentEntity, sqlx::Error> {
        let schema = kind.schema();
        let field_columns: Vec<&str> = schema.fields.iter().map(|f| f.column).collect();
        let placeholders: Vec<String> = (1..=field_columns.len())
            .map(|i| format!("${i}"))
            .collect();
        let query = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            schema.table,
            field_columns.join(", "),
            placeholders.join(", "),
            columns(schema)
        );
        let mut q = sqlx::query(&query);
        for spec in schema.fields {
            let value = live.get(spec.name).cloned().unwrap_or_else(|| empty_value(spec));
            q = q.bind(value);
        }
        let row = q.fetch_one(&mut *conn).await?;
        entity_from_row(kind, &row)
    }

    /// Find an entity by its ID.
    pub async fn find_by_id(
        conn: &mut PgConnection,
        kind: EntityKind,
        id: DbId,
    ) -> Result<Option<ContentEntity>, sqlx::Error> {
        Self::select(conn, kind, id, false).await
    }

    /// Find an entity by its ID and lock the row until the surrounding
    /// transaction ends (`SELECT ... FOR UPDATE`).
    pub async fn find_for_update(
        conn: &mut PgConnection,
        kind: EntityKind,
        id: DbId,
    ) -> Result<Option<ContentEntity>, sqlx::Error> {
        Self::select(conn, kind, id, true).await
    }

    /// Write every live and draft slot plus the draft/publish timestamps.
    ///
    /// Only applies if the stored `lock_version` equals `entity.lock_version`;
    /// the version is bumped on success. Returns `None` otherwise.
    pub async fn update(
        conn: &mut PgConnection,
        entity: &ContentEntity,
    ) -> Result<Option<ContentEntity>, sqlx::Error> {
        let schema = entity.schema();
        let mut assignments = Vec::with_capacity(schema.fields.len() * 2 + 2);
        let mut param = 1;
        for spec in schema.fields {
            param += 1;
            assignments.push(format!("{} = ${param}", spec.column));
            param += 1;
            assignments.push(format!("{} = ${param}", spec.draft_column));
        }
        assignments.push(format!("last_draft_at = ${}", param + 1));
        assignments.push(format!("published_at = ${}", param + 2));
        let version_param = param + 3;

        let query = format!(
            "UPDATE {} SET {}, lock_version = lock_version + 1, updated_at = NOW() \
             WHERE id = $1 AND lock_version = ${version_param} \
             RETURNING {}",
            schema.table,
            assignments.join(", "),
            columns(schema)
        );

        let mut q = sqlx::query(&query).bind(entity.id);
        for spec in schema.fields {
            let live = entity.live(spec.name).clone();
            let draft: Option<Value> = entity.draft(spec.name).cloned();
            q = q.bind(live).bind(draft);
        }
        let row = q
            .bind(entity.last_draft_at)
            .bind(entity.published_at)
            .bind(entity.lock_version)
            .fetch_optional(&mut *conn)
            .await?;
        row.map(|r| entity_from_row(entity.kind, &r)).transpose()
    }

    /// IDs of entities of `kind` with a pending draft, oldest draft first.
    pub async fn list_with_drafts(
        conn: &mut PgConnection,
        kind: EntityKind,
        limit: i64,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let query = format!(
            "SELECT id FROM {} WHERE last_draft_at IS NOT NULL \
             ORDER BY last_draft_at ASC LIMIT $1",
            kind.schema().table
        );
        let rows: Vec<(DbId,)> = sqlx::query_as(&query)
            .bind(limit)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    async fn select(
        conn: &mut PgConnection,
        kind: EntityKind,
        id: DbId,
        for_update: bool,
    ) -> Result<Option<ContentEntity>, sqlx::Error> {
        let schema = kind.schema();
        let lock = if for_update { " FOR UPDATE" } else { "" };
        let query = format!(
            "SELECT {} FROM {} WHERE id = $1{lock}",
            columns(schema),
            schema.table
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        row.map(|r| entity_from_row(kind, &r)).transpose()
    }
}
