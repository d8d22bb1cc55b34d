//! Repository for the `revisions` table.
//!
//! Revisions are immutable: there is no update or delete here.

use folio_core::revision::{NewRevision, Revision};
use folio_core::types::DbId;
use serde_json::Value;
use sqlx::PgConnection;

use crate::models::revision::RevisionRow;

/// Column list for revisions queries.
const COLUMNS: &str = "id, entity_type, entity_id, action, description, metadata, \
    is_published, data, created_at";

/// Provides insert and read operations for revisions.
pub struct RevisionRepo;

impl RevisionRepo {
    /// Insert a revision.
    pub async fn create(
        conn: &mut PgConnection,
        input: &NewRevision,
    ) -> Result<Revision, sqlx::Error> {
        let query = format!(
            "INSERT INTO revisions
                (entity_type, entity_id, action, description, metadata, is_published, data)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RevisionRow>(&query)
            .bind(input.entity_type)
            .bind(input.entity_id)
            .bind(&input.action)
            .bind(&input.description)
            .bind(Value::Object(input.metadata.clone()))
            .bind(input.is_published)
            .bind(Value::Object(input.data.clone()))
            .fetch_one(&mut *conn)
            .await
            .map(Revision::from)
    }

    /// Find a revision by its primary key.
    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Revision>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM revisions WHERE id = $1");
        let row = sqlx::query_as::<_, RevisionRow>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.map(Revision::from))
    }

    /// Newest revision of an entity. Revisions written in the same
    /// transaction share `created_at`, so ties fall back to `id`.
    pub async fn find_latest(
        conn: &mut PgConnection,
        entity_type: &str,
        entity_id: DbId,
        published_only: bool,
    ) -> Result<Option<Revision>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM revisions
             WHERE entity_type = $1 AND entity_id = $2 AND ($3 = false OR is_published)
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        );
        let row = sqlx::query_as::<_, RevisionRow>(&query)
            .bind(entity_type)
            .bind(entity_id)
            .bind(published_only)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.map(Revision::from))
    }

    /// List revisions of an entity, newest first.
    pub async fn list_for_entity(
        conn: &mut PgConnection,
        entity_type: &str,
        entity_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Revision>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM revisions
             WHERE entity_type = $1 AND entity_id = $2
             ORDER BY created_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query_as::<_, RevisionRow>(&query)
            .bind(entity_type)
            .bind(entity_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.into_iter().map(Revision::from).collect())
    }
}
