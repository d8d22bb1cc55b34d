//! Integration tests for the revision engine on PostgreSQL.
//!
//! Exercises `PgStorage` through `RevisionEngine` against a real database:
//! - Draft writes leave live columns untouched
//! - Publish promotes drafts and records one published revision
//! - Discard rolls back to the latest published revision
//! - Discard before any publish synthesises an initial revision
//! - Cross-entity revert is rejected without side effects
//! - A failed revision insert rolls back the entity write
//! - Stale copies are refused

#![cfg(feature = "pg-tests")]

use assert_matches::assert_matches;
use folio_core::config::EngineConfig;
use folio_core::engine::RevisionEngine;
use folio_core::entity::ContentEntity;
use folio_core::error::CoreError;
use folio_core::revision::{ACTION_DISCARD_DRAFT, ACTION_INITIAL_PUBLISH, ACTION_PUBLISH};
use folio_core::schema::EntityKind;
use folio_db::repositories::EntityRepo;
use folio_db::PgStorage;
use serde_json::{json, Map, Value};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn engine(pool: &PgPool) -> RevisionEngine<PgStorage> {
    RevisionEngine::new(PgStorage::new(pool.clone()), EngineConfig::default())
}

fn map(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

async fn form_named(engine: &RevisionEngine<PgStorage>, name: &str) -> ContentEntity {
    engine
        .create(EntityKind::Form, &map(json!({ "name": { "en": name } })))
        .await
        .unwrap()
}

async fn revision_count(pool: &PgPool, entity: &ContentEntity) -> i64 {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM revisions WHERE entity_type = $1 AND entity_id = $2",
    )
    .bind(entity.kind.as_str())
    .bind(entity.id)
    .fetch_one(pool)
    .await
    .unwrap();
    count
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_save_draft_writes_draft_column_only(pool: PgPool) {
    let engine = engine(&pool);
    let form = form_named(&engine, "A").await;

    let form = engine
        .save_draft(&form, &map(json!({ "name": "X" })), Some("en"))
        .await
        .unwrap();

    let (live, draft): (Value, Option<Value>) =
        sqlx::query_as("SELECT name, draft_name FROM forms WHERE id = $1")
            .bind(form.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(live, json!({ "en": "A" }));
    assert_eq!(draft, Some(json!({ "en": "X" })));
    assert_eq!(form.lock_version, 1);
    assert_eq!(revision_count(&pool, &form).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_publish_records_published_revision(pool: PgPool) {
    let engine = engine(&pool);
    let form = form_named(&engine, "A").await;
    let form = engine
        .save_draft(&form, &map(json!({ "name": "B" })), None)
        .await
        .unwrap();

    let form = engine.publish(&form).await.unwrap();
    let again = engine.publish(&form).await.unwrap();

    assert_eq!(form, again);
    assert_eq!(form.live("name"), &json!({ "en": "B" }));
    assert!(form.draft("name").is_none());
    assert_eq!(revision_count(&pool, &form).await, 1);
    let latest = engine.latest_published_revision(&form).await.unwrap().unwrap();
    assert_eq!(latest.action, ACTION_PUBLISH);
    assert_eq!(latest.data["name"], json!({ "en": "B" }));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_discard_reverts_to_published(pool: PgPool) {
    let engine = engine(&pool);
    let form = form_named(&engine, "Z").await;
    let form = engine
        .save_draft(&form, &map(json!({ "name": "A" })), None)
        .await
        .unwrap();
    let form = engine.publish(&form).await.unwrap();
    let form = engine
        .save_draft(&form, &map(json!({ "name": "B" })), None)
        .await
        .unwrap();

    let form = engine.discard_draft(&form).await.unwrap();

    assert_eq!(form.live("name"), &json!({ "en": "A" }));
    assert!(form.draft("name").is_none());
    assert!(form.last_draft_at.is_none());
    let latest = engine.latest_revision(&form).await.unwrap().unwrap();
    assert_eq!(latest.action, ACTION_DISCARD_DRAFT);
    assert!(!latest.is_published);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_discard_before_publish_creates_two_revisions(pool: PgPool) {
    let engine = engine(&pool);
    let form = form_named(&engine, "A").await;
    let form = engine
        .save_draft(&form, &map(json!({ "name": "B" })), None)
        .await
        .unwrap();

    let form = engine.discard_draft(&form).await.unwrap();

    assert_eq!(form.live("name"), &json!({ "en": "A" }));
    let history = engine.history(&form, None, None).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].action, ACTION_DISCARD_DRAFT);
    assert_eq!(history[1].action, ACTION_INITIAL_PUBLISH);
    assert!(history[1].is_published);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_cross_entity_revert_is_rejected(pool: PgPool) {
    let engine = engine(&pool);
    let a = form_named(&engine, "A").await;
    let b = form_named(&engine, "B").await;
    let foreign = engine
        .create_revision(&b, ACTION_PUBLISH, None, None, true)
        .await
        .unwrap();

    let err = engine.revert_to_revision(&a, foreign.id).await.unwrap_err();

    assert_matches!(err, CoreError::InvalidRevision { .. });
    let reloaded = engine.find(EntityKind::Form, a.id).await.unwrap();
    assert_eq!(reloaded, a);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_failed_revision_insert_rolls_back_publish(pool: PgPool) {
    let engine = engine(&pool);
    let form = form_named(&engine, "A").await;
    let form = engine
        .save_draft(&form, &map(json!({ "name": "B" })), None)
        .await
        .unwrap();

    // Make every revision insert violate a constraint.
    sqlx::query(
        "ALTER TABLE revisions ADD CONSTRAINT ck_revisions_reject_all CHECK (entity_id < 0)",
    )
    .execute(&pool)
    .await
    .unwrap();

    let err = engine.publish(&form).await.unwrap_err();
    assert_matches!(err, CoreError::Storage(_));

    let mut conn = pool.acquire().await.unwrap();
    let reloaded = EntityRepo::find_by_id(&mut conn, EntityKind::Form, form.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.live("name"), &json!({ "en": "A" }));
    assert_eq!(reloaded.draft("name"), Some(&json!({ "en": "B" })));
    assert_eq!(reloaded.lock_version, form.lock_version);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_stale_copy_is_conflict(pool: PgPool) {
    let engine = engine(&pool);
    let form = form_named(&engine, "A").await;
    engine
        .save_draft(&form, &map(json!({ "name": "B" })), None)
        .await
        .unwrap();

    let err = engine.publish(&form).await.unwrap_err();

    assert_matches!(err, CoreError::Conflict(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_with_drafts(pool: PgPool) {
    let engine = engine(&pool);
    let clean = form_named(&engine, "Clean").await;
    let dirty = form_named(&engine, "Dirty").await;
    engine
        .save_draft(&dirty, &map(json!({ "name": "Draft" })), None)
        .await
        .unwrap();

    let mut conn = pool.acquire().await.unwrap();
    let ids = EntityRepo::list_with_drafts(&mut conn, EntityKind::Form, 10)
        .await
        .unwrap();

    assert_eq!(ids, vec![dirty.id]);
    assert!(!ids.contains(&clean.id));
}
