//! Draft/publish/revision reconciliation.
//!
//! Each mutating operation re-reads the entity under lock inside a single
//! storage transaction, refuses to proceed if the caller's copy is stale,
//! and commits the entity write together with any revision it records.

use chrono::Utc;
use serde_json::{Map, Value};

use crate::config::EngineConfig;
use crate::draft;
use crate::entity::{ContentEntity, Versionable};
use crate::error::CoreError;
use crate::revision::{
    action_metadata, NewRevision, Revision, ACTION_DISCARD_DRAFT, ACTION_INITIAL_PUBLISH,
    ACTION_PUBLISH, ACTION_REVERT,
};
use crate::schema::EntityKind;
use crate::store::{RevisionStorage, StorageTx};
use crate::types::{DbId, Metadata, Snapshot};

/// Default page size for revision history.
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// Maximum page size for revision history.
pub const MAX_HISTORY_LIMIT: i64 = 500;

/// Clamp a requested history page size into `1..=MAX_HISTORY_LIMIT`.
pub fn clamp_history_limit(limit: Option<i64>) -> i64 {
    limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT)
}

/// Runs reconciliation operations against a storage backend.
pub struct RevisionEngine<S> {
    storage: S,
    config: EngineConfig,
}

impl<S: RevisionStorage> RevisionEngine<S> {
    pub fn new(storage: S, config: EngineConfig) -> Self {
        Self { storage, config }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Entities ────────────────────────────────────────────────────

    /// Create an entity with the given live values and no draft.
    pub async fn create(
        &self,
        kind: EntityKind,
        live: &Snapshot,
    ) -> Result<ContentEntity, CoreError> {
        let schema = kind.schema();
        for (field, value) in live {
            let spec = schema.require_field(field)?;
            if spec.is_localized() && !value.is_object() {
                return Err(CoreError::Validation(format!(
                    "Field '{field}' of {kind} must be an object of locale to text"
                )));
            }
        }
        let mut tx = self.storage.begin().await?;
        let entity = tx.insert_entity(kind, live).await?;
        tx.commit().await?;
        tracing::debug!(entity_type = %kind, entity_id = entity.id, "Entity created");
        Ok(entity)
    }

    /// Load an entity or fail with [`CoreError::NotFound`].
    pub async fn find(&self, kind: EntityKind, id: DbId) -> Result<ContentEntity, CoreError> {
        let mut tx = self.storage.begin().await?;
        tx.find_entity(kind, id)
            .await?
            .ok_or_else(|| not_found(kind, id))
    }

    // ── Reconciliation ──────────────────────────────────────────────

    /// Write field updates into the draft slots for one locale.
    ///
    /// Never records a revision.
    pub async fn save_draft(
        &self,
        entity: &ContentEntity,
        updates: &Map<String, Value>,
        locale: Option<&str>,
    ) -> Result<ContentEntity, CoreError> {
        let locale = self.config.resolve_locale(locale)?;
        let mut tx = self.storage.begin().await?;
        let mut current = lock_current(&mut tx, entity).await?;

        draft::apply_draft_updates(&mut current, updates, &locale, Utc::now())?;

        let saved = persist(&mut tx, &current).await?;
        tx.commit().await?;

        tracing::debug!(
            entity_type = %saved.kind,
            entity_id = saved.id,
            locale = %locale,
            fields = updates.len(),
            "Draft saved"
        );
        Ok(saved)
    }

    /// Promote pending drafts to the live slots and record a published
    /// revision. Returns the entity unchanged when there is nothing to
    /// publish.
    pub async fn publish(&self, entity: &ContentEntity) -> Result<ContentEntity, CoreError> {
        let mut tx = self.storage.begin().await?;
        let mut current = lock_current(&mut tx, entity).await?;

        if !draft::has_draft_changes(&current) {
            return Ok(current);
        }

        let now = Utc::now();
        let promoted = draft::promote_drafts(&mut current);
        current.published_at = Some(now);
        let published = persist(&mut tx, &current).await?;

        let revision = NewRevision::capture(
            &published,
            ACTION_PUBLISH,
            None,
            action_metadata(ACTION_PUBLISH, now),
            true,
        )?;
        let revision = tx.insert_revision(&revision).await?;
        tx.commit().await?;

        tracing::info!(
            entity_type = %published.kind,
            entity_id = published.id,
            revision_id = revision.id,
            fields = ?promoted,
            "Draft published"
        );
        Ok(published)
    }

    /// Throw away pending drafts.
    ///
    /// If the entity was published before, its live slots are also rolled
    /// back to the latest published revision. Otherwise the current live
    /// state is recorded as the initial published revision.
    pub async fn discard_draft(&self, entity: &ContentEntity) -> Result<ContentEntity, CoreError> {
        let mut tx = self.storage.begin().await?;
        let mut current = lock_current(&mut tx, entity).await?;
        let now = Utc::now();

        let published = tx
            .latest_revision(current.entity_type(), current.id, true)
            .await?;
        match published {
            Some(revision) => {
                revision.ensure_owned_by(&current)?;
                current.apply_versioned_field_values(&revision.data);
            }
            None => {
                let initial = NewRevision::capture(
                    &current,
                    ACTION_INITIAL_PUBLISH,
                    None,
                    action_metadata(ACTION_INITIAL_PUBLISH, now),
                    true,
                )?;
                tx.insert_revision(&initial).await?;
            }
        }

        draft::clear_drafts(&mut current);
        let discarded = persist(&mut tx, &current).await?;

        let revision = NewRevision::capture(
            &discarded,
            ACTION_DISCARD_DRAFT,
            None,
            action_metadata(ACTION_DISCARD_DRAFT, now),
            false,
        )?;
        let revision = tx.insert_revision(&revision).await?;
        tx.commit().await?;

        tracing::info!(
            entity_type = %discarded.kind,
            entity_id = discarded.id,
            revision_id = revision.id,
            "Draft discarded"
        );
        Ok(discarded)
    }

    /// Restore the live slots from `revision_id` and record a `revert`
    /// revision. Drafts are left in place.
    pub async fn revert_to_revision(
        &self,
        entity: &ContentEntity,
        revision_id: DbId,
    ) -> Result<bool, CoreError> {
        let mut tx = self.storage.begin().await?;
        let current = lock_current(&mut tx, entity).await?;
        let target = tx
            .find_revision(revision_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "revision",
                id: revision_id,
            })?;

        let reverted = restore(&mut tx, current, &target).await?;

        let now = Utc::now();
        let mut metadata = action_metadata(ACTION_REVERT, now);
        metadata.insert("reverted_to".into(), Value::from(target.id));
        let audit = NewRevision::capture(
            &reverted,
            ACTION_REVERT,
            Some(&format!("Reverted to revision {}", target.id)),
            metadata,
            true,
        )?;
        let audit = tx.insert_revision(&audit).await?;
        tx.commit().await?;

        tracing::info!(
            entity_type = %reverted.kind,
            entity_id = reverted.id,
            reverted_to = target.id,
            revision_id = audit.id,
            "Entity reverted"
        );
        Ok(true)
    }

    /// Overwrite the live slots with `revision`'s snapshot without recording
    /// a revision. Drafts are left in place.
    pub async fn restore_revision(
        &self,
        entity: &ContentEntity,
        revision: &Revision,
    ) -> Result<bool, CoreError> {
        let mut tx = self.storage.begin().await?;
        let current = lock_current(&mut tx, entity).await?;
        let restored = restore(&mut tx, current, revision).await?;
        tx.commit().await?;

        tracing::debug!(
            entity_type = %restored.kind,
            entity_id = restored.id,
            revision_id = revision.id,
            "Live values restored"
        );
        Ok(true)
    }

    // ── Revision store ──────────────────────────────────────────────

    /// Record a snapshot of the entity's current live values.
    pub async fn create_revision(
        &self,
        entity: &ContentEntity,
        action: &str,
        description: Option<&str>,
        metadata: Option<Metadata>,
        is_published: bool,
    ) -> Result<Revision, CoreError> {
        let mut tx = self.storage.begin().await?;
        let current = tx
            .find_entity(entity.kind, entity.id)
            .await?
            .ok_or_else(|| not_found(entity.kind, entity.id))?;
        let revision = NewRevision::capture(
            &current,
            action,
            description,
            metadata.unwrap_or_default(),
            is_published,
        )?;
        let revision = tx.insert_revision(&revision).await?;
        tx.commit().await?;

        tracing::debug!(
            entity_type = %current.kind,
            entity_id = current.id,
            revision_id = revision.id,
            action = %revision.action,
            "Revision recorded"
        );
        Ok(revision)
    }

    pub async fn latest_revision(
        &self,
        entity: &ContentEntity,
    ) -> Result<Option<Revision>, CoreError> {
        let mut tx = self.storage.begin().await?;
        Ok(tx
            .latest_revision(entity.entity_type(), entity.id, false)
            .await?)
    }

    pub async fn latest_published_revision(
        &self,
        entity: &ContentEntity,
    ) -> Result<Option<Revision>, CoreError> {
        let mut tx = self.storage.begin().await?;
        Ok(tx
            .latest_revision(entity.entity_type(), entity.id, true)
            .await?)
    }

    /// Revisions of an entity, newest first.
    pub async fn history(
        &self,
        entity: &ContentEntity,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Revision>, CoreError> {
        let limit = clamp_history_limit(limit);
        let offset = offset.unwrap_or(0).max(0);
        let mut tx = self.storage.begin().await?;
        Ok(tx
            .list_revisions(entity.entity_type(), entity.id, limit, offset)
            .await?)
    }
}

// ---------------------------------------------------------------------------
// Transaction helpers
// ---------------------------------------------------------------------------

fn not_found(kind: EntityKind, id: DbId) -> CoreError {
    CoreError::NotFound {
        entity: kind.as_str(),
        id,
    }
}

/// Lock the stored row and check it matches the caller's copy.
async fn lock_current<T: StorageTx>(
    tx: &mut T,
    entity: &ContentEntity,
) -> Result<ContentEntity, CoreError> {
    let current = tx
        .lock_entity(entity.kind, entity.id)
        .await?
        .ok_or_else(|| not_found(entity.kind, entity.id))?;
    if current.lock_version != entity.lock_version {
        return Err(stale(&current, entity.lock_version));
    }
    Ok(current)
}

async fn persist<T: StorageTx>(
    tx: &mut T,
    entity: &ContentEntity,
) -> Result<ContentEntity, CoreError> {
    tx.update_entity(entity)
        .await?
        .ok_or_else(|| stale(entity, entity.lock_version))
}

fn stale(entity: &ContentEntity, expected: i32) -> CoreError {
    CoreError::Conflict(format!(
        "{} {} was modified concurrently (expected version {expected}, found {})",
        entity.kind, entity.id, entity.lock_version
    ))
}

/// Overwrite live slots with a revision's snapshot and persist. Records no
/// revision of its own.
async fn restore<T: StorageTx>(
    tx: &mut T,
    mut entity: ContentEntity,
    revision: &Revision,
) -> Result<ContentEntity, CoreError> {
    revision.ensure_owned_by(&entity)?;
    entity.apply_versioned_field_values(&revision.data);
    persist(tx, &entity).await
}
