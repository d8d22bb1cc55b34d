//! Storage seam for entities and revisions.
//!
//! Every engine operation runs inside one [`StorageTx`]. Dropping a
//! transaction without calling [`StorageTx::commit`] discards all of its
//! writes.

use async_trait::async_trait;

use crate::entity::ContentEntity;
use crate::error::StorageError;
use crate::revision::{NewRevision, Revision};
use crate::schema::EntityKind;
use crate::types::{DbId, Snapshot};

/// A backend able to open transactions.
#[async_trait]
pub trait RevisionStorage: Send + Sync {
    type Tx: StorageTx;

    async fn begin(&self) -> Result<Self::Tx, StorageError>;
}

/// Reads and writes within one transaction.
#[async_trait]
pub trait StorageTx: Send {
    /// Insert a new entity with the given live values.
    async fn insert_entity(
        &mut self,
        kind: EntityKind,
        live: &Snapshot,
    ) -> Result<ContentEntity, StorageError>;

    /// Fetch an entity without locking it.
    async fn find_entity(
        &mut self,
        kind: EntityKind,
        id: DbId,
    ) -> Result<Option<ContentEntity>, StorageError>;

    /// Fetch an entity and hold a write lock on it until the transaction ends.
    async fn lock_entity(
        &mut self,
        kind: EntityKind,
        id: DbId,
    ) -> Result<Option<ContentEntity>, StorageError>;

    /// Persist all slots and timestamps of `entity` if its stored
    /// `lock_version` still equals `entity.lock_version`, bumping the
    /// version. Returns `None` when the stored version differs.
    async fn update_entity(
        &mut self,
        entity: &ContentEntity,
    ) -> Result<Option<ContentEntity>, StorageError>;

    async fn insert_revision(&mut self, revision: &NewRevision) -> Result<Revision, StorageError>;

    async fn find_revision(&mut self, id: DbId) -> Result<Option<Revision>, StorageError>;

    /// Newest revision of an entity, optionally restricted to published ones.
    /// Ordered by `created_at`, then by id.
    async fn latest_revision(
        &mut self,
        entity_type: &str,
        entity_id: DbId,
        published_only: bool,
    ) -> Result<Option<Revision>, StorageError>;

    /// Revisions of an entity, newest first.
    async fn list_revisions(
        &mut self,
        entity_type: &str,
        entity_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Revision>, StorageError>;

    async fn commit(self) -> Result<(), StorageError>;
}
