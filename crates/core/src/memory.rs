//! In-process storage backend.
//!
//! Transactions take the store-wide lock and work on a staged copy of the
//! state, which replaces the shared state on commit. Used by the engine tests
//! and by embedders that keep content in memory.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::entity::ContentEntity;
use crate::error::StorageError;
use crate::revision::{NewRevision, Revision};
use crate::schema::EntityKind;
use crate::store::{RevisionStorage, StorageTx};
use crate::types::{DbId, Snapshot};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    entities: BTreeMap<(EntityKind, DbId), ContentEntity>,
    revisions: Vec<Revision>,
    next_entity_id: DbId,
    next_revision_id: DbId,
}

/// Shared in-memory store. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    state: Arc<Mutex<MemoryState>>,
    fail_revision_inserts: Arc<AtomicBool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent revision insert fail until reset.
    pub fn fail_revision_inserts(&self, fail: bool) {
        self.fail_revision_inserts.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RevisionStorage for MemoryStorage {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, StorageError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryTx {
            guard,
            staged,
            fail_revision_inserts: Arc::clone(&self.fail_revision_inserts),
        })
    }
}

/// A transaction over [`MemoryStorage`].
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
    fail_revision_inserts: Arc<AtomicBool>,
}

impl MemoryTx {
    fn revisions_of<'a>(
        &'a self,
        entity_type: &'a str,
        entity_id: DbId,
    ) -> impl Iterator<Item = &'a Revision> + 'a {
        self.staged
            .revisions
            .iter()
            .filter(move |r| r.entity_type == entity_type && r.entity_id == entity_id)
    }
}

#[async_trait]
impl StorageTx for MemoryTx {
    async fn insert_entity(
        &mut self,
        kind: EntityKind,
        live: &Snapshot,
    ) -> Result<ContentEntity, StorageError> {
        self.staged.next_entity_id += 1;
        let entity = ContentEntity::new(kind, self.staged.next_entity_id, live, Utc::now());
        self.staged
            .entities
            .insert((kind, entity.id), entity.clone());
        Ok(entity)
    }

    async fn find_entity(
        &mut self,
        kind: EntityKind,
        id: DbId,
    ) -> Result<Option<ContentEntity>, StorageError> {
        Ok(self.staged.entities.get(&(kind, id)).cloned())
    }

    async fn lock_entity(
        &mut self,
        kind: EntityKind,
        id: DbId,
    ) -> Result<Option<ContentEntity>, StorageError> {
        // The store-wide guard already serialises transactions.
        self.find_entity(kind, id).await
    }

    async fn update_entity(
        &mut self,
        entity: &ContentEntity,
    ) -> Result<Option<ContentEntity>, StorageError> {
        let Some(stored) = self.staged.entities.get_mut(&(entity.kind, entity.id)) else {
            return Ok(None);
        };
        if stored.lock_version != entity.lock_version {
            return Ok(None);
        }
        let mut updated = entity.clone();
        updated.lock_version += 1;
        updated.updated_at = Utc::now();
        *stored = updated.clone();
        Ok(Some(updated))
    }

    async fn insert_revision(&mut self, revision: &NewRevision) -> Result<Revision, StorageError> {
        if self.fail_revision_inserts.load(Ordering::SeqCst) {
            return Err(StorageError::new("revision insert rejected by memory store"));
        }
        self.staged.next_revision_id += 1;
        let stored = Revision {
            id: self.staged.next_revision_id,
            entity_type: revision.entity_type.to_string(),
            entity_id: revision.entity_id,
            action: revision.action.clone(),
            description: revision.description.clone(),
            metadata: revision.metadata.clone(),
            is_published: revision.is_published,
            data: revision.data.clone(),
            created_at: Utc::now(),
        };
        self.staged.revisions.push(stored.clone());
        Ok(stored)
    }

    async fn find_revision(&mut self, id: DbId) -> Result<Option<Revision>, StorageError> {
        Ok(self.staged.revisions.iter().find(|r| r.id == id).cloned())
    }

    async fn latest_revision(
        &mut self,
        entity_type: &str,
        entity_id: DbId,
        published_only: bool,
    ) -> Result<Option<Revision>, StorageError> {
        Ok(self
            .revisions_of(entity_type, entity_id)
            .filter(|r| !published_only || r.is_published)
            .max_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)))
            .cloned())
    }

    async fn list_revisions(
        &mut self,
        entity_type: &str,
        entity_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Revision>, StorageError> {
        let mut revisions: Vec<Revision> =
            self.revisions_of(entity_type, entity_id).cloned().collect();
        revisions.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(revisions
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .collect())
    }

    async fn commit(self) -> Result<(), StorageError> {
        let MemoryTx {
            mut guard, staged, ..
        } = self;
        *guard = staged;
        Ok(())
    }
}
