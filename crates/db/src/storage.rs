//! PostgreSQL backend for the revision engine.
//!
//! Each [`PgTx`] wraps one database transaction. Entity reads made through
//! `lock_entity` take a row lock, and dropping the transaction without
//! committing rolls everything back.

use async_trait::async_trait;
use folio_core::entity::ContentEntity;
use folio_core::error::StorageError;
use folio_core::revision::{NewRevision, Revision};
use folio_core::schema::EntityKind;
use folio_core::store::{RevisionStorage, StorageTx};
use folio_core::types::{DbId, Snapshot};
use sqlx::{Postgres, Transaction};

use crate::repositories::{EntityRepo, RevisionRepo};
use crate::DbPool;

/// Revision engine storage on a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgStorage {
    pool: DbPool,
}

impl PgStorage {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl RevisionStorage for PgStorage {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx, StorageError> {
        let tx = self.pool.begin().await.map_err(StorageError::new)?;
        Ok(PgTx { tx })
    }
}

/// An open database transaction.
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StorageTx for PgTx {
    async fn insert_entity(
        &mut self,
        kind: EntityKind,
        live: &Snapshot,
    ) -> Result<ContentEntity, StorageError> {
        EntityRepo::create(&mut self.tx, kind, live)
            .await
            .map_err(StorageError::new)
    }

    async fn find_entity(
        &mut self,
        kind: EntityKind,
        id: DbId,
    ) -> Result<Option<ContentEntity>, StorageError> {
        EntityRepo::find_by_id(&mut self.tx, kind, id)
            .await
            .map_err(StorageError::new)
    }

    async fn lock_entity(
        &mut self,
        kind: EntityKind,
        id: DbId,
    ) -> Result<Option<ContentEntity>, StorageError> {
        EntityRepo::find_for_update(&mut self.tx, kind, id)
            .await
            .map_err(StorageError::new)
    }

    async fn update_entity(
        &mut self,
        entity: &ContentEntity,
    ) -> Result<Option<ContentEntity>, StorageError> {
        EntityRepo::update(&mut self.tx, entity)
            .await
            .map_err(StorageError::new)
    }

    async fn insert_revision(&mut self, revision: &NewRevision) -> Result<Revision, StorageError> {
        let stored = RevisionRepo::create(&mut self.tx, revision)
            .await
            .map_err(StorageError::new)?;
        tracing::debug!(
            revision_id = stored.id,
            entity_type = %stored.entity_type,
            entity_id = stored.entity_id,
            action = %stored.action,
            "Revision inserted"
        );
        Ok(stored)
    }

    async fn find_revision(&mut self, id: DbId) -> Result<Option<Revision>, StorageError> {
        RevisionRepo::find_by_id(&mut self.tx, id)
            .await
            .map_err(StorageError::new)
    }

    async fn latest_revision(
        &mut self,
        entity_type: &str,
        entity_id: DbId,
        published_only: bool,
    ) -> Result<Option<Revision>, StorageError> {
        RevisionRepo::find_latest(&mut self.tx, entity_type, entity_id, published_only)
            .await
            .map_err(StorageError::new)
    }

    async fn list_revisions(
        &mut self,
        entity_type: &str,
        entity_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Revision>, StorageError> {
        RevisionRepo::list_for_entity(&mut self.tx, entity_type, entity_id, limit, offset)
            .await
            .map_err(StorageError::new)
    }

    async fn commit(self) -> Result<(), StorageError> {
        self.tx.commit().await.map_err(StorageError::new)
    }
}
