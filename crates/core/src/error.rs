use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(
        "Invalid revision: revision {revision_id} belongs to {owner_type} {owner_id}, \
         not {entity_type} {entity_id}"
    )]
    InvalidRevision {
        revision_id: DbId,
        owner_type: String,
        owner_id: DbId,
        entity_type: &'static str,
        entity_id: DbId,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// A failure reported by a storage backend.
///
/// The backend error is kept as the source so callers can downcast it
/// (e.g. to `sqlx::Error`) without the core depending on the backend.
#[derive(Debug, thiserror::Error)]
#[error("Storage failure: {source}")]
pub struct StorageError {
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl StorageError {
    pub fn new(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self { source: err.into() }
    }

    /// Borrow the underlying backend error.
    pub fn inner(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.source.as_ref()
    }
}
