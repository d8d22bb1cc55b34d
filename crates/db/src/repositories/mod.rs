//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that take
//! a `&mut PgConnection` as the first argument, so they run equally on a
//! pooled connection or inside a transaction (`&mut *tx`).

pub mod entity_repo;
pub mod revision_repo;

pub use entity_repo::EntityRepo;
pub use revision_repo::RevisionRepo;
