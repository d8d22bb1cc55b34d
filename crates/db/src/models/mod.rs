//! Row models.
//!
//! Revisions map onto a `FromRow` struct. Versioned entities are decoded
//! column by column from their kind's schema, since each kind has its own
//! table layout.

pub mod entity;
pub mod revision;
