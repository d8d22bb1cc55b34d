//! Folio core: versioned content entities, the draft overlay, revision
//! snapshots and the reconciliation engine.
//!
//! This crate has no database dependency. Storage backends implement
//! [`store::RevisionStorage`]; [`memory::MemoryStorage`] is the in-process one.

pub mod config;
pub mod draft;
pub mod engine;
pub mod entity;
pub mod error;
pub mod memory;
pub mod revision;
pub mod schema;
pub mod store;
pub mod types;
