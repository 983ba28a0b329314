//! Persisted schema shared by the PostgreSQL and in-memory repositories.
//!
//! The in-memory store keeps these same models as JSON documents, so the
//! serde derives are part of the storage format.

pub mod assignment;
pub mod deliverable;
pub mod file;
