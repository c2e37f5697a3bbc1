//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define data access contracts for archive entries.
//! - Isolate SQLite query details from engine orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`Conflict`, `Validation`) in
//!   addition to DB transport errors.

pub mod archive_repo;
