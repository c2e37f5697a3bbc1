//! Snapshot capture and display metadata.
//!
//! # Responsibility
//! - Serialize live entities into opaque JSON snapshots and rebuild them.
//! - Derive display summaries from typed entities or raw snapshots.
//!
//! # Invariants
//! - Snapshot bytes are never rewritten after capture.
//! - Metadata extraction never fails; it degrades to placeholder titles.

pub mod codec;
pub mod metadata;

pub use codec::{decode, encode, SnapshotError, SnapshotResult, SnapshotShape};
pub use metadata::MetadataExtractor;
