//! Archive entry record.
//!
//! # Responsibility
//! - Represent one archived-and-recoverable entity instance.
//!
//! # Invariants
//! - `snapshot` is write-once; nothing patches it after insert.
//! - At most one entry exists per `(owner_id, entity_kind, entity_id)`.

use crate::model::kind::EntityKind;
use crate::model::records::{EntityId, OwnerId};
use crate::model::summary::ArchiveSummary;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of an archive entry.
pub type ArchiveEntryId = Uuid;

/// Persisted archive entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub id: ArchiveEntryId,
    pub owner_id: OwnerId,
    pub entity_kind: EntityKind,
    pub entity_id: EntityId,
    /// Opaque JSON capture of the entity at archive time.
    pub snapshot: String,
    /// Title extracted at capture time; drives title ordering.
    pub title: String,
    /// Summary computed from the typed entity at capture time, when available.
    pub summary: Option<ArchiveSummary>,
    /// Unix epoch milliseconds.
    pub archived_at: i64,
}

impl ArchiveEntry {
    /// Creates an entry with a fresh stable id.
    pub fn new(
        owner_id: OwnerId,
        entity_kind: EntityKind,
        entity_id: EntityId,
        snapshot: String,
        summary: ArchiveSummary,
        archived_at: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            entity_kind,
            entity_id,
            snapshot,
            title: summary.title.clone(),
            summary: Some(summary),
            archived_at,
        }
    }
}
