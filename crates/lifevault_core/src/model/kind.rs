//! Closed tag for archivable entity kinds.
//!
//! # Invariants
//! - The persisted tag (`note|task|transaction|budget|goal`) never changes for
//!   an existing variant; archive entries store it verbatim.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Archivable entity variant stored with every archive entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Note,
    Task,
    Transaction,
    Budget,
    Goal,
}

impl EntityKind {
    /// All variants in registration order.
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Note,
        EntityKind::Task,
        EntityKind::Transaction,
        EntityKind::Budget,
        EntityKind::Goal,
    ];

    /// Storage tag used in `archive_entries.entity_kind`.
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Task => "task",
            Self::Transaction => "transaction",
            Self::Budget => "budget",
            Self::Goal => "goal",
        }
    }

    /// Human-facing label used in placeholder titles.
    pub fn label(self) -> &'static str {
        match self {
            Self::Note => "Note",
            Self::Task => "Task",
            Self::Transaction => "Transaction",
            Self::Budget => "Budget",
            Self::Goal => "Goal",
        }
    }

    /// Parses a kind tag case-insensitively.
    ///
    /// Returns `None` for tags this build does not know about.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "note" => Some(Self::Note),
            "task" => Some(Self::Task),
            "transaction" => Some(Self::Transaction),
            "budget" => Some(Self::Budget),
            "goal" => Some(Self::Goal),
            _ => None,
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db_str())
    }
}
