//! Core archive engine for LifeVault.
//! Archives notes, tasks and finance records, keeps recoverable snapshots,
//! and restores them on demand.

pub mod config;
pub mod db;
pub mod gateway;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod snapshot;

pub use config::{ArchiveConfig, ConfigError};
pub use db::{open_db, open_db_in_memory, DbError};
pub use gateway::{EntityGateway, GatewayError, GatewayRegistry, RegistryError};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingError};
pub use model::archive_entry::{ArchiveEntry, ArchiveEntryId};
pub use model::kind::EntityKind;
pub use model::live::LiveEntity;
pub use model::records::{
    Budget, EntityId, Goal, Note, OwnerId, RecurringSchedule, Task, TaskPriority, TaskStatus,
    Transaction, TransactionType,
};
pub use model::summary::{ArchiveSummary, FieldValue, SummaryField};
pub use repo::archive_repo::{
    ArchivePage, ArchiveQuery, ArchiveSortField, ArchiveStore, SortDirection,
    SqliteArchiveStore, StoreError,
};
pub use service::archive_service::{
    ArchiveEngine, ArchiveEntryDetail, ArchiveError, ArchiveListItem, ArchiveResult,
    ErrorOutcome, KindCounts, RestoreBranch, RestoreOutcome,
};
pub use service::backfill_service::{BackfillMigrator, BackfillReport};
pub use snapshot::{MetadataExtractor, SnapshotError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
