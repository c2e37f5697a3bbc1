//! One-off repair of archived entities that lack an archive entry.
//!
//! # Responsibility
//! - Scan every registered kind for rows flagged archived.
//! - Create the missing entries from current state.
//!
//! # Invariants
//! - Idempotent: a second run over unchanged data creates nothing.
//! - The whole run commits or rolls back as one transaction.

use crate::gateway::GatewayRegistry;
use crate::model::archive_entry::ArchiveEntry;
use crate::model::kind::EntityKind;
use crate::repo::archive_repo::{ArchiveStore, SqliteArchiveStore};
use crate::service::archive_service::{in_immediate_tx, ArchiveResult};
use crate::snapshot::codec;
use crate::snapshot::metadata::MetadataExtractor;
use log::{error, info};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;

/// Counters of one backfill run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct BackfillReport {
    /// Archived-flagged rows seen across all kinds.
    pub scanned: u64,
    pub created: u64,
    pub already_present: u64,
    /// Entries created per kind.
    pub per_kind: BTreeMap<EntityKind, u64>,
}

/// Creates archive entries for archived entities that have none.
pub struct BackfillMigrator<'a> {
    registry: &'a GatewayRegistry,
    extractor: MetadataExtractor,
}

impl<'a> BackfillMigrator<'a> {
    pub fn new(registry: &'a GatewayRegistry) -> Self {
        Self {
            registry,
            extractor: MetadataExtractor::default(),
        }
    }

    pub fn with_extractor(registry: &'a GatewayRegistry, extractor: MetadataExtractor) -> Self {
        Self {
            registry,
            extractor,
        }
    }

    /// Runs the backfill in one `BEGIN IMMEDIATE` transaction.
    pub fn run(&self, conn: &mut Connection) -> ArchiveResult<BackfillReport> {
        let started_at = Instant::now();
        info!("event=backfill module=backfill status=start");

        let result = in_immediate_tx(conn, |tx| self.run_in_tx(tx));
        match &result {
            Ok(report) => info!(
                "event=backfill module=backfill status=ok scanned={} created={} already_present={} duration_ms={}",
                report.scanned,
                report.created,
                report.already_present,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=backfill module=backfill status=error duration_ms={} error_code={} error={err}",
                started_at.elapsed().as_millis(),
                err.code()
            ),
        }
        result
    }

    fn run_in_tx(&self, conn: &Connection) -> ArchiveResult<BackfillReport> {
        let store = SqliteArchiveStore::new(conn);
        let mut report = BackfillReport::default();

        for (kind, gateway) in self.registry.iter() {
            let mut created_for_kind = 0_u64;
            for entity in gateway.list_flagged_archived(conn)? {
                report.scanned += 1;
                if store.find_any_for_entity(kind, entity.id())?.is_some() {
                    report.already_present += 1;
                    continue;
                }

                let snapshot = codec::encode(&entity)?;
                let summary = self.extractor.summarize(&entity);
                let entry = ArchiveEntry::new(
                    entity.owner_id(),
                    kind,
                    entity.id(),
                    snapshot,
                    summary,
                    entity.archival_timestamp(),
                );
                store.insert(&entry)?;
                created_for_kind += 1;
            }

            report.created += created_for_kind;
            report.per_kind.insert(kind, created_for_kind);
        }

        Ok(report)
    }
}
