//! Archive engine use-cases.
//!
//! # Responsibility
//! - Orchestrate archive, restore, permanent delete, list, detail and
//!   per-kind counts across gateways, snapshot codec and archive store.
//!
//! # Invariants
//! - Every write path runs inside one `BEGIN IMMEDIATE` transaction; any
//!   failure rolls back all of it (flag flips, cascades, entry rows).
//! - A restore that fails to decode its snapshot leaves the entry in place.
//! - A successful restore always removes the entry.
//! - Snapshot contents never reach the logs.

use crate::config::ArchiveConfig;
use crate::db::DbError;
use crate::gateway::{EntityGateway, GatewayError, GatewayRegistry};
use crate::model::archive_entry::{ArchiveEntry, ArchiveEntryId};
use crate::model::kind::EntityKind;
use crate::model::live::LiveEntity;
use crate::model::now_epoch_ms;
use crate::model::records::{EntityId, OwnerId};
use crate::model::summary::ArchiveSummary;
use crate::repo::archive_repo::{
    ArchivePage, ArchiveQuery, ArchiveStore, SqliteArchiveStore, StoreError,
};
use crate::snapshot::codec::{self, SnapshotError};
use crate::snapshot::metadata::MetadataExtractor;
use log::{error, info, warn};
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Archive use-case failure.
#[derive(Debug)]
pub enum ArchiveError {
    /// Entity or entry absent, or owned by someone else.
    NotFound { resource: &'static str, id: Uuid },
    /// No gateway is registered for the kind.
    Unsupported(String),
    /// Snapshot could not be captured or mapped back onto its kind.
    Decode(SnapshotError),
    /// Caller input rejected.
    Validation(String),
    /// The entity already has an archive entry.
    Conflict {
        entity_kind: EntityKind,
        entity_id: EntityId,
    },
    Gateway(GatewayError),
    Store(StoreError),
}

/// Coarse classification for inbound layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorOutcome {
    NotFound,
    BadRequest,
    Conflict,
    ServerError,
}

impl ArchiveError {
    pub fn outcome(&self) -> ErrorOutcome {
        match self {
            Self::NotFound { .. } => ErrorOutcome::NotFound,
            Self::Unsupported(_) | Self::Validation(_) => ErrorOutcome::BadRequest,
            Self::Conflict { .. } => ErrorOutcome::Conflict,
            Self::Decode(_) | Self::Gateway(_) | Self::Store(_) => ErrorOutcome::ServerError,
        }
    }

    /// Stable machine-readable code used in log lines and CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Unsupported(_) => "unsupported_kind",
            Self::Decode(_) => "snapshot_decode_failed",
            Self::Validation(_) => "invalid_request",
            Self::Conflict { .. } => "already_archived",
            Self::Gateway(_) => "gateway_failed",
            Self::Store(_) => "store_failed",
        }
    }

    fn entity_not_found(entity_id: EntityId) -> Self {
        Self::NotFound {
            resource: "entity",
            id: entity_id,
        }
    }

    fn entry_not_found(entry_id: ArchiveEntryId) -> Self {
        Self::NotFound {
            resource: "archive entry",
            id: entry_id,
        }
    }
}

impl Display for ArchiveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { resource, id } => write!(f, "{resource} not found: {id}"),
            Self::Unsupported(kind) => write!(f, "entity kind is not archivable: {kind}"),
            Self::Decode(err) => write!(f, "{err}"),
            Self::Validation(message) => write!(f, "{message}"),
            Self::Conflict {
                entity_kind,
                entity_id,
            } => write!(f, "{entity_kind} {entity_id} is already archived"),
            Self::Gateway(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ArchiveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Decode(err) => Some(err),
            Self::Gateway(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ArchiveError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict {
                entity_kind,
                entity_id,
            } => Self::Conflict {
                entity_kind,
                entity_id,
            },
            StoreError::Validation(message) => Self::Validation(message),
            StoreError::UnknownKind(kind) => Self::Unsupported(kind),
            other => Self::Store(other),
        }
    }
}

impl From<GatewayError> for ArchiveError {
    fn from(value: GatewayError) -> Self {
        match value {
            GatewayError::NotFound { entity_id, .. } => Self::entity_not_found(entity_id),
            other => Self::Gateway(other),
        }
    }
}

impl From<SnapshotError> for ArchiveError {
    fn from(value: SnapshotError) -> Self {
        Self::Decode(value)
    }
}

impl From<rusqlite::Error> for ArchiveError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Store(StoreError::Db(DbError::Sqlite(value)))
    }
}

/// Which restore path ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoreBranch {
    /// The live row still existed; only its archived flag was cleared.
    SoftRestore,
    /// The live row was gone and was rebuilt from the snapshot.
    Recreated,
}

/// Result of one successful restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreOutcome {
    pub entry_id: ArchiveEntryId,
    pub branch: RestoreBranch,
    pub entity_kind: EntityKind,
    pub entity_id: EntityId,
}

/// Archive listing row with its display summary attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveListItem {
    pub id: ArchiveEntryId,
    pub entity_kind: EntityKind,
    pub entity_id: EntityId,
    pub title: String,
    pub archived_at: i64,
    pub summary: ArchiveSummary,
}

/// Full entry including the raw snapshot, plus its resolved summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveEntryDetail {
    pub entry: ArchiveEntry,
    pub summary: ArchiveSummary,
}

/// Number of archive entries per kind for one owner.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct KindCounts {
    pub total: u64,
    /// Every registered kind is present, zero included.
    pub per_kind: BTreeMap<EntityKind, u64>,
}

impl KindCounts {
    pub fn get(&self, kind: EntityKind) -> u64 {
        self.per_kind.get(&kind).copied().unwrap_or(0)
    }
}

/// Archive engine bound to one connection and gateway registry.
pub struct ArchiveEngine<'a> {
    conn: &'a mut Connection,
    registry: &'a GatewayRegistry,
    config: ArchiveConfig,
    extractor: MetadataExtractor,
}

impl<'a> ArchiveEngine<'a> {
    /// Creates an engine with default configuration.
    pub fn new(conn: &'a mut Connection, registry: &'a GatewayRegistry) -> Self {
        Self::with_config(conn, registry, ArchiveConfig::default())
    }

    pub fn with_config(
        conn: &'a mut Connection,
        registry: &'a GatewayRegistry,
        config: ArchiveConfig,
    ) -> Self {
        let extractor = MetadataExtractor::from_config(&config);
        Self {
            conn,
            registry,
            config,
            extractor,
        }
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    /// Archives one live entity and records its snapshot.
    ///
    /// # Errors
    /// - `Unsupported` when no gateway serves `entity_kind`.
    /// - `NotFound` when the entity is absent or owned by someone else.
    /// - `Conflict` when an entry already exists for the entity.
    pub fn archive(
        &mut self,
        owner_id: OwnerId,
        entity_kind: EntityKind,
        entity_id: EntityId,
    ) -> ArchiveResult<ArchiveEntry> {
        let started_at = Instant::now();
        info!("event=archive module=engine status=start kind={entity_kind} entity_id={entity_id}");

        let extractor = &self.extractor;
        let result = match self.registry.get(entity_kind) {
            Some(gateway) => in_immediate_tx(&mut *self.conn, |tx| {
                archive_in_tx(tx, gateway, extractor, owner_id, entity_id)
            }),
            None => Err(ArchiveError::Unsupported(entity_kind.to_string())),
        };

        match &result {
            Ok(entry) => info!(
                "event=archive module=engine status=ok kind={entity_kind} entity_id={entity_id} entry_id={} duration_ms={}",
                entry.id,
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("archive", err, started_at),
        }
        result
    }

    /// Restores the entity behind one entry and removes the entry.
    ///
    /// # Errors
    /// - `NotFound` when the entry is absent or owned by someone else.
    /// - `Decode` when the live row is gone and the snapshot cannot be
    ///   rebuilt; the entry stays.
    pub fn restore(
        &mut self,
        owner_id: OwnerId,
        entry_id: ArchiveEntryId,
    ) -> ArchiveResult<RestoreOutcome> {
        let started_at = Instant::now();
        info!("event=restore module=engine status=start entry_id={entry_id}");

        let registry = self.registry;
        let result = in_immediate_tx(&mut *self.conn, |tx| {
            restore_in_tx(tx, registry, owner_id, entry_id)
        });

        match &result {
            Ok(outcome) => info!(
                "event=restore module=engine status=ok entry_id={entry_id} kind={} entity_id={} branch={:?} duration_ms={}",
                outcome.entity_kind,
                outcome.entity_id,
                outcome.branch,
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("restore", err, started_at),
        }
        result
    }

    /// Deletes one entry; the live entity is left untouched.
    pub fn permanent_delete(
        &mut self,
        owner_id: OwnerId,
        entry_id: ArchiveEntryId,
    ) -> ArchiveResult<()> {
        let started_at = Instant::now();
        info!("event=purge module=engine status=start entry_id={entry_id}");

        let result = in_immediate_tx(&mut *self.conn, |tx| {
            if !SqliteArchiveStore::new(tx).delete(owner_id, entry_id)? {
                return Err(ArchiveError::entry_not_found(entry_id));
            }
            Ok(())
        });

        match &result {
            Ok(()) => info!(
                "event=purge module=engine status=ok entry_id={entry_id} duration_ms={}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("purge", err, started_at),
        }
        result
    }

    /// Lists one owner's entries with display summaries.
    pub fn list(
        &self,
        owner_id: OwnerId,
        query: &ArchiveQuery,
    ) -> ArchiveResult<ArchivePage<ArchiveListItem>> {
        query.validate(&self.config)?;
        let page = SqliteArchiveStore::new(&*self.conn).list(owner_id, query)?;
        Ok(page.map(|entry| {
            let summary = self.resolve_summary(&entry);
            ArchiveListItem {
                id: entry.id,
                entity_kind: entry.entity_kind,
                entity_id: entry.entity_id,
                title: entry.title,
                archived_at: entry.archived_at,
                summary,
            }
        }))
    }

    /// Loads one entry with its raw snapshot and summary.
    pub fn detail(
        &self,
        owner_id: OwnerId,
        entry_id: ArchiveEntryId,
    ) -> ArchiveResult<ArchiveEntryDetail> {
        let entry = SqliteArchiveStore::new(&*self.conn)
            .get(owner_id, entry_id)?
            .ok_or_else(|| ArchiveError::entry_not_found(entry_id))?;
        let summary = self.resolve_summary(&entry);
        Ok(ArchiveEntryDetail { entry, summary })
    }

    /// Counts one owner's entries per registered kind.
    pub fn kind_counts(&self, owner_id: OwnerId) -> ArchiveResult<KindCounts> {
        let stored = SqliteArchiveStore::new(&*self.conn).count_by_kind(owner_id)?;
        let mut counts = KindCounts::default();
        for kind in self.registry.kinds() {
            counts.per_kind.insert(kind, 0);
        }
        for (kind, count) in stored {
            counts.per_kind.insert(kind, count);
            counts.total += count;
        }
        Ok(counts)
    }

    /// Stored summary when readable, otherwise extracted from the snapshot.
    fn resolve_summary(&self, entry: &ArchiveEntry) -> ArchiveSummary {
        match entry.summary.as_ref() {
            Some(summary) => summary.clone(),
            None => self.extractor.extract(entry.entity_kind, &entry.snapshot),
        }
    }
}

/// Runs `work` inside one `BEGIN IMMEDIATE` transaction.
///
/// Commits only when `work` succeeds; dropping the transaction on error rolls
/// everything back.
pub(crate) fn in_immediate_tx<T>(
    conn: &mut Connection,
    work: impl FnOnce(&Connection) -> ArchiveResult<T>,
) -> ArchiveResult<T> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let value = work(&tx)?;
    tx.commit()?;
    Ok(value)
}

fn archive_in_tx(
    conn: &Connection,
    gateway: &dyn EntityGateway,
    extractor: &MetadataExtractor,
    owner_id: OwnerId,
    entity_id: EntityId,
) -> ArchiveResult<ArchiveEntry> {
    let entity_kind = gateway.kind();
    let mut entity = gateway
        .fetch_owned(conn, owner_id, entity_id)?
        .ok_or_else(|| ArchiveError::entity_not_found(entity_id))?;

    let store = SqliteArchiveStore::new(conn);
    if store
        .find_for_entity(owner_id, entity_kind, entity_id)?
        .is_some()
    {
        return Err(ArchiveError::Conflict {
            entity_kind,
            entity_id,
        });
    }

    gateway.detach_schedule(conn, &entity)?;
    if let LiveEntity::Task(task) = &mut entity {
        task.schedule = None;
    }

    let archived_at = now_epoch_ms();
    gateway.mark_archived(conn, &entity, archived_at)?;
    entity.set_archived(Some(archived_at));
    gateway.after_archive(conn, &entity)?;

    let snapshot = codec::encode(&entity)?;
    let summary = extractor.summarize(&entity);
    let entry = ArchiveEntry::new(
        owner_id,
        entity_kind,
        entity_id,
        snapshot,
        summary,
        archived_at,
    );
    store.insert(&entry)?;
    Ok(entry)
}

fn restore_in_tx(
    conn: &Connection,
    registry: &GatewayRegistry,
    owner_id: OwnerId,
    entry_id: ArchiveEntryId,
) -> ArchiveResult<RestoreOutcome> {
    let store = SqliteArchiveStore::new(conn);
    let entry = store
        .get(owner_id, entry_id)?
        .ok_or_else(|| ArchiveError::entry_not_found(entry_id))?;
    let gateway = registry
        .get(entry.entity_kind)
        .ok_or_else(|| ArchiveError::Unsupported(entry.entity_kind.to_string()))?;

    let (branch, live) = match gateway.fetch_owned(conn, owner_id, entry.entity_id)? {
        Some(mut live) => {
            gateway.mark_restored(conn, &live)?;
            live.set_archived(None);
            (RestoreBranch::SoftRestore, live)
        }
        None => {
            let mut rebuilt = codec::decode(&entry.snapshot, entry.entity_kind)?;
            if rebuilt.id() != entry.entity_id || rebuilt.owner_id() != owner_id {
                return Err(ArchiveError::Decode(SnapshotError::Decode {
                    kind: entry.entity_kind,
                    message: "snapshot identity does not match its entry".to_string(),
                }));
            }
            rebuilt.set_archived(None);
            gateway.insert(conn, &rebuilt)?;
            (RestoreBranch::Recreated, rebuilt)
        }
    };

    gateway.after_restore(conn, &live)?;
    store.delete(owner_id, entry_id)?;

    Ok(RestoreOutcome {
        entry_id,
        branch,
        entity_kind: entry.entity_kind,
        entity_id: entry.entity_id,
    })
}

fn log_failure(event: &str, err: &ArchiveError, started_at: Instant) {
    let duration_ms = started_at.elapsed().as_millis();
    match err.outcome() {
        ErrorOutcome::ServerError => error!(
            "event={event} module=engine status=error duration_ms={duration_ms} error_code={} error={err}",
            err.code()
        ),
        _ => warn!(
            "event={event} module=engine status=error duration_ms={duration_ms} error_code={} error={err}",
            err.code()
        ),
    }
}
