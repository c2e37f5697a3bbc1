//! Per-kind access to live entities.
//!
//! # Responsibility
//! - Define the contract the archive core uses to read and flip live rows
//!   without knowing their concrete shape.
//! - Provide SQLite gateways for every built-in entity kind.
//!
//! # Invariants
//! - Gateways never open their own transactions; every call runs on the
//!   connection (usually an open transaction) handed in by the caller.
//! - Flag transitions do not touch `updated_at`.
//! - A gateway only accepts `LiveEntity` values of its own kind.

use crate::db::DbError;
use crate::model::kind::EntityKind;
use crate::model::live::LiveEntity;
use crate::model::records::{EntityId, OwnerId};
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod budget;
pub mod goal;
pub mod note;
pub mod registry;
pub mod task;
pub mod transaction;

pub use budget::SqliteBudgetGateway;
pub use goal::{recompute_goal_balance, SqliteGoalGateway};
pub use note::SqliteNoteGateway;
pub use registry::{GatewayRegistry, RegistryError};
pub use task::{attach_schedule, load_schedule, SqliteTaskGateway};
pub use transaction::SqliteTransactionGateway;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Live-entity access failure.
#[derive(Debug)]
pub enum GatewayError {
    Db(DbError),
    /// Entity handed to a gateway of another kind.
    KindMismatch {
        expected: EntityKind,
        actual: EntityKind,
    },
    /// Row targeted by a flag update does not exist for this owner.
    NotFound {
        kind: EntityKind,
        entity_id: EntityId,
    },
    /// Persisted row cannot be converted into a valid entity.
    InvalidData(String),
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::KindMismatch { expected, actual } => {
                write!(f, "{expected} gateway received a {actual} entity")
            }
            Self::NotFound { kind, entity_id } => write!(f, "{kind} not found: {entity_id}"),
            Self::InvalidData(message) => write!(f, "invalid live entity data: {message}"),
        }
    }
}

impl Error for GatewayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::KindMismatch { .. } | Self::NotFound { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for GatewayError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for GatewayError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Contract between the archive core and one live entity kind.
pub trait EntityGateway: Send + Sync {
    /// Kind this gateway serves.
    fn kind(&self) -> EntityKind;

    /// Loads one entity owned by `owner_id`, archived or not.
    fn fetch_owned(
        &self,
        conn: &Connection,
        owner_id: OwnerId,
        entity_id: EntityId,
    ) -> GatewayResult<Option<LiveEntity>>;

    /// Persists the archived flag (and timestamp, where tracked).
    fn mark_archived(
        &self,
        conn: &Connection,
        entity: &LiveEntity,
        archived_at: i64,
    ) -> GatewayResult<()>;

    /// Clears the archived flag (and timestamp, where tracked).
    fn mark_restored(&self, conn: &Connection, entity: &LiveEntity) -> GatewayResult<()>;

    /// Removes any recurring schedule attached to the entity.
    fn detach_schedule(&self, _conn: &Connection, _entity: &LiveEntity) -> GatewayResult<()> {
        Ok(())
    }

    /// Inserts a full row. Used to recreate entities from snapshots.
    fn insert(&self, conn: &Connection, entity: &LiveEntity) -> GatewayResult<()>;

    /// Cascades into dependent entities once the archived flag is stored.
    fn after_archive(&self, _conn: &Connection, _entity: &LiveEntity) -> GatewayResult<()> {
        Ok(())
    }

    /// Cascades into dependent entities once the entity is live again.
    fn after_restore(&self, _conn: &Connection, _entity: &LiveEntity) -> GatewayResult<()> {
        Ok(())
    }

    /// Lists every entity of this kind carrying the archived flag, any owner.
    fn list_flagged_archived(&self, conn: &Connection) -> GatewayResult<Vec<LiveEntity>>;
}

/// Sets or clears the archived flag on one owned row of `table`.
///
/// `archived_at` is written only when `tracks_archived_at` is set.
pub(crate) fn update_archive_flag(
    conn: &Connection,
    kind: EntityKind,
    table: &'static str,
    tracks_archived_at: bool,
    entity: &LiveEntity,
    archived_at: Option<i64>,
) -> GatewayResult<()> {
    let flag = bool_to_int(archived_at.is_some());
    let id = entity.id().to_string();
    let owner = entity.owner_id().to_string();

    let changed = if tracks_archived_at {
        conn.execute(
            &format!(
                "UPDATE {table}
                 SET is_archived = ?1, archived_at = ?2
                 WHERE id = ?3 AND owner_id = ?4;"
            ),
            params![flag, archived_at, id, owner],
        )?
    } else {
        conn.execute(
            &format!(
                "UPDATE {table}
                 SET is_archived = ?1
                 WHERE id = ?2 AND owner_id = ?3;"
            ),
            params![flag, id, owner],
        )?
    };

    if changed == 0 {
        return Err(GatewayError::NotFound {
            kind,
            entity_id: entity.id(),
        });
    }
    Ok(())
}

pub(crate) fn kind_mismatch(expected: EntityKind, entity: &LiveEntity) -> GatewayError {
    GatewayError::KindMismatch {
        expected,
        actual: entity.kind(),
    }
}

pub(crate) fn uuid_column(row: &Row<'_>, table: &str, column: &str) -> GatewayResult<Uuid> {
    let text: String = row.get(column)?;
    parse_uuid(&text, table, column)
}

pub(crate) fn optional_uuid_column(
    row: &Row<'_>,
    table: &str,
    column: &str,
) -> GatewayResult<Option<Uuid>> {
    match row.get::<_, Option<String>>(column)? {
        Some(text) => parse_uuid(&text, table, column).map(Some),
        None => Ok(None),
    }
}

pub(crate) fn flag_column(row: &Row<'_>, table: &str, column: &str) -> GatewayResult<bool> {
    match row.get::<_, i64>(column)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(GatewayError::InvalidData(format!(
            "invalid flag value `{other}` in {table}.{column}"
        ))),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn parse_uuid(text: &str, table: &str, column: &str) -> GatewayResult<Uuid> {
    Uuid::parse_str(text).map_err(|_| {
        GatewayError::InvalidData(format!("invalid uuid value `{text}` in {table}.{column}"))
    })
}
