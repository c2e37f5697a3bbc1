//! Archive entry store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist, fetch, delete and query archive entries.
//! - Own filtering, substring search, ordering and pagination SQL.
//!
//! # Invariants
//! - Every owner-facing call is scoped by `owner_id`.
//! - At most one entry per `(owner_id, entity_kind, entity_id)`; a second
//!   insert surfaces as `StoreError::Conflict`.
//! - Ordering always ends with `id ASC` so pages are stable.
//! - `total` counts the filtered set before pagination.
//! - Search and title ordering fold case through `lifevault_fold`, so the
//!   connection must come from `open_db`/`open_db_in_memory`.

use crate::config::ArchiveConfig;
use crate::db::{fold_text, is_unique_violation, DbError};
use crate::model::archive_entry::{ArchiveEntry, ArchiveEntryId};
use crate::model::kind::EntityKind;
use crate::model::records::{EntityId, OwnerId};
use crate::model::summary::ArchiveSummary;
use log::warn;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const ENTRY_SELECT_SQL: &str = "SELECT
    id,
    owner_id,
    entity_kind,
    entity_id,
    snapshot,
    title,
    summary_json,
    archived_at
FROM archive_entries";

pub type StoreResult<T> = Result<T, StoreError>;

/// Archive entry persistence and query error.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    /// An entry already exists for the same owner/kind/entity.
    Conflict {
        entity_kind: EntityKind,
        entity_id: EntityId,
    },
    /// Query parameters rejected before touching storage.
    Validation(String),
    /// Persisted entry names a kind this build does not know.
    UnknownKind(String),
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Conflict {
                entity_kind,
                entity_id,
            } => write!(f, "{entity_kind} {entity_id} is already archived"),
            Self::Validation(message) => write!(f, "invalid archive query: {message}"),
            Self::UnknownKind(value) => write!(f, "unknown entity kind `{value}`"),
            Self::InvalidData(message) => write!(f, "invalid persisted archive data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Conflict { .. }
            | Self::Validation(_)
            | Self::UnknownKind(_)
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Sort key for archive listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveSortField {
    #[default]
    ArchivedAt,
    Title,
    EntityKind,
}

impl ArchiveSortField {
    /// Parses `archived_at`, `title` or `entity_kind` (case-insensitive;
    /// `_`/`-` ignored, `date` and `kind` accepted as aliases).
    pub fn parse(value: &str) -> Option<Self> {
        let normalized: String = value
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "archivedat" | "date" => Some(Self::ArchivedAt),
            "title" => Some(Self::Title),
            "entitykind" | "kind" => Some(Self::EntityKind),
            _ => None,
        }
    }

    fn order_expr(self) -> &'static str {
        match self {
            Self::ArchivedAt => "archived_at",
            Self::Title => "lifevault_fold(title)",
            Self::EntityKind => "entity_kind",
        }
    }
}

/// Sort direction for archive listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Asc),
            "desc" | "descending" => Some(Self::Desc),
            _ => None,
        }
    }

    fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Listing options for one owner's archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveQuery {
    pub entity_kind: Option<EntityKind>,
    /// Case-insensitive substring matched against the raw snapshot.
    pub search_text: Option<String>,
    /// 1-based page number.
    pub page: u32,
    pub page_size: u32,
    pub sort_by: ArchiveSortField,
    pub sort_dir: SortDirection,
}

impl Default for ArchiveQuery {
    fn default() -> Self {
        Self::with_config(&ArchiveConfig::default())
    }
}

impl ArchiveQuery {
    /// First page, newest first, sized by `config.default_page_size`.
    pub fn with_config(config: &ArchiveConfig) -> Self {
        Self {
            entity_kind: None,
            search_text: None,
            page: 1,
            page_size: config.default_page_size,
            sort_by: ArchiveSortField::default(),
            sort_dir: SortDirection::default(),
        }
    }

    /// Rejects out-of-range paging and oversized search text.
    pub fn validate(&self, config: &ArchiveConfig) -> StoreResult<()> {
        if self.page == 0 {
            return Err(StoreError::Validation("page must be >= 1".to_string()));
        }
        if self.page_size == 0 || self.page_size > config.max_page_size {
            return Err(StoreError::Validation(format!(
                "page_size must be within 1..={}, got {}",
                config.max_page_size, self.page_size
            )));
        }
        if let Some(search) = self.normalized_search() {
            let chars = search.chars().count();
            if chars > config.max_search_chars {
                return Err(StoreError::Validation(format!(
                    "search text must be at most {} characters, got {chars}",
                    config.max_search_chars
                )));
            }
        }
        Ok(())
    }

    /// Trimmed search text; blank input means no search.
    pub fn normalized_search(&self) -> Option<&str> {
        self.search_text
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.page_size)
    }
}

/// One page of results plus the unpaginated total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchivePage<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> ArchivePage<T> {
    /// Converts every item while keeping paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> ArchivePage<U> {
        ArchivePage {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }

    pub fn has_more(&self) -> bool {
        u64::from(self.page) * u64::from(self.page_size) < self.total
    }
}

/// Persistence contract for archive entries.
pub trait ArchiveStore {
    fn list(&self, owner_id: OwnerId, query: &ArchiveQuery) -> StoreResult<ArchivePage<ArchiveEntry>>;
    fn get(&self, owner_id: OwnerId, entry_id: ArchiveEntryId) -> StoreResult<Option<ArchiveEntry>>;
    fn insert(&self, entry: &ArchiveEntry) -> StoreResult<()>;
    /// Returns whether a row was removed.
    fn delete(&self, owner_id: OwnerId, entry_id: ArchiveEntryId) -> StoreResult<bool>;
    fn find_for_entity(
        &self,
        owner_id: OwnerId,
        entity_kind: EntityKind,
        entity_id: EntityId,
    ) -> StoreResult<Option<ArchiveEntry>>;
    /// Owner-agnostic probe used by maintenance jobs.
    fn find_any_for_entity(
        &self,
        entity_kind: EntityKind,
        entity_id: EntityId,
    ) -> StoreResult<Option<ArchiveEntry>>;
    fn count_by_kind(&self, owner_id: OwnerId) -> StoreResult<BTreeMap<EntityKind, u64>>;
}

/// SQLite-backed archive store.
pub struct SqliteArchiveStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteArchiveStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_one(&self, sql: &str, bind_values: Vec<Value>) -> StoreResult<Option<ArchiveEntry>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_entry_row(row)?));
        }
        Ok(None)
    }
}

impl ArchiveStore for SqliteArchiveStore<'_> {
    fn list(&self, owner_id: OwnerId, query: &ArchiveQuery) -> StoreResult<ArchivePage<ArchiveEntry>> {
        let mut filter = String::from(" WHERE owner_id = ?");
        let mut bind_values: Vec<Value> = vec![Value::Text(owner_id.to_string())];

        if let Some(kind) = query.entity_kind {
            filter.push_str(" AND entity_kind = ?");
            bind_values.push(Value::Text(kind.as_db_str().to_string()));
        }
        if let Some(search) = query.normalized_search() {
            filter.push_str(" AND lifevault_fold(snapshot) LIKE ? ESCAPE '\\'");
            bind_values.push(Value::Text(format!(
                "%{}%",
                escape_like(&fold_text(search))
            )));
        }

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM archive_entries{filter};"),
            params_from_iter(bind_values.iter()),
            |row| row.get(0),
        )?;

        let sql = format!(
            "{ENTRY_SELECT_SQL}{filter} ORDER BY {} {}, id ASC LIMIT ? OFFSET ?;",
            query.sort_by.order_expr(),
            query.sort_dir.as_sql()
        );
        bind_values.push(Value::Integer(i64::from(query.page_size)));
        bind_values.push(Value::Integer(query.offset()));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_entry_row(row)?);
        }

        Ok(ArchivePage {
            items,
            total: u64::try_from(total).unwrap_or(0),
            page: query.page,
            page_size: query.page_size,
        })
    }

    fn get(&self, owner_id: OwnerId, entry_id: ArchiveEntryId) -> StoreResult<Option<ArchiveEntry>> {
        self.query_one(
            &format!("{ENTRY_SELECT_SQL} WHERE id = ?1 AND owner_id = ?2;"),
            vec![
                Value::Text(entry_id.to_string()),
                Value::Text(owner_id.to_string()),
            ],
        )
    }

    fn insert(&self, entry: &ArchiveEntry) -> StoreResult<()> {
        let summary_json = match entry.summary.as_ref() {
            Some(summary) => Some(serde_json::to_string(summary).map_err(|err| {
                StoreError::InvalidData(format!("summary cannot be serialized: {err}"))
            })?),
            None => None,
        };

        let inserted = self.conn.execute(
            "INSERT INTO archive_entries (
                id,
                owner_id,
                entity_kind,
                entity_id,
                snapshot,
                title,
                summary_json,
                archived_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                entry.id.to_string(),
                entry.owner_id.to_string(),
                entry.entity_kind.as_db_str(),
                entry.entity_id.to_string(),
                entry.snapshot.as_str(),
                entry.title.as_str(),
                summary_json,
                entry.archived_at,
            ],
        );

        match inserted {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict {
                entity_kind: entry.entity_kind,
                entity_id: entry.entity_id,
            }),
            Err(err) => Err(err.into()),
        }
    }

    fn delete(&self, owner_id: OwnerId, entry_id: ArchiveEntryId) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM archive_entries WHERE id = ?1 AND owner_id = ?2;",
            params![entry_id.to_string(), owner_id.to_string()],
        )?;
        Ok(changed > 0)
    }

    fn find_for_entity(
        &self,
        owner_id: OwnerId,
        entity_kind: EntityKind,
        entity_id: EntityId,
    ) -> StoreResult<Option<ArchiveEntry>> {
        self.query_one(
            &format!(
                "{ENTRY_SELECT_SQL}
                 WHERE owner_id = ?1 AND entity_kind = ?2 AND entity_id = ?3;"
            ),
            vec![
                Value::Text(owner_id.to_string()),
                Value::Text(entity_kind.as_db_str().to_string()),
                Value::Text(entity_id.to_string()),
            ],
        )
    }

    fn find_any_for_entity(
        &self,
        entity_kind: EntityKind,
        entity_id: EntityId,
    ) -> StoreResult<Option<ArchiveEntry>> {
        self.query_one(
            &format!(
                "{ENTRY_SELECT_SQL}
                 WHERE entity_kind = ?1 AND entity_id = ?2
                 ORDER BY archived_at ASC, id ASC
                 LIMIT 1;"
            ),
            vec![
                Value::Text(entity_kind.as_db_str().to_string()),
                Value::Text(entity_id.to_string()),
            ],
        )
    }

    fn count_by_kind(&self, owner_id: OwnerId) -> StoreResult<BTreeMap<EntityKind, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT entity_kind, COUNT(*) AS entry_count
             FROM archive_entries
             WHERE owner_id = ?1
             GROUP BY entity_kind;",
        )?;
        let mut rows = stmt.query([owner_id.to_string()])?;
        let mut counts = BTreeMap::new();
        while let Some(row) = rows.next()? {
            let kind_text: String = row.get("entity_kind")?;
            let kind = EntityKind::parse(&kind_text).ok_or(StoreError::UnknownKind(kind_text))?;
            let count: i64 = row.get("entry_count")?;
            counts.insert(kind, u64::try_from(count).unwrap_or(0));
        }
        Ok(counts)
    }
}

/// Escapes `LIKE` wildcards so user text matches literally under `ESCAPE '\'`.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn parse_entry_row(row: &Row<'_>) -> StoreResult<ArchiveEntry> {
    let kind_text: String = row.get("entity_kind")?;
    let entity_kind = EntityKind::parse(&kind_text).ok_or(StoreError::UnknownKind(kind_text))?;

    let id = parse_uuid_column(row, "id")?;
    let summary = match row.get::<_, Option<String>>("summary_json")? {
        Some(text) => match serde_json::from_str::<ArchiveSummary>(&text) {
            Ok(summary) => Some(summary),
            Err(err) => {
                warn!(
                    "event=summary_decode module=repo status=error entry_id={id} error={err}"
                );
                None
            }
        },
        None => None,
    };

    Ok(ArchiveEntry {
        id,
        owner_id: parse_uuid_column(row, "owner_id")?,
        entity_kind,
        entity_id: parse_uuid_column(row, "entity_id")?,
        snapshot: row.get("snapshot")?,
        title: row.get("title")?,
        summary,
        archived_at: row.get("archived_at")?,
    })
}

fn parse_uuid_column(row: &Row<'_>, column: &str) -> StoreResult<Uuid> {
    let text: String = row.get(column)?;
    Uuid::parse_str(&text).map_err(|_| {
        StoreError::InvalidData(format!(
            "invalid uuid value `{text}` in archive_entries.{column}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::{escape_like, ArchiveQuery, ArchiveSortField, SortDirection, StoreError};
    use crate::config::ArchiveConfig;

    #[test]
    fn escapes_like_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("groceries"), "groceries");
    }

    #[test]
    fn parses_sort_options_leniently() {
        assert_eq!(
            ArchiveSortField::parse("Archived_At"),
            Some(ArchiveSortField::ArchivedAt)
        );
        assert_eq!(
            ArchiveSortField::parse("entity-kind"),
            Some(ArchiveSortField::EntityKind)
        );
        assert_eq!(ArchiveSortField::parse(" TITLE "), Some(ArchiveSortField::Title));
        assert_eq!(ArchiveSortField::parse("size"), None);
        assert_eq!(SortDirection::parse("ASC"), Some(SortDirection::Asc));
        assert_eq!(SortDirection::parse("sideways"), None);
    }

    #[test]
    fn default_query_is_first_page_newest_first() {
        let query = ArchiveQuery::default();
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, 20);
        assert_eq!(query.sort_by, ArchiveSortField::ArchivedAt);
        assert_eq!(query.sort_dir, SortDirection::Desc);
        query.validate(&ArchiveConfig::default()).expect("valid query");
    }

    #[test]
    fn rejects_out_of_range_paging() {
        let config = ArchiveConfig::default();
        let zero_page = ArchiveQuery {
            page: 0,
            ..ArchiveQuery::default()
        };
        assert!(matches!(
            zero_page.validate(&config),
            Err(StoreError::Validation(_))
        ));

        let huge_page = ArchiveQuery {
            page_size: 101,
            ..ArchiveQuery::default()
        };
        assert!(matches!(
            huge_page.validate(&config),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn rejects_oversized_search_and_ignores_blank_search() {
        let config = ArchiveConfig::default();
        let long = ArchiveQuery {
            search_text: Some("x".repeat(201)),
            ..ArchiveQuery::default()
        };
        assert!(matches!(long.validate(&config), Err(StoreError::Validation(_))));

        let blank = ArchiveQuery {
            search_text: Some("   ".to_string()),
            ..ArchiveQuery::default()
        };
        blank.validate(&config).expect("blank search is valid");
        assert_eq!(blank.normalized_search(), None);
    }
}
