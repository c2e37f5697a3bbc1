//! SQLite gateway for notes.

use super::{
    bool_to_int, flag_column, kind_mismatch, optional_uuid_column, update_archive_flag,
    uuid_column, EntityGateway, GatewayResult,
};
use crate::model::kind::EntityKind;
use crate::model::live::LiveEntity;
use crate::model::records::{EntityId, Note, OwnerId};
use rusqlite::{params, Connection, Row};

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    owner_id,
    title,
    body,
    group_id,
    is_archived,
    archived_at,
    created_at,
    updated_at
FROM notes";

/// Note rows in the `notes` table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteNoteGateway;

impl EntityGateway for SqliteNoteGateway {
    fn kind(&self) -> EntityKind {
        EntityKind::Note
    }

    fn fetch_owned(
        &self,
        conn: &Connection,
        owner_id: OwnerId,
        entity_id: EntityId,
    ) -> GatewayResult<Option<LiveEntity>> {
        let mut stmt = conn.prepare(&format!(
            "{NOTE_SELECT_SQL} WHERE id = ?1 AND owner_id = ?2;"
        ))?;
        let mut rows = stmt.query(params![entity_id.to_string(), owner_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(LiveEntity::Note(parse_note_row(row)?)));
        }
        Ok(None)
    }

    fn mark_archived(
        &self,
        conn: &Connection,
        entity: &LiveEntity,
        archived_at: i64,
    ) -> GatewayResult<()> {
        update_archive_flag(conn, EntityKind::Note, "notes", true, entity, Some(archived_at))
    }

    fn mark_restored(&self, conn: &Connection, entity: &LiveEntity) -> GatewayResult<()> {
        update_archive_flag(conn, EntityKind::Note, "notes", true, entity, None)
    }

    fn insert(&self, conn: &Connection, entity: &LiveEntity) -> GatewayResult<()> {
        let LiveEntity::Note(note) = entity else {
            return Err(kind_mismatch(EntityKind::Note, entity));
        };

        conn.execute(
            "INSERT INTO notes (
                id,
                owner_id,
                title,
                body,
                group_id,
                is_archived,
                archived_at,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                note.id.to_string(),
                note.owner_id.to_string(),
                note.title.as_str(),
                note.body.as_str(),
                note.group_id.map(|id| id.to_string()),
                bool_to_int(note.is_archived),
                note.archived_at,
                note.created_at,
                note.updated_at,
            ],
        )?;
        Ok(())
    }

    fn list_flagged_archived(&self, conn: &Connection) -> GatewayResult<Vec<LiveEntity>> {
        let mut stmt = conn.prepare(&format!(
            "{NOTE_SELECT_SQL} WHERE is_archived = 1 ORDER BY created_at ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(LiveEntity::Note(parse_note_row(row)?));
        }
        Ok(notes)
    }
}

fn parse_note_row(row: &Row<'_>) -> GatewayResult<Note> {
    Ok(Note {
        id: uuid_column(row, "notes", "id")?,
        owner_id: uuid_column(row, "notes", "owner_id")?,
        title: row.get("title")?,
        body: row.get("body")?,
        group_id: optional_uuid_column(row, "notes", "group_id")?,
        is_archived: flag_column(row, "notes", "is_archived")?,
        archived_at: row.get("archived_at")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
