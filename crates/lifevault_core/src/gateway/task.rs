//! SQLite gateway for tasks and their recurring schedules.
//!
//! # Invariants
//! - A task has at most one attached schedule (`recurring_schedules.task_id`
//!   is UNIQUE).
//! - Archiving detaches the schedule; restore never re-attaches it.

use super::{
    bool_to_int, flag_column, kind_mismatch, parse_uuid, update_archive_flag, uuid_column,
    EntityGateway, GatewayError, GatewayResult,
};
use crate::model::kind::EntityKind;
use crate::model::live::LiveEntity;
use crate::model::records::{
    EntityId, OwnerId, RecurringSchedule, Task, TaskPriority, TaskStatus,
};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};

const TASK_SELECT_SQL: &str = "SELECT
    id,
    owner_id,
    title,
    description,
    status,
    priority,
    due_at,
    is_archived,
    archived_at,
    created_at,
    updated_at
FROM tasks";

/// Task rows in the `tasks` table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteTaskGateway;

impl EntityGateway for SqliteTaskGateway {
    fn kind(&self) -> EntityKind {
        EntityKind::Task
    }

    fn fetch_owned(
        &self,
        conn: &Connection,
        owner_id: OwnerId,
        entity_id: EntityId,
    ) -> GatewayResult<Option<LiveEntity>> {
        let mut stmt = conn.prepare(&format!(
            "{TASK_SELECT_SQL} WHERE id = ?1 AND owner_id = ?2;"
        ))?;
        let mut rows = stmt.query(params![entity_id.to_string(), owner_id.to_string()])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let mut task = parse_task_row(row)?;
        task.schedule = load_schedule(conn, task.id)?;
        Ok(Some(LiveEntity::Task(task)))
    }

    fn mark_archived(
        &self,
        conn: &Connection,
        entity: &LiveEntity,
        archived_at: i64,
    ) -> GatewayResult<()> {
        update_archive_flag(conn, EntityKind::Task, "tasks", true, entity, Some(archived_at))
    }

    fn mark_restored(&self, conn: &Connection, entity: &LiveEntity) -> GatewayResult<()> {
        update_archive_flag(conn, EntityKind::Task, "tasks", true, entity, None)
    }

    fn detach_schedule(&self, conn: &Connection, entity: &LiveEntity) -> GatewayResult<()> {
        let LiveEntity::Task(task) = entity else {
            return Err(kind_mismatch(EntityKind::Task, entity));
        };

        let removed = conn.execute(
            "DELETE FROM recurring_schedules WHERE task_id = ?1;",
            [task.id.to_string()],
        )?;
        if removed > 0 {
            info!(
                "event=schedule_detach module=gateway status=ok kind=task entity_id={}",
                task.id
            );
        }
        Ok(())
    }

    fn insert(&self, conn: &Connection, entity: &LiveEntity) -> GatewayResult<()> {
        let LiveEntity::Task(task) = entity else {
            return Err(kind_mismatch(EntityKind::Task, entity));
        };

        conn.execute(
            "INSERT INTO tasks (
                id,
                owner_id,
                title,
                description,
                status,
                priority,
                due_at,
                is_archived,
                archived_at,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                task.id.to_string(),
                task.owner_id.to_string(),
                task.title.as_str(),
                task.description.as_deref(),
                task.status.as_str(),
                task.priority.as_str(),
                task.due_at,
                bool_to_int(task.is_archived),
                task.archived_at,
                task.created_at,
                task.updated_at,
            ],
        )?;

        if let Some(schedule) = task.schedule.as_ref() {
            attach_schedule(conn, schedule)?;
        }
        Ok(())
    }

    fn list_flagged_archived(&self, conn: &Connection) -> GatewayResult<Vec<LiveEntity>> {
        let mut stmt = conn.prepare(&format!(
            "{TASK_SELECT_SQL} WHERE is_archived = 1 ORDER BY created_at ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            let mut task = parse_task_row(row)?;
            task.schedule = load_schedule(conn, task.id)?;
            tasks.push(LiveEntity::Task(task));
        }
        Ok(tasks)
    }
}

/// Attaches a recurring schedule to an existing task.
pub fn attach_schedule(conn: &Connection, schedule: &RecurringSchedule) -> GatewayResult<()> {
    conn.execute(
        "INSERT INTO recurring_schedules (id, task_id, rule, next_run_at)
         VALUES (?1, ?2, ?3, ?4);",
        params![
            schedule.id.to_string(),
            schedule.task_id.to_string(),
            schedule.rule.as_str(),
            schedule.next_run_at,
        ],
    )?;
    Ok(())
}

/// Loads the schedule attached to `task_id`, if any.
pub fn load_schedule(
    conn: &Connection,
    task_id: EntityId,
) -> GatewayResult<Option<RecurringSchedule>> {
    let raw = conn
        .query_row(
            "SELECT id, task_id, rule, next_run_at
             FROM recurring_schedules
             WHERE task_id = ?1;",
            [task_id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>("id")?,
                    row.get::<_, String>("task_id")?,
                    row.get::<_, String>("rule")?,
                    row.get::<_, Option<i64>>("next_run_at")?,
                ))
            },
        )
        .optional()?;

    let Some((id, owning_task, rule, next_run_at)) = raw else {
        return Ok(None);
    };

    Ok(Some(RecurringSchedule {
        id: parse_uuid(&id, "recurring_schedules", "id")?,
        task_id: parse_uuid(&owning_task, "recurring_schedules", "task_id")?,
        rule,
        next_run_at,
    }))
}

fn parse_task_row(row: &Row<'_>) -> GatewayResult<Task> {
    let status_text: String = row.get("status")?;
    let status = TaskStatus::parse(&status_text).ok_or_else(|| {
        GatewayError::InvalidData(format!("invalid task status `{status_text}` in tasks.status"))
    })?;
    let priority_text: String = row.get("priority")?;
    let priority = TaskPriority::parse(&priority_text).ok_or_else(|| {
        GatewayError::InvalidData(format!(
            "invalid task priority `{priority_text}` in tasks.priority"
        ))
    })?;

    Ok(Task {
        id: uuid_column(row, "tasks", "id")?,
        owner_id: uuid_column(row, "tasks", "owner_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        status,
        priority,
        due_at: row.get("due_at")?,
        is_archived: flag_column(row, "tasks", "is_archived")?,
        archived_at: row.get("archived_at")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        schedule: None,
    })
}
