//! SQLite gateway for savings goals.
//!
//! # Invariants
//! - `goals.current_amount` equals the signed sum (expenses negative) of
//!   non-archived transactions of the same owner linked to the goal.

use super::{
    bool_to_int, flag_column, kind_mismatch, update_archive_flag, uuid_column, EntityGateway,
    GatewayResult,
};
use crate::model::kind::EntityKind;
use crate::model::live::LiveEntity;
use crate::model::records::{EntityId, Goal, OwnerId};
use log::debug;
use rusqlite::{params, Connection, Row};

const GOAL_SELECT_SQL: &str = "SELECT
    id,
    owner_id,
    title,
    description,
    target_amount,
    current_amount,
    currency,
    is_archived,
    created_at,
    updated_at
FROM goals";

/// Goal rows in the `goals` table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteGoalGateway;

impl EntityGateway for SqliteGoalGateway {
    fn kind(&self) -> EntityKind {
        EntityKind::Goal
    }

    fn fetch_owned(
        &self,
        conn: &Connection,
        owner_id: OwnerId,
        entity_id: EntityId,
    ) -> GatewayResult<Option<LiveEntity>> {
        let mut stmt = conn.prepare(&format!(
            "{GOAL_SELECT_SQL} WHERE id = ?1 AND owner_id = ?2;"
        ))?;
        let mut rows = stmt.query(params![entity_id.to_string(), owner_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(LiveEntity::Goal(parse_goal_row(row)?)));
        }
        Ok(None)
    }

    fn mark_archived(
        &self,
        conn: &Connection,
        entity: &LiveEntity,
        archived_at: i64,
    ) -> GatewayResult<()> {
        update_archive_flag(conn, EntityKind::Goal, "goals", false, entity, Some(archived_at))
    }

    fn mark_restored(&self, conn: &Connection, entity: &LiveEntity) -> GatewayResult<()> {
        update_archive_flag(conn, EntityKind::Goal, "goals", false, entity, None)
    }

    fn insert(&self, conn: &Connection, entity: &LiveEntity) -> GatewayResult<()> {
        let LiveEntity::Goal(goal) = entity else {
            return Err(kind_mismatch(EntityKind::Goal, entity));
        };

        conn.execute(
            "INSERT INTO goals (
                id,
                owner_id,
                title,
                description,
                target_amount,
                current_amount,
                currency,
                is_archived,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                goal.id.to_string(),
                goal.owner_id.to_string(),
                goal.title.as_str(),
                goal.description.as_deref(),
                goal.target_amount,
                goal.current_amount,
                goal.currency.as_str(),
                bool_to_int(goal.is_archived),
                goal.created_at,
                goal.updated_at,
            ],
        )?;
        Ok(())
    }

    /// A recreated goal may have missed contributions while it was gone.
    fn after_restore(&self, conn: &Connection, entity: &LiveEntity) -> GatewayResult<()> {
        recompute_goal_balance(conn, entity.id())
    }

    fn list_flagged_archived(&self, conn: &Connection) -> GatewayResult<Vec<LiveEntity>> {
        let mut stmt = conn.prepare(&format!(
            "{GOAL_SELECT_SQL} WHERE is_archived = 1 ORDER BY created_at ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut goals = Vec::new();
        while let Some(row) = rows.next()? {
            goals.push(LiveEntity::Goal(parse_goal_row(row)?));
        }
        Ok(goals)
    }
}

/// Recomputes `current_amount` of one goal from its live transactions.
///
/// A missing goal is not an error; linked transactions may outlive it.
pub fn recompute_goal_balance(conn: &Connection, goal_id: EntityId) -> GatewayResult<()> {
    let changed = conn.execute(
        "UPDATE goals
         SET current_amount = COALESCE((
             SELECT SUM(CASE t.transaction_type WHEN 'expense' THEN -t.amount ELSE t.amount END)
             FROM transactions t
             WHERE t.goal_id = goals.id
               AND t.owner_id = goals.owner_id
               AND t.is_archived = 0
         ), 0)
         WHERE id = ?1;",
        [goal_id.to_string()],
    )?;
    debug!(
        "event=goal_recompute module=gateway status=ok goal_id={goal_id} matched={changed}"
    );
    Ok(())
}

fn parse_goal_row(row: &Row<'_>) -> GatewayResult<Goal> {
    Ok(Goal {
        id: uuid_column(row, "goals", "id")?,
        owner_id: uuid_column(row, "goals", "owner_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        target_amount: row.get("target_amount")?,
        current_amount: row.get("current_amount")?,
        currency: row.get("currency")?,
        is_archived: flag_column(row, "goals", "is_archived")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
