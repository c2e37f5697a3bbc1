//! SQLite gateway for budgets.

use super::{
    bool_to_int, flag_column, kind_mismatch, update_archive_flag, uuid_column, EntityGateway,
    GatewayResult,
};
use crate::model::kind::EntityKind;
use crate::model::live::LiveEntity;
use crate::model::records::{Budget, EntityId, OwnerId};
use rusqlite::{params, Connection, Row};

const BUDGET_SELECT_SQL: &str = "SELECT
    id,
    owner_id,
    title,
    description,
    limit_amount,
    currency,
    is_archived,
    created_at,
    updated_at
FROM budgets";

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteBudgetGateway;

impl EntityGateway for SqliteBudgetGateway {
    fn kind(&self) -> EntityKind {
        EntityKind::Budget
    }

    fn fetch_owned(
        &self,
        conn: &Connection,
        owner_id: OwnerId,
        entity_id: EntityId,
    ) -> GatewayResult<Option<LiveEntity>> {
        let mut stmt = conn.prepare(&format!(
            "{BUDGET_SELECT_SQL} WHERE id = ?1 AND owner_id = ?2;"
        ))?;
        let mut rows = stmt.query(params![entity_id.to_string(), owner_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(LiveEntity::Budget(parse_budget_row(row)?)));
        }
        Ok(None)
    }

    fn mark_archived(
        &self,
        conn: &Connection,
        entity: &LiveEntity,
        archived_at: i64,
    ) -> GatewayResult<()> {
        update_archive_flag(
            conn,
            EntityKind::Budget,
            "budgets",
            false,
            entity,
            Some(archived_at),
        )
    }

    fn mark_restored(&self, conn: &Connection, entity: &LiveEntity) -> GatewayResult<()> {
        update_archive_flag(conn, EntityKind::Budget, "budgets", false, entity, None)
    }

    fn insert(&self, conn: &Connection, entity: &LiveEntity) -> GatewayResult<()> {
        let LiveEntity::Budget(budget) = entity else {
            return Err(kind_mismatch(EntityKind::Budget, entity));
        };

        conn.execute(
            "INSERT INTO budgets (
                id,
                owner_id,
                title,
                description,
                limit_amount,
                currency,
                is_archived,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                budget.id.to_string(),
                budget.owner_id.to_string(),
                budget.title.as_str(),
                budget.description.as_deref(),
                budget.limit_amount,
                budget.currency.as_str(),
                bool_to_int(budget.is_archived),
                budget.created_at,
                budget.updated_at,
            ],
        )?;
        Ok(())
    }

    fn list_flagged_archived(&self, conn: &Connection) -> GatewayResult<Vec<LiveEntity>> {
        let mut stmt = conn.prepare(&format!(
            "{BUDGET_SELECT_SQL} WHERE is_archived = 1 ORDER BY created_at ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut budgets = Vec::new();
        while let Some(row) = rows.next()? {
            budgets.push(LiveEntity::Budget(parse_budget_row(row)?));
        }
        Ok(budgets)
    }
}

fn parse_budget_row(row: &Row<'_>) -> GatewayResult<Budget> {
    Ok(Budget {
        id: uuid_column(row, "budgets", "id")?,
        owner_id: uuid_column(row, "budgets", "owner_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        limit_amount: row.get("limit_amount")?,
        currency: row.get("currency")?,
        is_archived: flag_column(row, "budgets", "is_archived")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
