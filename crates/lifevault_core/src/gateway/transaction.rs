//! SQLite gateway for finance transactions.
//!
//! # Invariants
//! - Archiving or restoring a goal-linked transaction recomputes that goal's
//!   `current_amount` in the same transaction.

use super::goal::recompute_goal_balance;
use super::{
    bool_to_int, flag_column, kind_mismatch, optional_uuid_column, update_archive_flag,
    uuid_column, EntityGateway, GatewayError, GatewayResult,
};
use crate::model::kind::EntityKind;
use crate::model::live::LiveEntity;
use crate::model::records::{EntityId, OwnerId, Transaction, TransactionType};
use rusqlite::{params, Connection, Row};

const TRANSACTION_SELECT_SQL: &str = "SELECT
    id,
    owner_id,
    title,
    description,
    amount,
    currency,
    transaction_type,
    goal_id,
    occurred_at,
    is_archived,
    created_at,
    updated_at
FROM transactions";

/// Transaction rows in the `transactions` table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteTransactionGateway;

impl EntityGateway for SqliteTransactionGateway {
    fn kind(&self) -> EntityKind {
        EntityKind::Transaction
    }

    fn fetch_owned(
        &self,
        conn: &Connection,
        owner_id: OwnerId,
        entity_id: EntityId,
    ) -> GatewayResult<Option<LiveEntity>> {
        let mut stmt = conn.prepare(&format!(
            "{TRANSACTION_SELECT_SQL} WHERE id = ?1 AND owner_id = ?2;"
        ))?;
        let mut rows = stmt.query(params![entity_id.to_string(), owner_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(LiveEntity::Transaction(parse_transaction_row(row)?)));
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
            EntityKind::Transaction,
            "transactions",
            false,
            entity,
            Some(archived_at),
        )
    }

    fn mark_restored(&self, conn: &Connection, entity: &LiveEntity) -> GatewayResult<()> {
        update_archive_flag(
            conn,
            EntityKind::Transaction,
            "transactions",
            false,
            entity,
            None,
        )
    }

    fn insert(&self, conn: &Connection, entity: &LiveEntity) -> GatewayResult<()> {
        let LiveEntity::Transaction(transaction) = entity else {
            return Err(kind_mismatch(EntityKind::Transaction, entity));
        };

        conn.execute(
            "INSERT INTO transactions (
                id,
                owner_id,
                title,
                description,
                amount,
                currency,
                transaction_type,
                goal_id,
                occurred_at,
                is_archived,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);",
            params![
                transaction.id.to_string(),
                transaction.owner_id.to_string(),
                transaction.title.as_str(),
                transaction.description.as_deref(),
                transaction.amount,
                transaction.currency.as_str(),
                transaction.transaction_type.as_str(),
                transaction.goal_id.map(|id| id.to_string()),
                transaction.occurred_at,
                bool_to_int(transaction.is_archived),
                transaction.created_at,
                transaction.updated_at,
            ],
        )?;
        Ok(())
    }

    fn after_archive(&self, conn: &Connection, entity: &LiveEntity) -> GatewayResult<()> {
        recompute_linked_goal(conn, entity)
    }

    fn after_restore(&self, conn: &Connection, entity: &LiveEntity) -> GatewayResult<()> {
        recompute_linked_goal(conn, entity)
    }

    fn list_flagged_archived(&self, conn: &Connection) -> GatewayResult<Vec<LiveEntity>> {
        let mut stmt = conn.prepare(&format!(
            "{TRANSACTION_SELECT_SQL} WHERE is_archived = 1 ORDER BY created_at ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut transactions = Vec::new();
        while let Some(row) = rows.next()? {
            transactions.push(LiveEntity::Transaction(parse_transaction_row(row)?));
        }
        Ok(transactions)
    }
}

fn recompute_linked_goal(conn: &Connection, entity: &LiveEntity) -> GatewayResult<()> {
    let LiveEntity::Transaction(transaction) = entity else {
        return Err(kind_mismatch(EntityKind::Transaction, entity));
    };
    match transaction.goal_id {
        Some(goal_id) => recompute_goal_balance(conn, goal_id),
        None => Ok(()),
    }
}

fn parse_transaction_row(row: &Row<'_>) -> GatewayResult<Transaction> {
    let type_text: String = row.get("transaction_type")?;
    let transaction_type = TransactionType::parse(&type_text).ok_or_else(|| {
        GatewayError::InvalidData(format!(
            "invalid transaction type `{type_text}` in transactions.transaction_type"
        ))
    })?;

    Ok(Transaction {
        id: uuid_column(row, "transactions", "id")?,
        owner_id: uuid_column(row, "transactions", "owner_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        amount: row.get("amount")?,
        currency: row.get("currency")?,
        transaction_type,
        goal_id: optional_uuid_column(row, "transactions", "goal_id")?,
        occurred_at: row.get("occurred_at")?,
        is_archived: flag_column(row, "transactions", "is_archived")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
