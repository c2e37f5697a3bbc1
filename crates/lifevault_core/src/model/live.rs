//! Closed tagged variant over every archivable live entity.
//!
//! # Responsibility
//! - Give the archive core one owned type for heterogeneous entity shapes.
//! - Centralize per-kind accessors so engine code never matches on kinds.

use crate::model::kind::EntityKind;
use crate::model::records::{Budget, EntityId, Goal, Note, OwnerId, Task, Transaction};

/// Live entity of any archivable kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEntity {
    Note(Note),
    Task(Task),
    Transaction(Transaction),
    Budget(Budget),
    Goal(Goal),
}

impl LiveEntity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Note(_) => EntityKind::Note,
            Self::Task(_) => EntityKind::Task,
            Self::Transaction(_) => EntityKind::Transaction,
            Self::Budget(_) => EntityKind::Budget,
            Self::Goal(_) => EntityKind::Goal,
        }
    }

    pub fn id(&self) -> EntityId {
        match self {
            Self::Note(note) => note.id,
            Self::Task(task) => task.id,
            Self::Transaction(transaction) => transaction.id,
            Self::Budget(budget) => budget.id,
            Self::Goal(goal) => goal.id,
        }
    }

    pub fn owner_id(&self) -> OwnerId {
        match self {
            Self::Note(note) => note.owner_id,
            Self::Task(task) => task.owner_id,
            Self::Transaction(transaction) => transaction.owner_id,
            Self::Budget(budget) => budget.owner_id,
            Self::Goal(goal) => goal.owner_id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Note(note) => &note.title,
            Self::Task(task) => &task.title,
            Self::Transaction(transaction) => &transaction.title,
            Self::Budget(budget) => &budget.title,
            Self::Goal(goal) => &goal.title,
        }
    }

    pub fn is_archived(&self) -> bool {
        match self {
            Self::Note(note) => note.is_archived,
            Self::Task(task) => task.is_archived,
            Self::Transaction(transaction) => transaction.is_archived,
            Self::Budget(budget) => budget.is_archived,
            Self::Goal(goal) => goal.is_archived,
        }
    }

    /// Sets or clears the archived flag in memory.
    ///
    /// `Some(at)` archives; `None` restores. Kinds without an `archived_at`
    /// column only carry the flag.
    pub fn set_archived(&mut self, archived_at: Option<i64>) {
        let flag = archived_at.is_some();
        match self {
            Self::Note(note) => {
                note.is_archived = flag;
                note.archived_at = archived_at;
            }
            Self::Task(task) => {
                task.is_archived = flag;
                task.archived_at = archived_at;
            }
            Self::Transaction(transaction) => transaction.is_archived = flag,
            Self::Budget(budget) => budget.is_archived = flag,
            Self::Goal(goal) => goal.is_archived = flag,
        }
    }

    /// Best-known moment this entity became archived.
    ///
    /// Falls back from `archived_at` to `updated_at` to `created_at`.
    pub fn archival_timestamp(&self) -> i64 {
        let (archived_at, updated_at, created_at) = match self {
            Self::Note(note) => (note.archived_at, note.updated_at, note.created_at),
            Self::Task(task) => (task.archived_at, task.updated_at, task.created_at),
            Self::Transaction(transaction) => {
                (None, transaction.updated_at, transaction.created_at)
            }
            Self::Budget(budget) => (None, budget.updated_at, budget.created_at),
            Self::Goal(goal) => (None, goal.updated_at, goal.created_at),
        };
        archived_at.or(updated_at).unwrap_or(created_at)
    }
}

impl From<Note> for LiveEntity {
    fn from(value: Note) -> Self {
        Self::Note(value)
    }
}

impl From<Task> for LiveEntity {
    fn from(value: Task) -> Self {
        Self::Task(value)
    }
}

impl From<Transaction> for LiveEntity {
    fn from(value: Transaction) -> Self {
        Self::Transaction(value)
    }
}

impl From<Budget> for LiveEntity {
    fn from(value: Budget) -> Self {
        Self::Budget(value)
    }
}

impl From<Goal> for LiveEntity {
    fn from(value: Goal) -> Self {
        Self::Goal(value)
    }
}
