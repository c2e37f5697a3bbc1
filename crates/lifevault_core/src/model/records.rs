//! Live entity records owned by the productivity/finance services.
//!
//! # Responsibility
//! - Describe the row shapes the archive core reads, snapshots and rebuilds.
//!
//! # Invariants
//! - Relations are carried as ids only; loaded navigation values are marked
//!   `#[serde(skip)]` and never become part of a snapshot.
//! - Money is stored in integer minor units next to an ISO currency code.
//! - Timestamps are Unix epoch milliseconds.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of the user owning an entity or archive entry.
pub type OwnerId = Uuid;

/// Identifier of a live entity row, regardless of kind.
pub type EntityId = Uuid;

/// Free-form markdown note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: EntityId,
    pub owner_id: OwnerId,
    pub title: String,
    pub body: String,
    /// Optional notebook/group the note is filed under.
    pub group_id: Option<Uuid>,
    pub is_archived: bool,
    pub archived_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: Option<i64>,
}

impl Note {
    pub fn new(owner_id: OwnerId, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            title: title.into(),
            body: body.into(),
            group_id: None,
            is_archived: false,
            archived_at: None,
            created_at: super::now_epoch_ms(),
            updated_at: None,
        }
    }
}

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "todo" => Some(Self::Todo),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Task urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }
}

/// Recurrence rule that keeps generating task occurrences while attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringSchedule {
    pub id: Uuid,
    pub task_id: EntityId,
    /// RRULE-like expression, opaque to the archive core.
    pub rule: String,
    pub next_run_at: Option<i64>,
}

/// Actionable task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: EntityId,
    pub owner_id: OwnerId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_at: Option<i64>,
    pub is_archived: bool,
    pub archived_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: Option<i64>,
    /// Loaded schedule, if one is attached. Never captured in snapshots.
    #[serde(skip)]
    pub schedule: Option<RecurringSchedule>,
}

impl Task {
    pub fn new(owner_id: OwnerId, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            title: title.into(),
            description: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            due_at: None,
            is_archived: false,
            archived_at: None,
            created_at: super::now_epoch_ms(),
            updated_at: None,
            schedule: None,
        }
    }
}

/// Direction of a money movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Income,
    Expense,
    Transfer,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Transfer => "transfer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "income" => Some(Self::Income),
            "expense" => Some(Self::Expense),
            "transfer" => Some(Self::Transfer),
            _ => None,
        }
    }
}

/// Ledger transaction, optionally contributing to a savings goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: EntityId,
    pub owner_id: OwnerId,
    pub title: String,
    pub description: Option<String>,
    /// Minor currency units; always positive, direction lives in `transaction_type`.
    pub amount: i64,
    pub currency: String,
    pub transaction_type: TransactionType,
    pub goal_id: Option<EntityId>,
    pub occurred_at: i64,
    pub is_archived: bool,
    pub created_at: i64,
    pub updated_at: Option<i64>,
}

impl Transaction {
    pub fn new(
        owner_id: OwnerId,
        title: impl Into<String>,
        amount: i64,
        currency: impl Into<String>,
        transaction_type: TransactionType,
    ) -> Self {
        let now = super::now_epoch_ms();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            title: title.into(),
            description: None,
            amount,
            currency: currency.into(),
            transaction_type,
            goal_id: None,
            occurred_at: now,
            is_archived: false,
            created_at: now,
            updated_at: None,
        }
    }

    /// Signed contribution of this transaction towards a goal balance.
    pub fn signed_amount(&self) -> i64 {
        match self.transaction_type {
            TransactionType::Expense => -self.amount,
            TransactionType::Income | TransactionType::Transfer => self.amount,
        }
    }
}

/// Spending limit for a category or period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub id: EntityId,
    pub owner_id: OwnerId,
    pub title: String,
    pub description: Option<String>,
    pub limit_amount: i64,
    pub currency: String,
    pub is_archived: bool,
    pub created_at: i64,
    pub updated_at: Option<i64>,
}

impl Budget {
    pub fn new(
        owner_id: OwnerId,
        title: impl Into<String>,
        limit_amount: i64,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            title: title.into(),
            description: None,
            limit_amount,
            currency: currency.into(),
            is_archived: false,
            created_at: super::now_epoch_ms(),
            updated_at: None,
        }
    }
}

/// Savings goal whose balance is derived from linked transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: EntityId,
    pub owner_id: OwnerId,
    pub title: String,
    pub description: Option<String>,
    pub target_amount: i64,
    /// Signed sum of linked, non-archived transactions.
    pub current_amount: i64,
    pub currency: String,
    pub is_archived: bool,
    pub created_at: i64,
    pub updated_at: Option<i64>,
}

impl Goal {
    pub fn new(
        owner_id: OwnerId,
        title: impl Into<String>,
        target_amount: i64,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            title: title.into(),
            description: None,
            target_amount,
            current_amount: 0,
            currency: currency.into(),
            is_archived: false,
            created_at: super::now_epoch_ms(),
            updated_at: None,
        }
    }
}
