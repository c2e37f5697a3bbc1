//! Display summaries for archived entities.
//!
//! # Responsibility
//! - Summarize a typed entity at capture time.
//! - Summarize a raw snapshot as an untyped JSON tree when no stored summary
//!   is usable.
//!
//! # Invariants
//! - Extraction never fails: each field is read independently and skipped on
//!   error; an unreadable snapshot degrades to a placeholder title.
//! - Typed and untyped summaries of the same entity are identical.

use crate::config::ArchiveConfig;
use crate::model::kind::EntityKind;
use crate::model::live::LiveEntity;
use crate::model::summary::{ArchiveSummary, FieldValue};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

pub const FIELD_BODY_LENGTH: &str = "bodyLength";
pub const FIELD_GROUP: &str = "groupId";
pub const FIELD_STATUS: &str = "status";
pub const FIELD_PRIORITY: &str = "priority";
pub const FIELD_DUE_DATE: &str = "dueDate";
pub const FIELD_AMOUNT: &str = "amount";
pub const FIELD_CURRENCY: &str = "currency";
pub const FIELD_TRANSACTION_TYPE: &str = "transactionType";
pub const FIELD_LIMIT: &str = "limit";
pub const FIELD_TARGET_AMOUNT: &str = "targetAmount";
pub const FIELD_CURRENT_AMOUNT: &str = "currentAmount";

type Document = Map<String, Value>;
type FieldReader = fn(&Document) -> Option<FieldValue>;

/// Builds display summaries from typed entities or raw snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataExtractor {
    description_preview_chars: usize,
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::from_config(&ArchiveConfig::default())
    }
}

impl MetadataExtractor {
    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self {
            description_preview_chars: config.description_preview_chars,
        }
    }

    /// Summarizes a typed entity.
    pub fn summarize(&self, entity: &LiveEntity) -> ArchiveSummary {
        let kind = entity.kind();
        let title = non_blank(entity.title()).unwrap_or_else(|| untitled(kind));
        let mut summary = ArchiveSummary::new(title);

        match entity {
            LiveEntity::Note(note) => {
                summary.description = self.body_preview(&note.body);
                summary.push(FIELD_BODY_LENGTH, FieldValue::Count(char_count(&note.body)));
                if let Some(group_id) = note.group_id {
                    summary.push(FIELD_GROUP, FieldValue::Text(group_id.to_string()));
                }
            }
            LiveEntity::Task(task) => {
                summary.description = task.description.as_deref().and_then(non_blank);
                summary.push(FIELD_STATUS, FieldValue::Text(task.status.as_str().to_string()));
                summary.push(
                    FIELD_PRIORITY,
                    FieldValue::Text(task.priority.as_str().to_string()),
                );
                if let Some(due_at) = task.due_at {
                    summary.push(FIELD_DUE_DATE, FieldValue::Timestamp(due_at));
                }
            }
            LiveEntity::Transaction(transaction) => {
                summary.description = transaction.description.as_deref().and_then(non_blank);
                summary.push(FIELD_AMOUNT, FieldValue::Amount(transaction.amount));
                summary.push(FIELD_CURRENCY, FieldValue::Text(transaction.currency.clone()));
                summary.push(
                    FIELD_TRANSACTION_TYPE,
                    FieldValue::Text(transaction.transaction_type.as_str().to_string()),
                );
            }
            LiveEntity::Budget(budget) => {
                summary.description = budget.description.as_deref().and_then(non_blank);
                summary.push(FIELD_LIMIT, FieldValue::Amount(budget.limit_amount));
                summary.push(FIELD_CURRENCY, FieldValue::Text(budget.currency.clone()));
            }
            LiveEntity::Goal(goal) => {
                summary.description = goal.description.as_deref().and_then(non_blank);
                summary.push(FIELD_TARGET_AMOUNT, FieldValue::Amount(goal.target_amount));
                summary.push(FIELD_CURRENT_AMOUNT, FieldValue::Amount(goal.current_amount));
                summary.push(FIELD_CURRENCY, FieldValue::Text(goal.currency.clone()));
            }
        }

        summary
    }

    /// Summarizes raw snapshot text without decoding it into a typed entity.
    pub fn extract(&self, kind: EntityKind, snapshot: &str) -> ArchiveSummary {
        let document = match serde_json::from_str::<Value>(snapshot) {
            Ok(Value::Object(document)) => document,
            Ok(_) => {
                warn!("event=metadata_extract module=snapshot status=error kind={kind} error_code=not_an_object");
                return unavailable(kind);
            }
            Err(err) => {
                warn!("event=metadata_extract module=snapshot status=error kind={kind} error_code=invalid_json error={err}");
                return unavailable(kind);
            }
        };

        let title = text_field(&document, "title")
            .as_deref()
            .and_then(non_blank)
            .unwrap_or_else(|| untitled(kind));
        let mut summary = ArchiveSummary::new(title);

        summary.description = text_field(&document, "description")
            .as_deref()
            .and_then(non_blank);
        if summary.description.is_none() && kind == EntityKind::Note {
            summary.description = text_field(&document, "body")
                .and_then(|body| self.body_preview(&body));
        }

        for (key, reader) in field_readers(kind) {
            match reader(&document) {
                Some(value) => summary.push(key, value),
                None => debug!(
                    "event=metadata_extract module=snapshot status=skip kind={kind} field={key}"
                ),
            }
        }

        summary
    }

    fn body_preview(&self, body: &str) -> Option<String> {
        let collapsed = WHITESPACE_RE.replace_all(body, " ");
        let trimmed = collapsed.trim();
        if trimmed.is_empty() {
            return None;
        }

        let mut preview: String = trimmed.chars().take(self.description_preview_chars).collect();
        if trimmed.chars().count() > self.description_preview_chars {
            preview.push_str("...");
        }
        Some(preview)
    }
}

const NOTE_READERS: &[(&str, FieldReader)] = &[
    (FIELD_BODY_LENGTH, read_body_length),
    (FIELD_GROUP, read_group),
];
const TASK_READERS: &[(&str, FieldReader)] = &[
    (FIELD_STATUS, read_status),
    (FIELD_PRIORITY, read_priority),
    (FIELD_DUE_DATE, read_due_date),
];
const TRANSACTION_READERS: &[(&str, FieldReader)] = &[
    (FIELD_AMOUNT, read_amount),
    (FIELD_CURRENCY, read_currency),
    (FIELD_TRANSACTION_TYPE, read_transaction_type),
];
const BUDGET_READERS: &[(&str, FieldReader)] =
    &[(FIELD_LIMIT, read_limit), (FIELD_CURRENCY, read_currency)];
const GOAL_READERS: &[(&str, FieldReader)] = &[
    (FIELD_TARGET_AMOUNT, read_target_amount),
    (FIELD_CURRENT_AMOUNT, read_current_amount),
    (FIELD_CURRENCY, read_currency),
];

fn field_readers(kind: EntityKind) -> &'static [(&'static str, FieldReader)] {
    match kind {
        EntityKind::Note => NOTE_READERS,
        EntityKind::Task => TASK_READERS,
        EntityKind::Transaction => TRANSACTION_READERS,
        EntityKind::Budget => BUDGET_READERS,
        EntityKind::Goal => GOAL_READERS,
    }
}

fn read_body_length(document: &Document) -> Option<FieldValue> {
    text_field(document, "body").map(|body| FieldValue::Count(char_count(&body)))
}

fn read_group(document: &Document) -> Option<FieldValue> {
    text_field(document, "group_id").map(FieldValue::Text)
}

fn read_status(document: &Document) -> Option<FieldValue> {
    text_field(document, "status").map(FieldValue::Text)
}

fn read_priority(document: &Document) -> Option<FieldValue> {
    text_field(document, "priority").map(FieldValue::Text)
}

fn read_due_date(document: &Document) -> Option<FieldValue> {
    match lookup(document, "due_at")? {
        Value::Number(number) => number.as_i64().map(FieldValue::Timestamp),
        Value::String(text) => non_blank(text).map(FieldValue::Text),
        _ => None,
    }
}

fn read_amount(document: &Document) -> Option<FieldValue> {
    integer_field(document, "amount").map(FieldValue::Amount)
}

fn read_currency(document: &Document) -> Option<FieldValue> {
    text_field(document, "currency").map(FieldValue::Text)
}

fn read_transaction_type(document: &Document) -> Option<FieldValue> {
    text_field(document, "transaction_type").map(FieldValue::Text)
}

fn read_limit(document: &Document) -> Option<FieldValue> {
    integer_field(document, "limit_amount").map(FieldValue::Amount)
}

fn read_target_amount(document: &Document) -> Option<FieldValue> {
    integer_field(document, "target_amount").map(FieldValue::Amount)
}

fn read_current_amount(document: &Document) -> Option<FieldValue> {
    integer_field(document, "current_amount").map(FieldValue::Amount)
}

/// Looks up a snake_case field, falling back to its PascalCase spelling.
///
/// camelCase is tried as a last resort for snapshots written by other clients.
fn lookup<'doc>(document: &'doc Document, snake: &str) -> Option<&'doc Value> {
    document
        .get(snake)
        .or_else(|| document.get(&pascal_case(snake)))
        .or_else(|| document.get(&camel_case(snake)))
        .filter(|value| !value.is_null())
}

fn text_field(document: &Document, snake: &str) -> Option<String> {
    lookup(document, snake)?.as_str().map(str::to_string)
}

fn integer_field(document: &Document, snake: &str) -> Option<i64> {
    lookup(document, snake)?.as_i64()
}

fn pascal_case(snake: &str) -> String {
    snake
        .split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

fn camel_case(snake: &str) -> String {
    let pascal = pascal_case(snake);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn char_count(text: &str) -> i64 {
    i64::try_from(text.chars().count()).unwrap_or(i64::MAX)
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn untitled(kind: EntityKind) -> String {
    format!("{} (untitled)", kind.label())
}

fn unavailable(kind: EntityKind) -> ArchiveSummary {
    ArchiveSummary::new(format!("{} (metadata unavailable)", kind.label()))
}
