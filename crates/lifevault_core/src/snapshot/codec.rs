//! Snapshot encoding and decoding for archivable entities.
//!
//! # Responsibility
//! - Capture the full state of a live entity as portable JSON text.
//! - Rebuild a typed entity from a stored snapshot of a known kind.
//!
//! # Invariants
//! - Encoding never recurses through back-references: a nested object whose
//!   `id` repeats one of its ancestors is dropped from the capture.
//! - Decoding matches field names case-insensitively and ignores `_`/`-`, so
//!   `dueAt`, `DueAt` and `due_at` all land on the same field.
//! - Unknown snapshot fields are ignored; missing required fields fail.

use crate::model::kind::EntityKind;
use crate::model::live::LiveEntity;
use crate::model::records::{Budget, Goal, Note, Task, Transaction};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Snapshot capture/rebuild failure.
#[derive(Debug)]
pub enum SnapshotError {
    /// Entity state could not be serialized.
    Encode {
        kind: EntityKind,
        source: serde_json::Error,
    },
    /// Stored payload cannot be mapped onto the target shape.
    Decode { kind: EntityKind, message: String },
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encode { kind, source } => write!(f, "failed to encode {kind} snapshot: {source}"),
            Self::Decode { kind, message } => {
                write!(f, "failed to decode {kind} snapshot: {message}")
            }
        }
    }
}

impl Error for SnapshotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Encode { source, .. } => Some(source),
            Self::Decode { .. } => None,
        }
    }
}

/// Target shape a snapshot can be decoded into.
pub trait SnapshotShape: Serialize + DeserializeOwned {
    const KIND: EntityKind;
    /// Canonical serialized field names of the shape.
    const FIELDS: &'static [&'static str];
}

impl SnapshotShape for Note {
    const KIND: EntityKind = EntityKind::Note;
    const FIELDS: &'static [&'static str] = &[
        "id",
        "owner_id",
        "title",
        "body",
        "group_id",
        "is_archived",
        "archived_at",
        "created_at",
        "updated_at",
    ];
}

impl SnapshotShape for Task {
    const KIND: EntityKind = EntityKind::Task;
    const FIELDS: &'static [&'static str] = &[
        "id",
        "owner_id",
        "title",
        "description",
        "status",
        "priority",
        "due_at",
        "is_archived",
        "archived_at",
        "created_at",
        "updated_at",
    ];
}

impl SnapshotShape for Transaction {
    const KIND: EntityKind = EntityKind::Transaction;
    const FIELDS: &'static [&'static str] = &[
        "id",
        "owner_id",
        "title",
        "description",
        "amount",
        "currency",
        "transaction_type",
        "goal_id",
        "occurred_at",
        "is_archived",
        "created_at",
        "updated_at",
    ];
}

impl SnapshotShape for Budget {
    const KIND: EntityKind = EntityKind::Budget;
    const FIELDS: &'static [&'static str] = &[
        "id",
        "owner_id",
        "title",
        "description",
        "limit_amount",
        "currency",
        "is_archived",
        "created_at",
        "updated_at",
    ];
}

impl SnapshotShape for Goal {
    const KIND: EntityKind = EntityKind::Goal;
    const FIELDS: &'static [&'static str] = &[
        "id",
        "owner_id",
        "title",
        "description",
        "target_amount",
        "current_amount",
        "currency",
        "is_archived",
        "created_at",
        "updated_at",
    ];
}

/// Encodes a live entity into snapshot text.
pub fn encode(entity: &LiveEntity) -> SnapshotResult<String> {
    match entity {
        LiveEntity::Note(note) => encode_value(EntityKind::Note, note),
        LiveEntity::Task(task) => encode_value(EntityKind::Task, task),
        LiveEntity::Transaction(transaction) => {
            encode_value(EntityKind::Transaction, transaction)
        }
        LiveEntity::Budget(budget) => encode_value(EntityKind::Budget, budget),
        LiveEntity::Goal(goal) => encode_value(EntityKind::Goal, goal),
    }
}

/// Encodes any serializable value as a cycle-pruned snapshot.
pub fn encode_value<T: Serialize>(kind: EntityKind, value: &T) -> SnapshotResult<String> {
    let tree =
        serde_json::to_value(value).map_err(|source| SnapshotError::Encode { kind, source })?;
    let pruned = prune_back_references(tree);
    serde_json::to_string(&pruned).map_err(|source| SnapshotError::Encode { kind, source })
}

/// Decodes snapshot text into a live entity of `kind`.
pub fn decode(snapshot: &str, kind: EntityKind) -> SnapshotResult<LiveEntity> {
    match kind {
        EntityKind::Note => decode_as::<Note>(snapshot).map(LiveEntity::Note),
        EntityKind::Task => decode_as::<Task>(snapshot).map(LiveEntity::Task),
        EntityKind::Transaction => {
            decode_as::<Transaction>(snapshot).map(LiveEntity::Transaction)
        }
        EntityKind::Budget => decode_as::<Budget>(snapshot).map(LiveEntity::Budget),
        EntityKind::Goal => decode_as::<Goal>(snapshot).map(LiveEntity::Goal),
    }
}

/// Decodes snapshot text into one concrete shape.
pub fn decode_as<T: SnapshotShape>(snapshot: &str) -> SnapshotResult<T> {
    let tree: Value = serde_json::from_str(snapshot).map_err(|err| SnapshotError::Decode {
        kind: T::KIND,
        message: err.to_string(),
    })?;
    let Value::Object(fields) = tree else {
        return Err(SnapshotError::Decode {
            kind: T::KIND,
            message: "snapshot root is not a JSON object".to_string(),
        });
    };

    let canonical = canonicalize_keys(fields, T::FIELDS);
    serde_json::from_value(Value::Object(canonical)).map_err(|err| SnapshotError::Decode {
        kind: T::KIND,
        message: err.to_string(),
    })
}

fn canonicalize_keys(fields: Map<String, Value>, canonical: &[&str]) -> Map<String, Value> {
    let mut out = Map::with_capacity(fields.len());
    let mut exact = HashSet::new();

    for (key, value) in fields {
        let normalized = normalize_key(&key);
        let target = canonical
            .iter()
            .find(|candidate| normalize_key(candidate) == normalized);

        match target {
            Some(name) if key == *name => {
                exact.insert(*name);
                out.insert(key, value);
            }
            // An exact spelling always wins over a differently-cased one.
            Some(name) if !exact.contains(name) && !out.contains_key(*name) => {
                out.insert((*name).to_string(), value);
            }
            Some(_) => {}
            None => {
                out.insert(key, value);
            }
        }
    }

    out
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|ch| *ch != '_' && *ch != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Removes nested objects that repeat an ancestor's `id`.
pub(crate) fn prune_back_references(tree: Value) -> Value {
    let mut ancestors = Vec::new();
    prune(tree, &mut ancestors).unwrap_or(Value::Null)
}

fn prune(node: Value, ancestors: &mut Vec<Value>) -> Option<Value> {
    match node {
        Value::Object(fields) => {
            let identity = fields.get("id").filter(|id| !id.is_null()).cloned();
            if let Some(id) = &identity {
                if ancestors.contains(id) {
                    return None;
                }
                ancestors.push(id.clone());
            }

            let mut kept = Map::with_capacity(fields.len());
            for (key, child) in fields {
                if let Some(child) = prune(child, ancestors) {
                    kept.insert(key, child);
                }
            }

            if identity.is_some() {
                ancestors.pop();
            }
            Some(Value::Object(kept))
        }
        Value::Array(items) => Some(Value::Array(
            items
                .into_iter()
                .filter_map(|item| prune(item, ancestors))
                .collect(),
        )),
        other => Some(other),
    }
}

#[cfg(test)]
mod tests {
    use super::{decode, decode_as, encode, encode_value, SnapshotError, SnapshotShape};
    use crate::model::kind::EntityKind;
    use crate::model::live::LiveEntity;
    use crate::model::records::{Budget, Goal, Note, Task, Transaction};
    use serde::Serialize;
    use serde_json::json;
    use uuid::Uuid;

    #[derive(Serialize)]
    struct Folder {
        id: u32,
        name: String,
        children: Vec<Child>,
    }

    #[derive(Serialize)]
    struct Child {
        id: u32,
        parent: ParentRef,
    }

    #[derive(Serialize)]
    struct ParentRef {
        id: u32,
        name: String,
    }

    #[test]
    fn encode_drops_back_references_to_ancestors() {
        let folder = Folder {
            id: 1,
            name: "inbox".to_string(),
            children: vec![Child {
                id: 2,
                parent: ParentRef {
                    id: 1,
                    name: "inbox".to_string(),
                },
            }],
        };

        let text = encode_value(EntityKind::Note, &folder).expect("encode folder");
        let tree: serde_json::Value = serde_json::from_str(&text).expect("parse snapshot");
        assert_eq!(tree["children"][0]["id"], 2);
        assert!(tree["children"][0].get("parent").is_none());
        assert_eq!(tree["name"], "inbox");
    }

    #[test]
    fn encode_never_captures_loaded_schedule() {
        let mut task = Task::new(Uuid::new_v4(), "water plants");
        task.schedule = Some(crate::model::records::RecurringSchedule {
            id: Uuid::new_v4(),
            task_id: task.id,
            rule: "FREQ=WEEKLY".to_string(),
            next_run_at: None,
        });

        let text = encode(&LiveEntity::Task(task)).expect("encode task");
        assert!(!text.contains("FREQ=WEEKLY"));
        assert!(!text.contains("schedule"));
    }

    #[test]
    fn decode_round_trips_every_kind() {
        let owner = Uuid::new_v4();
        let entities = vec![
            LiveEntity::from(Note::new(owner, "Trip", "pack bags")),
            LiveEntity::from(Task::new(owner, "file taxes")),
            LiveEntity::from(Transaction::new(
                owner,
                "Groceries",
                4_250,
                "EUR",
                crate::model::records::TransactionType::Expense,
            )),
            LiveEntity::from(Budget::new(owner, "Food", 40_000, "EUR")),
            LiveEntity::from(Goal::new(owner, "Bike", 120_000, "EUR")),
        ];

        for entity in entities {
            let text = encode(&entity).expect("encode entity");
            let decoded = decode(&text, entity.kind()).expect("decode snapshot");
            assert_eq!(decoded, entity);
        }
    }

    #[test]
    fn decode_matches_fields_case_insensitively() {
        let id = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let payload = json!({
            "Id": id,
            "OwnerId": owner,
            "Title": "Trip",
            "Body": "pack bags",
            "groupId": null,
            "IsArchived": true,
            "archivedAt": 5,
            "CreatedAt": 1,
            "UpdatedAt": null,
            "LegacyColumn": "ignored"
        })
        .to_string();

        let note = decode_as::<Note>(&payload).expect("decode note");
        assert_eq!(note.id, id);
        assert_eq!(note.owner_id, owner);
        assert_eq!(note.title, "Trip");
        assert!(note.is_archived);
        assert_eq!(note.archived_at, Some(5));
    }

    #[test]
    fn exact_field_spelling_wins_over_other_casing() {
        let payload = json!({
            "Title": "shadowed",
            "title": "Trip",
            "id": Uuid::new_v4(),
            "owner_id": Uuid::new_v4(),
            "body": "",
            "is_archived": false,
            "created_at": 1
        })
        .to_string();

        let note = decode_as::<Note>(&payload).expect("decode note");
        assert_eq!(note.title, "Trip");
    }

    #[test]
    fn decode_rejects_payloads_that_do_not_fit_the_shape() {
        let missing_fields = decode("{\"title\": \"Trip\"}", EntityKind::Note).unwrap_err();
        assert!(matches!(
            missing_fields,
            SnapshotError::Decode {
                kind: EntityKind::Note,
                ..
            }
        ));

        let not_object = decode("[1, 2, 3]", EntityKind::Goal).unwrap_err();
        assert!(not_object.to_string().contains("not a JSON object"));

        let not_json = decode("{broken", EntityKind::Task).unwrap_err();
        assert!(matches!(not_json, SnapshotError::Decode { .. }));
    }

    #[test]
    fn declared_fields_match_serialized_shape() {
        fn assert_fields<T: SnapshotShape>(value: &T) {
            let tree = serde_json::to_value(value).expect("serialize record");
            let mut keys: Vec<_> = tree.as_object().expect("record object").keys().cloned().collect();
            let mut declared: Vec<_> = T::FIELDS.iter().map(|f| f.to_string()).collect();
            keys.sort();
            declared.sort();
            assert_eq!(keys, declared, "{} fields drifted", T::KIND);
        }

        let owner = Uuid::new_v4();
        assert_fields(&Note::new(owner, "a", "b"));
        assert_fields(&Task::new(owner, "a"));
        assert_fields(&Transaction::new(
            owner,
            "a",
            1,
            "USD",
            crate::model::records::TransactionType::Income,
        ));
        assert_fields(&Budget::new(owner, "a", 1, "USD"));
        assert_fields(&Goal::new(owner, "a", 1, "USD"));
    }
}
