//! Display summary attached to archive entries.
//!
//! # Invariants
//! - `fields` keeps insertion order; keys are stable lowerCamel identifiers.
//! - Summaries are presentation data only; they never feed back into restore.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use time::macros::format_description;
use time::OffsetDateTime;

/// Display-ready summary of one archived entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveSummary {
    pub title: String,
    pub description: Option<String>,
    pub fields: Vec<SummaryField>,
}

impl ArchiveSummary {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            fields: Vec::new(),
        }
    }

    /// Appends one typed field, preserving order.
    pub fn push(&mut self, key: &str, value: FieldValue) {
        self.fields.push(SummaryField {
            key: key.to_string(),
            value,
        });
    }

    /// Returns the first field stored under `key`.
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|field| field.key == key)
            .map(|field| &field.value)
    }
}

/// One `(key, typed value)` pair of kind-specific metadata.
///
/// Serializes with an extra `display` string (the rendered value, e.g. a
/// `YYYY-MM-DD` due date); it is ignored when reading back.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SummaryField {
    pub key: String,
    pub value: FieldValue,
}

impl Serialize for SummaryField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SummaryField", 3)?;
        state.serialize_field("key", &self.key)?;
        state.serialize_field("value", &self.value)?;
        state.serialize_field("display", &self.value.to_string())?;
        state.end()
    }
}

/// Typed summary value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Count(i64),
    /// Minor currency units.
    Amount(i64),
    /// Unix epoch milliseconds, rendered as a calendar date.
    Timestamp(i64),
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(value) => f.write_str(value),
            Self::Count(value) => write!(f, "{value}"),
            Self::Amount(minor) => {
                let sign = if *minor < 0 { "-" } else { "" };
                let abs = minor.unsigned_abs();
                write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
            }
            Self::Timestamp(epoch_ms) => match format_epoch_ms_date(*epoch_ms) {
                Some(date) => f.write_str(&date),
                None => write!(f, "{epoch_ms}"),
            },
        }
    }
}

/// Formats epoch milliseconds as a UTC `YYYY-MM-DD` date.
///
/// Returns `None` when the value is outside the representable range.
pub fn format_epoch_ms_date(epoch_ms: i64) -> Option<String> {
    let nanos = i128::from(epoch_ms) * 1_000_000;
    let moment = OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()?;
    moment
        .format(format_description!("[year]-[month]-[day]"))
        .ok()
}
