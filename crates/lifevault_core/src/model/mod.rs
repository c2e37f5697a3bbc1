//! Domain model for the archive core and the live entities it captures.
//!
//! # Responsibility
//! - Define the archive entry record owned by this core.
//! - Define the live entity shapes reached through gateways.
//!
//! # Invariants
//! - Every entity and entry is identified by a stable UUID.
//! - Timestamps are Unix epoch milliseconds in UTC.

pub mod archive_entry;
pub mod kind;
pub mod live;
pub mod records;
pub mod summary;

use time::OffsetDateTime;

/// Returns the current UTC time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    i64::try_from(millis).unwrap_or(i64::MAX)
}
