//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate gateways, snapshot codec and archive store into the
//!   archive, restore, purge, list, detail and backfill use-cases.
//! - Keep CLI callers decoupled from storage details.

pub mod archive_service;
pub mod backfill_service;
