//! `lifevault` command-line entry point.
//!
//! # Responsibility
//! - Expose archive list/detail/archive/restore/purge/counts and the backfill
//!   maintenance trigger over one SQLite database file.
//! - Print results as JSON on stdout.
//!
//! # Invariants
//! - Failures print a JSON error object and exit non-zero; caller mistakes
//!   (not found, bad request, conflict) exit with 2, everything else with 1.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use lifevault_core::{
    default_log_level, init_logging, open_db, ArchiveConfig, ArchiveEngine, ArchiveError,
    ArchiveQuery, ArchiveSortField, BackfillMigrator, EntityKind, ErrorOutcome, GatewayRegistry,
    MetadataExtractor, OwnerId, SortDirection,
};
use log::info;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "lifevault")]
#[command(about = "Archive, browse and restore LifeVault entities")]
#[command(version)]
struct Cli {
    /// SQLite database file; created and migrated when missing.
    #[arg(long)]
    db: PathBuf,
    /// Owner whose archive is addressed.
    #[arg(long)]
    owner: Option<Uuid>,
    #[arg(long)]
    log_level: Option<String>,
    /// Absolute directory for rotating log files; logging is off without it.
    #[arg(long)]
    log_dir: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List archive entries, newest first by default.
    List {
        #[arg(long, value_parser = parse_kind)]
        kind: Option<EntityKind>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        page_size: Option<u32>,
        #[arg(long, value_parser = parse_sort_field, default_value = "archived_at")]
        sort: ArchiveSortField,
        #[arg(long, value_parser = parse_sort_direction, default_value = "desc")]
        dir: SortDirection,
    },
    /// Show one entry with its snapshot and summary.
    Detail { entry_id: Uuid },
    /// Archive one live entity.
    Archive {
        #[arg(value_parser = parse_kind)]
        kind: EntityKind,
        entity_id: Uuid,
    },
    /// Restore the entity behind one entry.
    Restore { entry_id: Uuid },
    /// Delete one entry permanently; the live entity is untouched.
    Purge { entry_id: Uuid },
    /// Entry counts per kind.
    Counts,
    /// Create missing entries for entities already flagged archived.
    Backfill,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(output) => {
            println!("{output:#}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            let (outcome, _) = classify(&err);
            println!("{:#}", error_json(&err));
            ExitCode::from(exit_status(outcome))
        }
    }
}

/// Outcome and stable code of a failure; anything that is not an
/// `ArchiveError` counts as an internal server error.
fn classify(err: &anyhow::Error) -> (ErrorOutcome, &'static str) {
    match err.downcast_ref::<ArchiveError>() {
        Some(archive_err) => (archive_err.outcome(), archive_err.code()),
        None => (ErrorOutcome::ServerError, "internal"),
    }
}

fn error_json(err: &anyhow::Error) -> Value {
    let (outcome, code) = classify(err);
    json!({
        "error": {
            "code": code,
            "outcome": outcome,
            "message": format!("{err:#}"),
        }
    })
}

fn exit_status(outcome: ErrorOutcome) -> u8 {
    match outcome {
        ErrorOutcome::ServerError => 1,
        ErrorOutcome::NotFound | ErrorOutcome::BadRequest | ErrorOutcome::Conflict => 2,
    }
}

fn run(cli: Cli) -> Result<Value> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir).context("failed to initialize logging")?;
    }

    let mut conn = open_db(&cli.db)
        .with_context(|| format!("failed to open database `{}`", cli.db.display()))?;
    let registry = GatewayRegistry::with_builtin();
    let config = ArchiveConfig::default();
    config.validate()?;

    match cli.command {
        Command::Backfill => {
            let migrator = BackfillMigrator::with_extractor(
                &registry,
                MetadataExtractor::from_config(&config),
            );
            let report = migrator.run(&mut conn)?;
            Ok(serde_json::to_value(report)?)
        }
        command => {
            let owner_id = require_owner(cli.owner)?;
            info!("event=cli_command module=cli status=start owner_id={owner_id}");
            let mut engine = ArchiveEngine::with_config(&mut conn, &registry, config);
            run_owner_command(&mut engine, owner_id, command)
        }
    }
}

fn run_owner_command(
    engine: &mut ArchiveEngine<'_>,
    owner_id: OwnerId,
    command: Command,
) -> Result<Value> {
    let output = match command {
        Command::List {
            kind,
            search,
            page,
            page_size,
            sort,
            dir,
        } => {
            let query = ArchiveQuery {
                entity_kind: kind,
                search_text: search,
                page,
                page_size: page_size.unwrap_or(engine.config().default_page_size),
                sort_by: sort,
                sort_dir: dir,
            };
            serde_json::to_value(engine.list(owner_id, &query)?)?
        }
        Command::Detail { entry_id } => serde_json::to_value(engine.detail(owner_id, entry_id)?)?,
        Command::Archive { kind, entity_id } => {
            serde_json::to_value(engine.archive(owner_id, kind, entity_id)?)?
        }
        Command::Restore { entry_id } => serde_json::to_value(engine.restore(owner_id, entry_id)?)?,
        Command::Purge { entry_id } => {
            engine.permanent_delete(owner_id, entry_id)?;
            json!({ "deleted": entry_id })
        }
        Command::Counts => serde_json::to_value(engine.kind_counts(owner_id)?)?,
        Command::Backfill => return Err(anyhow!("backfill is not scoped to an owner")),
    };
    Ok(output)
}

fn require_owner(owner: Option<OwnerId>) -> Result<OwnerId> {
    owner.ok_or_else(|| {
        ArchiveError::Validation("--owner is required for this command".to_string()).into()
    })
}

fn parse_kind(value: &str) -> Result<EntityKind, String> {
    EntityKind::parse(value).ok_or_else(|| {
        format!("unknown entity kind `{value}`; expected note|task|transaction|budget|goal")
    })
}

fn parse_sort_field(value: &str) -> Result<ArchiveSortField, String> {
    ArchiveSortField::parse(value)
        .ok_or_else(|| format!("unknown sort field `{value}`; expected archived_at|title|entity_kind"))
}

fn parse_sort_direction(value: &str) -> Result<SortDirection, String> {
    SortDirection::parse(value).ok_or_else(|| format!("unknown sort direction `{value}`"))
}

#[cfg(test)]
mod tests {
    use super::{classify, error_json, exit_status, run, Cli};
    use anyhow::{anyhow, Context};
    use clap::Parser;
    use lifevault_core::{ArchiveError, EntityKind, ErrorOutcome, SnapshotError};
    use uuid::Uuid;

    fn cli(db: &str, args: &[&str]) -> Cli {
        let mut argv = vec!["lifevault", "--db", db];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("valid arguments")
    }

    #[test]
    fn caller_errors_exit_with_two_and_server_errors_with_one() {
        let cases = [
            (
                anyhow::Error::from(ArchiveError::Validation("page must be >= 1".to_string())),
                ErrorOutcome::BadRequest,
                "invalid_request",
                2,
            ),
            (
                anyhow::Error::from(ArchiveError::Unsupported("event".to_string())),
                ErrorOutcome::BadRequest,
                "unsupported_kind",
                2,
            ),
            (
                anyhow::Error::from(ArchiveError::Conflict {
                    entity_kind: EntityKind::Note,
                    entity_id: Uuid::new_v4(),
                }),
                ErrorOutcome::Conflict,
                "already_archived",
                2,
            ),
            (
                anyhow::Error::from(ArchiveError::Decode(SnapshotError::Decode {
                    kind: EntityKind::Goal,
                    message: "missing field `title`".to_string(),
                })),
                ErrorOutcome::ServerError,
                "snapshot_decode_failed",
                1,
            ),
            (
                anyhow!("disk unavailable"),
                ErrorOutcome::ServerError,
                "internal",
                1,
            ),
        ];

        for (err, outcome, code, status) in cases {
            assert_eq!(classify(&err), (outcome, code));
            assert_eq!(exit_status(outcome), status);
            let body = error_json(&err);
            assert_eq!(body["error"]["code"], code);
            assert_eq!(
                body["error"]["outcome"],
                serde_json::to_value(outcome).expect("serialize outcome")
            );
        }
    }

    #[test]
    fn context_keeps_archive_error_classification() {
        let err = Err::<(), _>(ArchiveError::Validation("bad sort".to_string()))
            .context("listing archive")
            .expect_err("error expected");
        assert_eq!(classify(&err), (ErrorOutcome::BadRequest, "invalid_request"));
        let message = error_json(&err)["error"]["message"]
            .as_str()
            .expect("message text")
            .to_string();
        assert!(message.starts_with("listing archive: "));
    }

    #[test]
    fn commands_report_missing_owner_and_missing_entity() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let db_path = dir.path().join("lifevault.db");
        let db = db_path.to_str().expect("utf-8 path");
        let owner = Uuid::new_v4().to_string();
        let missing = Uuid::new_v4().to_string();

        let err = run(cli(db, &["counts"])).expect_err("owner is required");
        assert_eq!(classify(&err), (ErrorOutcome::BadRequest, "invalid_request"));
        assert_eq!(exit_status(classify(&err).0), 2);

        let err = run(cli(db, &["--owner", &owner, "archive", "note", &missing]))
            .expect_err("entity is missing");
        assert_eq!(classify(&err), (ErrorOutcome::NotFound, "not_found"));
        assert_eq!(exit_status(classify(&err).0), 2);

        let counts = run(cli(db, &["--owner", &owner, "counts"])).expect("counts");
        assert_eq!(counts["total"], 0);

        let report = run(cli(db, &["backfill"])).expect("backfill");
        assert_eq!(report["created"], 0);
    }
}
