use lifevault_core::gateway::{
    attach_schedule, load_schedule, recompute_goal_balance, EntityGateway, SqliteGoalGateway,
    SqliteNoteGateway, SqliteTaskGateway, SqliteTransactionGateway,
};
use lifevault_core::{
    open_db_in_memory, ArchiveEngine, ArchiveError, ArchiveQuery, Budget, EntityKind,
    ErrorOutcome, FieldValue, GatewayRegistry, Goal, LiveEntity, Note, OwnerId, RecurringSchedule,
    RestoreBranch, Task, TaskPriority, Transaction, TransactionType,
};
use rusqlite::Connection;
use uuid::Uuid;

fn seed(conn: &Connection, gateway: &dyn EntityGateway, entity: impl Into<LiveEntity>) {
    gateway.insert(conn, &entity.into()).unwrap();
}

fn fetch(
    conn: &Connection,
    gateway: &dyn EntityGateway,
    owner_id: OwnerId,
    entity_id: Uuid,
) -> Option<LiveEntity> {
    gateway.fetch_owned(conn, owner_id, entity_id).unwrap()
}

fn entry_count(conn: &Connection, entity_id: Uuid) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM archive_entries WHERE entity_id = ?1;",
        [entity_id.to_string()],
        |row| row.get(0),
    )
    .unwrap()
}

fn goal_balance(conn: &Connection, owner_id: OwnerId, goal_id: Uuid) -> i64 {
    match fetch(conn, &SqliteGoalGateway, owner_id, goal_id) {
        Some(LiveEntity::Goal(goal)) => goal.current_amount,
        other => panic!("expected goal, got {other:?}"),
    }
}

#[test]
fn trip_note_archives_and_soft_restores_exactly() {
    let mut conn = open_db_in_memory().unwrap();
    let registry = GatewayRegistry::with_builtin();
    let owner = Uuid::new_v4();
    let note = Note::new(owner, "Trip", "Pack passport, charger and sunscreen.");
    seed(&conn, &SqliteNoteGateway, note.clone());

    let entry = ArchiveEngine::new(&mut conn, &registry)
        .archive(owner, EntityKind::Note, note.id)
        .unwrap();
    assert_eq!(entry.entity_kind, EntityKind::Note);
    assert_eq!(entry.entity_id, note.id);
    assert_eq!(entry.title, "Trip");
    assert_eq!(entry_count(&conn, note.id), 1);

    let Some(LiveEntity::Note(archived)) = fetch(&conn, &SqliteNoteGateway, owner, note.id)
    else {
        panic!("note should still exist while archived");
    };
    assert!(archived.is_archived);
    assert_eq!(archived.archived_at, Some(entry.archived_at));
    assert_eq!(archived.updated_at, note.updated_at);

    let mut engine = ArchiveEngine::new(&mut conn, &registry);
    let detail = engine.detail(owner, entry.id).unwrap();
    assert_eq!(detail.summary.title, "Trip");
    assert_eq!(
        detail.summary.description.as_deref(),
        Some("Pack passport, charger and sunscreen.")
    );
    assert!(detail.entry.snapshot.contains("\"title\":\"Trip\""));

    let outcome = engine.restore(owner, entry.id).unwrap();
    assert_eq!(outcome.branch, RestoreBranch::SoftRestore);
    assert_eq!(outcome.entity_kind, EntityKind::Note);
    assert_eq!(outcome.entity_id, note.id);

    assert_eq!(
        fetch(&conn, &SqliteNoteGateway, owner, note.id),
        Some(LiveEntity::Note(note.clone()))
    );
    assert_eq!(entry_count(&conn, note.id), 0);
}

#[test]
fn restore_recreates_deleted_entity_from_snapshot() {
    let mut conn = open_db_in_memory().unwrap();
    let registry = GatewayRegistry::with_builtin();
    let owner = Uuid::new_v4();
    let mut note = Note::new(owner, "Recipes", "Soup, bread, salad");
    note.group_id = Some(Uuid::new_v4());
    note.updated_at = Some(note.created_at + 10);
    seed(&conn, &SqliteNoteGateway, note.clone());

    let entry = ArchiveEngine::new(&mut conn, &registry)
        .archive(owner, EntityKind::Note, note.id)
        .unwrap();
    conn.execute("DELETE FROM notes WHERE id = ?1;", [note.id.to_string()])
        .unwrap();

    let outcome = ArchiveEngine::new(&mut conn, &registry)
        .restore(owner, entry.id)
        .unwrap();
    assert_eq!(outcome.branch, RestoreBranch::Recreated);
    assert_eq!(
        fetch(&conn, &SqliteNoteGateway, owner, note.id),
        Some(LiveEntity::Note(note.clone()))
    );
    assert_eq!(entry_count(&conn, note.id), 0);
}

fn live_table(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Note => "notes",
        EntityKind::Task => "tasks",
        EntityKind::Transaction => "transactions",
        EntityKind::Budget => "budgets",
        EntityKind::Goal => "goals",
    }
}

#[test]
fn every_kind_round_trips_through_both_restore_branches() {
    let mut conn = open_db_in_memory().unwrap();
    let registry = GatewayRegistry::with_builtin();
    let owner = Uuid::new_v4();

    let mut note = Note::new(owner, "Reading list", "Dune\nHyperion");
    note.group_id = Some(Uuid::new_v4());
    note.updated_at = Some(note.created_at + 5);
    let mut task = Task::new(owner, "File taxes");
    task.description = Some("Before April".to_string());
    task.priority = TaskPriority::High;
    task.due_at = Some(1_770_976_800_000);
    let mut transaction =
        Transaction::new(owner, "Rent", 120_000, "EUR", TransactionType::Expense);
    transaction.description = Some("March".to_string());
    let mut budget = Budget::new(owner, "Groceries", 40_000, "EUR");
    budget.updated_at = Some(budget.created_at + 1);
    let mut goal = Goal::new(owner, "Bike", 90_000, "EUR");
    goal.description = Some("Commuter".to_string());

    let originals: Vec<LiveEntity> = vec![
        note.into(),
        task.into(),
        transaction.into(),
        budget.into(),
        goal.into(),
    ];
    for original in &originals {
        seed(&conn, registry.get(original.kind()).unwrap(), original.clone());
    }

    for original in &originals {
        let kind = original.kind();
        let entity_id = original.id();
        let gateway = registry.get(kind).unwrap();

        let entry = ArchiveEngine::new(&mut conn, &registry)
            .archive(owner, kind, entity_id)
            .unwrap();
        let soft = ArchiveEngine::new(&mut conn, &registry)
            .restore(owner, entry.id)
            .unwrap();
        assert_eq!(soft.branch, RestoreBranch::SoftRestore, "{kind}");
        assert_eq!(
            fetch(&conn, gateway, owner, entity_id).as_ref(),
            Some(original),
            "{kind} after soft restore"
        );
        assert_eq!(entry_count(&conn, entity_id), 0, "{kind}");

        let entry = ArchiveEngine::new(&mut conn, &registry)
            .archive(owner, kind, entity_id)
            .unwrap();
        conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1;", live_table(kind)),
            [entity_id.to_string()],
        )
        .unwrap();
        let recreated = ArchiveEngine::new(&mut conn, &registry)
            .restore(owner, entry.id)
            .unwrap();
        assert_eq!(recreated.branch, RestoreBranch::Recreated, "{kind}");
        assert_eq!(
            fetch(&conn, gateway, owner, entity_id).as_ref(),
            Some(original),
            "{kind} after recreate"
        );
        assert_eq!(entry_count(&conn, entity_id), 0, "{kind}");
    }
}

#[test]
fn archiving_task_removes_schedule_for_good() {
    let mut conn = open_db_in_memory().unwrap();
    let registry = GatewayRegistry::with_builtin();
    let owner = Uuid::new_v4();
    let mut task = Task::new(owner, "Water plants");
    task.priority = TaskPriority::High;
    task.due_at = Some(1_770_976_800_000);
    seed(&conn, &SqliteTaskGateway, task.clone());
    attach_schedule(
        &conn,
        &RecurringSchedule {
            id: Uuid::new_v4(),
            task_id: task.id,
            rule: "FREQ=WEEKLY".to_string(),
            next_run_at: Some(1_771_000_000_000),
        },
    )
    .unwrap();
    assert!(load_schedule(&conn, task.id).unwrap().is_some());

    let entry = ArchiveEngine::new(&mut conn, &registry)
        .archive(owner, EntityKind::Task, task.id)
        .unwrap();
    assert!(load_schedule(&conn, task.id).unwrap().is_none());
    assert!(!entry.snapshot.contains("FREQ=WEEKLY"));
    let summary = entry.summary.as_ref().unwrap();
    assert_eq!(
        summary.field("priority"),
        Some(&FieldValue::Text("high".to_string()))
    );
    assert_eq!(
        summary.field("dueDate"),
        Some(&FieldValue::Timestamp(1_770_976_800_000))
    );

    ArchiveEngine::new(&mut conn, &registry)
        .restore(owner, entry.id)
        .unwrap();
    assert!(load_schedule(&conn, task.id).unwrap().is_none());
    assert_eq!(
        fetch(&conn, &SqliteTaskGateway, owner, task.id),
        Some(LiveEntity::Task(task.clone()))
    );
}

#[test]
fn archiving_linked_transaction_recomputes_goal_balance() {
    let mut conn = open_db_in_memory().unwrap();
    let registry = GatewayRegistry::with_builtin();
    let owner = Uuid::new_v4();
    let goal = Goal::new(owner, "G1", 100_000, "USD");
    seed(&conn, &SqliteGoalGateway, goal.clone());

    let mut salary = Transaction::new(owner, "Salary", 30_000, "USD", TransactionType::Income);
    salary.goal_id = Some(goal.id);
    let mut repair = Transaction::new(owner, "Bike repair", 5_000, "USD", TransactionType::Expense);
    repair.goal_id = Some(goal.id);
    seed(&conn, &SqliteTransactionGateway, salary.clone());
    seed(&conn, &SqliteTransactionGateway, repair.clone());
    recompute_goal_balance(&conn, goal.id).unwrap();
    assert_eq!(goal_balance(&conn, owner, goal.id), 25_000);

    let entry = ArchiveEngine::new(&mut conn, &registry)
        .archive(owner, EntityKind::Transaction, salary.id)
        .unwrap();
    assert_eq!(goal_balance(&conn, owner, goal.id), -5_000);

    conn.execute(
        "DELETE FROM transactions WHERE id = ?1;",
        [salary.id.to_string()],
    )
    .unwrap();
    let outcome = ArchiveEngine::new(&mut conn, &registry)
        .restore(owner, entry.id)
        .unwrap();
    assert_eq!(outcome.branch, RestoreBranch::Recreated);
    assert_eq!(goal_balance(&conn, owner, goal.id), 25_000);
    assert_eq!(
        fetch(&conn, &SqliteTransactionGateway, owner, salary.id),
        Some(LiveEntity::Transaction(salary.clone()))
    );
}

#[test]
fn restoring_recreated_goal_picks_up_live_contributions() {
    let mut conn = open_db_in_memory().unwrap();
    let registry = GatewayRegistry::with_builtin();
    let owner = Uuid::new_v4();
    let goal = Goal::new(owner, "Emergency fund", 50_000, "EUR");
    seed(&conn, &SqliteGoalGateway, goal.clone());

    let entry = ArchiveEngine::new(&mut conn, &registry)
        .archive(owner, EntityKind::Goal, goal.id)
        .unwrap();
    conn.execute("DELETE FROM goals WHERE id = ?1;", [goal.id.to_string()])
        .unwrap();

    let mut deposit = Transaction::new(owner, "Deposit", 7_500, "EUR", TransactionType::Income);
    deposit.goal_id = Some(goal.id);
    seed(&conn, &SqliteTransactionGateway, deposit);

    ArchiveEngine::new(&mut conn, &registry)
        .restore(owner, entry.id)
        .unwrap();
    assert_eq!(goal_balance(&conn, owner, goal.id), 7_500);
}

#[test]
fn permanent_delete_removes_only_the_entry() {
    let mut conn = open_db_in_memory().unwrap();
    let registry = GatewayRegistry::with_builtin();
    let owner = Uuid::new_v4();
    let note = Note::new(owner, "Old ideas", "");
    let other = Note::new(owner, "Other", "");
    seed(&conn, &SqliteNoteGateway, note.clone());
    seed(&conn, &SqliteNoteGateway, other.clone());

    let mut engine = ArchiveEngine::new(&mut conn, &registry);
    let entry = engine.archive(owner, EntityKind::Note, note.id).unwrap();
    engine.archive(owner, EntityKind::Note, other.id).unwrap();
    engine.permanent_delete(owner, entry.id).unwrap();

    let again = engine.permanent_delete(owner, entry.id).unwrap_err();
    assert_eq!(again.outcome(), ErrorOutcome::NotFound);

    assert_eq!(entry_count(&conn, note.id), 0);
    assert_eq!(entry_count(&conn, other.id), 1);
    let Some(LiveEntity::Note(still_archived)) = fetch(&conn, &SqliteNoteGateway, owner, note.id)
    else {
        panic!("live note must survive permanent delete");
    };
    assert!(still_archived.is_archived);
}

#[test]
fn decode_failure_keeps_entry_and_rolls_back() {
    let mut conn = open_db_in_memory().unwrap();
    let registry = GatewayRegistry::with_builtin();
    let owner = Uuid::new_v4();
    let note = Note::new(owner, "Fragile", "body");
    seed(&conn, &SqliteNoteGateway, note.clone());

    let entry = ArchiveEngine::new(&mut conn, &registry)
        .archive(owner, EntityKind::Note, note.id)
        .unwrap();
    conn.execute("DELETE FROM notes WHERE id = ?1;", [note.id.to_string()])
        .unwrap();
    conn.execute(
        "UPDATE archive_entries SET snapshot = '[1, 2, 3]' WHERE id = ?1;",
        [entry.id.to_string()],
    )
    .unwrap();

    let err = ArchiveEngine::new(&mut conn, &registry)
        .restore(owner, entry.id)
        .unwrap_err();
    assert!(matches!(err, ArchiveError::Decode(_)));
    assert_eq!(err.outcome(), ErrorOutcome::ServerError);
    assert_eq!(entry_count(&conn, note.id), 1);
    assert!(fetch(&conn, &SqliteNoteGateway, owner, note.id).is_none());
}

#[test]
fn second_archive_of_same_entity_is_a_conflict() {
    let mut conn = open_db_in_memory().unwrap();
    let registry = GatewayRegistry::with_builtin();
    let owner = Uuid::new_v4();
    let note = Note::new(owner, "Once", "");
    seed(&conn, &SqliteNoteGateway, note.clone());

    let mut engine = ArchiveEngine::new(&mut conn, &registry);
    engine.archive(owner, EntityKind::Note, note.id).unwrap();
    let err = engine
        .archive(owner, EntityKind::Note, note.id)
        .unwrap_err();
    assert!(matches!(err, ArchiveError::Conflict { .. }));
    assert_eq!(err.outcome(), ErrorOutcome::Conflict);
    assert_eq!(entry_count(&conn, note.id), 1);
}

#[test]
fn unregistered_kind_is_unsupported() {
    let mut conn = open_db_in_memory().unwrap();
    let mut registry = GatewayRegistry::new();
    registry
        .register(std::sync::Arc::new(SqliteNoteGateway))
        .unwrap();
    let owner = Uuid::new_v4();

    let err = ArchiveEngine::new(&mut conn, &registry)
        .archive(owner, EntityKind::Goal, Uuid::new_v4())
        .unwrap_err();
    assert!(matches!(err, ArchiveError::Unsupported(_)));
    assert_eq!(err.outcome(), ErrorOutcome::BadRequest);
}

#[test]
fn foreign_owner_sees_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let registry = GatewayRegistry::with_builtin();
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let note = Note::new(owner, "Private", "");
    seed(&conn, &SqliteNoteGateway, note.clone());

    let mut engine = ArchiveEngine::new(&mut conn, &registry);
    let err = engine
        .archive(stranger, EntityKind::Note, note.id)
        .unwrap_err();
    assert_eq!(err.outcome(), ErrorOutcome::NotFound);

    let entry = engine.archive(owner, EntityKind::Note, note.id).unwrap();
    assert_eq!(
        engine.detail(stranger, entry.id).unwrap_err().outcome(),
        ErrorOutcome::NotFound
    );
    assert_eq!(
        engine.restore(stranger, entry.id).unwrap_err().outcome(),
        ErrorOutcome::NotFound
    );
    assert_eq!(
        engine.permanent_delete(stranger, entry.id).unwrap_err().outcome(),
        ErrorOutcome::NotFound
    );
    assert_eq!(entry_count(&conn, note.id), 1);
}

#[test]
fn invalid_list_query_is_a_validation_error() {
    let mut conn = open_db_in_memory().unwrap();
    let registry = GatewayRegistry::with_builtin();
    let engine = ArchiveEngine::new(&mut conn, &registry);

    let query = ArchiveQuery {
        page: 0,
        ..ArchiveQuery::default()
    };
    let err = engine.list(Uuid::new_v4(), &query).unwrap_err();
    assert!(matches!(err, ArchiveError::Validation(_)));
    assert_eq!(err.outcome(), ErrorOutcome::BadRequest);
}

#[test]
fn list_falls_back_to_snapshot_metadata_when_summary_is_missing() {
    let mut conn = open_db_in_memory().unwrap();
    let registry = GatewayRegistry::with_builtin();
    let owner = Uuid::new_v4();
    let note = Note::new(owner, "Legacy", "Written before summaries existed");
    seed(&conn, &SqliteNoteGateway, note.clone());

    let entry = ArchiveEngine::new(&mut conn, &registry)
        .archive(owner, EntityKind::Note, note.id)
        .unwrap();
    conn.execute(
        "UPDATE archive_entries SET summary_json = NULL WHERE id = ?1;",
        [entry.id.to_string()],
    )
    .unwrap();

    let engine = ArchiveEngine::new(&mut conn, &registry);
    let page = engine.list(owner, &ArchiveQuery::default()).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].summary.title, "Legacy");
    assert_eq!(
        page.items[0].summary.field("bodyLength"),
        Some(&FieldValue::Count(32))
    );
}

#[test]
fn kind_counts_cover_every_registered_kind() {
    let mut conn = open_db_in_memory().unwrap();
    let registry = GatewayRegistry::with_builtin();
    let owner = Uuid::new_v4();
    let first = Note::new(owner, "A", "");
    let second = Note::new(owner, "B", "");
    let goal = Goal::new(owner, "Car", 900_000, "USD");
    seed(&conn, &SqliteNoteGateway, first.clone());
    seed(&conn, &SqliteNoteGateway, second.clone());
    seed(&conn, &SqliteGoalGateway, goal.clone());

    let mut engine = ArchiveEngine::new(&mut conn, &registry);
    engine.archive(owner, EntityKind::Note, first.id).unwrap();
    engine.archive(owner, EntityKind::Note, second.id).unwrap();
    engine.archive(owner, EntityKind::Goal, goal.id).unwrap();

    let counts = engine.kind_counts(owner).unwrap();
    assert_eq!(counts.total, 3);
    assert_eq!(counts.get(EntityKind::Note), 2);
    assert_eq!(counts.get(EntityKind::Goal), 1);
    assert_eq!(counts.get(EntityKind::Task), 0);
    assert_eq!(counts.per_kind.len(), 5);

    let empty = engine.kind_counts(Uuid::new_v4()).unwrap();
    assert_eq!(empty.total, 0);
}
