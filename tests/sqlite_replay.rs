use std::collections::HashMap;

use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

use oplog::{
    checksum::ChecksumAlgorithm,
    op::{Operation, SyncAck},
    payload::{NoteCreated, NoteMoved},
    persist::{OpBackend, PersistError, Replay, sqlite::SqliteBackend},
    identity::{self, DeviceIdentity},
    runtime::handle::{LogHealth, RuntimeConfig, spawn_oplog},
    types::OperationType,
};

fn op(identity: &DeviceIdentity, op_type: OperationType, entity_id: &str, ts: i64) -> Operation {
    Operation::new(
        op_type,
        op_type.entity_type(),
        entity_id,
        json!({"title": format!("t{ts}"), "nested": {"b": 1, "a": [1, 2]}}),
        identity,
        ChecksumAlgorithm::Sha256,
        ts,
    )
}

#[test]
fn backend_round_trips_operations_in_insertion_order() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("ops.db");

    let mut backend = SqliteBackend::open(&db_path).expect("open sqlite");
    let identity = identity::provision(&mut backend).expect("identity");
    let first = op(&identity, OperationType::NoteCreated, "n1", 3);
    let second = op(&identity, OperationType::TagCreated, "t1", 1);
    let third = op(&identity, OperationType::NoteTagAdded, "n1", 2);
    for o in [&first, &second, &third] {
        backend.append(o).expect("append");
    }

    let updated = backend
        .mark_synced(&[
            SyncAck {
                operation_id: second.id.clone(),
                server_seq: Some(7),
                synced_at: 50,
            },
            SyncAck {
                operation_id: "ghost".to_string(),
                server_seq: Some(8),
                synced_at: 50,
            },
        ])
        .expect("mark");
    assert_eq!(updated, 1);
    drop(backend);

    let mut reopened = SqliteBackend::open(&db_path).expect("reopen");
    assert_eq!(identity::provision(&mut reopened).expect("identity"), identity);

    let loaded = reopened.load_all().expect("load").operations;
    let mut expected_second = second.clone();
    expected_second.acknowledge(50, Some(7));
    assert_eq!(loaded, vec![first.clone(), expected_second, third.clone()]);
    assert!(loaded.iter().all(Operation::verify_checksum));

    assert_eq!(reopened.count_pending().expect("count"), 2);
    assert_eq!(
        reopened.load_by_entity("n1").expect("by entity").operations,
        vec![first, third]
    );
}

#[test]
fn backend_clear_and_schema_are_idempotent() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("clear.db");

    let mut backend = SqliteBackend::open(&db_path).expect("open");
    let identity = DeviceIdentity::generate();
    backend
        .append(&op(&identity, OperationType::NotebookCreated, "nb1", 1))
        .expect("append");
    assert_eq!(backend.clear().expect("clear"), 1);
    drop(backend);

    let mut reopened = SqliteBackend::open(&db_path).expect("reopen runs schema again");
    assert_eq!(reopened.load_all().expect("load"), Replay::default());
    assert_eq!(reopened.mark_synced(&[]).expect("empty batch"), 0);
}

#[tokio::test]
async fn runtime_reload_reproduces_log() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("reload.db");

    let handle = spawn_oplog(
        Box::new(SqliteBackend::open(&db_path).expect("open")),
        RuntimeConfig::default(),
    );
    handle.initialize().await.expect("init");
    let created = handle
        .log_note_created(
            "n1",
            NoteCreated {
                title: "A".to_string(),
                content: String::new(),
                ..NoteCreated::default()
            },
        )
        .await
        .expect("created");
    let moved = handle
        .log_note_moved(
            "n1",
            NoteMoved {
                old_notebook_id: None,
                new_notebook_id: Some("nb1".to_string()),
            },
        )
        .await
        .expect("moved");
    handle
        .mark_as_synced(vec![created.id.clone()], HashMap::from([(created.id.clone(), 42)]))
        .await
        .expect("ack");
    let identity = handle.device_identity().await.expect("identity");
    handle.shutdown().await.expect("shutdown");

    let reloaded = spawn_oplog(
        Box::new(SqliteBackend::open(&db_path).expect("reopen")),
        RuntimeConfig::default(),
    );
    let status = reloaded.initialize().await.expect("init");
    assert_eq!(status.health, LogHealth::Healthy);
    assert_eq!(status.operations, 2);
    assert_eq!(status.pending, 1);
    assert_eq!(status.corrupted, 0);
    assert_eq!(reloaded.device_identity().await.expect("identity"), identity);

    let ops = reloaded.get_operations_by_entity("n1").await.expect("by entity");
    assert_eq!(ops.len(), 2);
    assert_eq!(ops[0].id, created.id);
    assert_eq!(ops[0].payload, created.payload);
    assert_eq!(ops[0].server_seq, Some(42));
    assert!(ops[0].synced_at.is_some());
    assert_eq!(ops[1], moved);

    assert_eq!(reloaded.clear_all_operations().await.expect("clear"), 2);
    reloaded.shutdown().await.expect("shutdown");

    let emptied = spawn_oplog(
        Box::new(SqliteBackend::open(&db_path).expect("reopen again")),
        RuntimeConfig::default(),
    );
    let status = emptied.initialize().await.expect("init");
    assert_eq!(status.operations, 0);
    assert_eq!(status.pending, 0);
    assert!(emptied.get_pending_operations().await.expect("pending").is_empty());
    emptied.shutdown().await.expect("shutdown");
}

#[test]
fn float_payloads_reload_bit_for_bit() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("floats.db");
    let identity = DeviceIdentity::generate();
    let values = [
        0.1,
        1.0715660391465825e-75,
        2.2250738585072014e-308,
        1e300 / 3.0,
        std::f64::consts::PI,
        -123.456e-200,
        5e-324,
    ];

    let mut backend = SqliteBackend::open(&db_path).expect("open");
    let ops: Vec<Operation> = values
        .iter()
        .enumerate()
        .map(|(i, w)| {
            Operation::new(
                OperationType::NoteUpdated,
                OperationType::NoteUpdated.entity_type(),
                "n1",
                json!({"fields": ["weight"], "changes": {"weight": w, "pair": [w, -w]}}),
                &identity,
                ChecksumAlgorithm::Sha256,
                i as i64,
            )
        })
        .collect();
    for o in &ops {
        backend.append(o).expect("append");
    }
    drop(backend);

    let mut reopened = SqliteBackend::open(&db_path).expect("reopen");
    let replay = reopened.load_all().expect("load");
    assert!(replay.unreadable.is_empty());
    assert_eq!(replay.operations, ops);
    assert!(replay.operations.iter().all(Operation::verify_checksum));
}

#[tokio::test]
async fn unreadable_row_does_not_hide_the_rest_of_the_log() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("broken.db");
    let identity = DeviceIdentity::generate();

    let mut backend = SqliteBackend::open(&db_path).expect("open");
    let broken = op(&identity, OperationType::NoteCreated, "n1", 1);
    let bad_type = op(&identity, OperationType::NotebookCreated, "nb1", 2);
    let kept_a = op(&identity, OperationType::TagCreated, "t1", 3);
    let kept_b = op(&identity, OperationType::NoteCreated, "n2", 4);
    for o in [&broken, &bad_type, &kept_a, &kept_b] {
        backend.append(o).expect("append");
    }
    drop(backend);

    let conn = rusqlite::Connection::open(&db_path).expect("raw open");
    conn.execute(
        "UPDATE operations SET payload = '{broken' WHERE entity_id = 'n1'",
        [],
    )
    .expect("corrupt payload");
    conn.execute(
        "UPDATE operations SET type = 'NOTEBOOK_EXPLODED' WHERE entity_id = 'nb1'",
        [],
    )
    .expect("corrupt type");
    drop(conn);

    let mut reopened = SqliteBackend::open(&db_path).expect("reopen");
    let replay = reopened.load_all().expect("load survives bad rows");
    assert_eq!(replay.operations, vec![kept_a.clone(), kept_b.clone()]);
    assert_eq!(replay.unreadable, vec![broken.id.clone(), bad_type.id.clone()]);
    drop(reopened);

    let handle = spawn_oplog(
        Box::new(SqliteBackend::open(&db_path).expect("reopen")),
        RuntimeConfig::default(),
    );
    let status = handle.initialize().await.expect("init");
    assert_eq!(status.health, LogHealth::Healthy);
    assert_eq!(status.operations, 2);
    assert_eq!(status.pending, 2);
    assert_eq!(status.corrupted, 2);
    let pending: Vec<_> = handle
        .get_pending_operations()
        .await
        .expect("pending")
        .into_iter()
        .map(|o| o.id)
        .collect();
    assert_eq!(pending, vec![kept_a.id, kept_b.id]);
    handle.shutdown().await.expect("shutdown");
}

#[test]
fn server_sequences_beyond_i64_are_rejected() {
    let mut backend = SqliteBackend::open_in_memory().expect("open");
    let identity = DeviceIdentity::generate();

    let mut acked = op(&identity, OperationType::NoteCreated, "n1", 1);
    acked.acknowledge(5, Some(u64::MAX));
    assert!(matches!(backend.append(&acked), Err(PersistError::Corrupt(_))));

    let plain = op(&identity, OperationType::NoteCreated, "n2", 2);
    backend.append(&plain).expect("append");
    let ack = SyncAck {
        operation_id: plain.id.clone(),
        server_seq: Some(i64::MAX as u64 + 1),
        synced_at: 9,
    };
    assert!(matches!(backend.mark_synced(&[ack]), Err(PersistError::Corrupt(_))));

    let replay = backend.load_all().expect("load");
    assert_eq!(replay.operations, vec![plain]);
    assert_eq!(backend.count_pending().expect("count"), 1);
}
