//! Tests for connection.rs and metadata.rs - open/close lifecycle, statement
//! tracking, exec helpers and engine pass-through reads

// Allow unwrap() in tests for cleaner test code
#![allow(clippy::unwrap_used)]

use super::test_utils::{setup_test_db, TestDbGuard};
use crate::{engine_thread_safe, engine_version, Connection, Location, StatementState, Value};

#[test]
fn test_open_in_memory_and_roundtrip_rows() {
    let mut conn = Connection::open_in_memory().unwrap();
    assert!(conn.is_open());
    assert_eq!(conn.location(), Some(&Location::InMemory));

    conn.exec("CREATE TABLE t (a INTEGER, b TEXT)")
        .exec("INSERT INTO t VALUES (1, 'x')");
    assert!(conn.diagnostics().is_empty());
    assert_eq!(conn.changes().unwrap(), 1);

    let rows = conn.prepare("SELECT * FROM t").unwrap().all_rows();
    assert_eq!(rows, vec![vec![Value::Integer(1), Value::text("x")]]);
}

#[test]
fn test_in_memory_databases_are_private() {
    let a = Connection::open_in_memory().unwrap();
    let b = Connection::open("").unwrap();
    assert_eq!(b.location(), Some(&Location::InMemory));

    a.try_exec("CREATE TABLE only_in_a (x)").unwrap();
    assert_eq!(a.table_names().unwrap(), vec!["only_in_a".to_string()]);
    assert!(b.table_names().unwrap().is_empty());
}

#[test]
fn test_file_database_persists_across_connections() {
    let db_path = setup_test_db("persist");
    let _guard = TestDbGuard::new(db_path.clone());

    {
        let conn = Connection::open(&db_path).unwrap();
        conn.try_exec("CREATE TABLE kv (k TEXT, v INTEGER)").unwrap();
        conn.try_exec("INSERT INTO kv VALUES ('a', 1), ('b', 2)").unwrap();
    }

    let conn = Connection::open(&db_path).unwrap();
    assert_eq!(conn.location(), Some(&Location::File(db_path.clone())));
    let rows = conn.query_all("SELECT v FROM kv ORDER BY k").unwrap();
    assert_eq!(rows, vec![vec![Value::Integer(1)], vec![Value::Integer(2)]]);
}

#[test]
fn test_close_finalizes_every_tracked_statement() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.try_exec("CREATE TABLE t (a)").unwrap();

    let mut statements: Vec<_> = (0..3)
        .map(|_| conn.prepare("SELECT a FROM t").unwrap())
        .collect();
    assert_eq!(conn.live_statements().unwrap(), 3);
    for stmt in &statements {
        assert!(conn.is_tracking(stmt).unwrap());
    }

    let finalized = conn.try_close().unwrap();
    assert_eq!(finalized, 3);
    assert!(!conn.is_open());
    assert_eq!(conn.live_statements().unwrap(), 0);

    for stmt in &mut statements {
        assert_eq!(stmt.state().unwrap(), StatementState::Closed);
        // Late calls after the connection closed are quiet no-ops
        stmt.bind(1, 5i64).each_row().close();
        assert!(stmt.all_rows().is_empty());
        assert!(stmt.diagnostics().is_empty());
    }
}

#[test]
fn test_close_is_idempotent() {
    let mut conn = Connection::open_in_memory().unwrap();
    assert_eq!(conn.try_close().unwrap(), 0);
    assert_eq!(conn.try_close().unwrap(), 0);
    conn.close().close();
    assert!(conn.diagnostics().is_empty());
    assert!(!conn.is_open());
}

#[test]
fn test_statement_close_leaves_tracking_set_once() {
    let conn = Connection::open_in_memory().unwrap();
    let mut first = conn.prepare("SELECT 1").unwrap();
    let second = conn.prepare("SELECT 2").unwrap();
    assert_eq!(conn.live_statements().unwrap(), 2);

    first.try_close().unwrap();
    assert_eq!(conn.live_statements().unwrap(), 1);
    assert!(!conn.is_tracking(&first).unwrap());
    assert!(conn.is_tracking(&second).unwrap());

    first.try_close().unwrap();
    assert_eq!(conn.live_statements().unwrap(), 1);

    drop(second);
    assert_eq!(conn.live_statements().unwrap(), 0);
}

#[test]
fn test_statement_from_other_connection_is_not_tracked() {
    let a = Connection::open_in_memory().unwrap();
    let b = Connection::open_in_memory().unwrap();
    let stmt = a.prepare("SELECT 1").unwrap();
    assert!(a.is_tracking(&stmt).unwrap());
    assert!(!b.is_tracking(&stmt).unwrap());
}

#[test]
fn test_reopen_closes_previous_handle_first() {
    let db_path = setup_test_db("reopen");
    let _guard = TestDbGuard::new(db_path.clone());

    let mut conn = Connection::open_in_memory().unwrap();
    let first_id = conn.id().unwrap().to_string();
    let stmt = conn.prepare("SELECT 1").unwrap();

    conn.reopen(&db_path).unwrap();
    assert!(conn.is_open());
    assert_ne!(conn.id().unwrap(), first_id);
    assert!(stmt.is_closed());
    assert_eq!(conn.live_statements().unwrap(), 0);
    assert_eq!(conn.location(), Some(&Location::File(db_path.clone())));
}

#[test]
fn test_take_moves_handle_and_leaves_source_closed() {
    let mut source = Connection::open_in_memory().unwrap();
    source.try_exec("CREATE TABLE moved (x)").unwrap();
    let stmt = source.prepare("SELECT x FROM moved").unwrap();

    let target = std::mem::take(&mut source);
    assert!(!source.is_open());
    assert!(source.prepare("SELECT 1").unwrap_err().is_usage());
    drop(source);

    // The tracking set travelled with the handle
    assert!(target.is_tracking(&stmt).unwrap());
    assert_eq!(target.table_names().unwrap(), vec!["moved".to_string()]);
}

#[test]
fn test_exec_with_callbacks() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.exec("CREATE TABLE people (name TEXT, age INTEGER)")
        .exec("INSERT INTO people VALUES ('ann', 31), ('bob', 42)");

    let mut ages = Vec::new();
    conn.exec_values("SELECT age FROM people ORDER BY age", |row| {
        ages.push(row[0].as_integer().unwrap());
    });
    assert_eq!(ages, vec![31, 42]);

    let mut seen = Vec::new();
    conn.exec_with_columns("SELECT name, age FROM people ORDER BY name", |cols, row| {
        seen.push(format!("{}={} {}={}", cols[0], row[0], cols[1], row[1]));
    });
    assert_eq!(seen, vec!["name=ann age=31", "name=bob age=42"]);
    assert!(conn.diagnostics().is_empty());

    // Temporary statements from exec are not left behind
    assert_eq!(conn.live_statements().unwrap(), 0);
}

#[test]
fn test_changes_and_total_changes() {
    let conn = Connection::open_in_memory().unwrap();
    conn.try_exec("CREATE TABLE n (x INTEGER)").unwrap();
    conn.try_exec("INSERT INTO n VALUES (1), (2), (3)").unwrap();
    assert_eq!(conn.changes().unwrap(), 3);

    conn.try_exec("UPDATE n SET x = x + 1 WHERE x > 1").unwrap();
    assert_eq!(conn.changes().unwrap(), 2);
    assert_eq!(conn.total_changes().unwrap(), 5);

    let stmt = conn.prepare("DELETE FROM n").unwrap();
    assert_eq!(stmt.changes().unwrap(), 2);
}

#[test]
fn test_last_insert_rowid() {
    let conn = Connection::open_in_memory().unwrap();
    conn.try_exec("CREATE TABLE r (id INTEGER PRIMARY KEY, v TEXT)").unwrap();
    conn.try_exec("INSERT INTO r (id, v) VALUES (41, 'a')").unwrap();
    conn.try_exec("INSERT INTO r (v) VALUES ('b')").unwrap();
    assert_eq!(conn.last_insert_rowid().unwrap(), 42);
}

#[test]
fn test_autocommit_follows_transactions() {
    let conn = Connection::open_in_memory().unwrap();
    assert!(conn.autocommit().unwrap());
    conn.try_exec("BEGIN").unwrap();
    assert!(!conn.autocommit().unwrap());
    conn.try_exec("COMMIT").unwrap();
    assert!(conn.autocommit().unwrap());
}

#[test]
fn test_table_names_in_catalog_order() {
    let conn = Connection::open_in_memory().unwrap();
    conn.try_exec("CREATE TABLE zeta (x)").unwrap();
    conn.try_exec("CREATE TABLE alpha (x)").unwrap();
    conn.try_exec("CREATE INDEX alpha_x ON alpha (x)").unwrap();
    assert_eq!(
        conn.table_names().unwrap(),
        vec!["zeta".to_string(), "alpha".to_string()]
    );
}

#[test]
fn test_busy_timeout_config_is_accepted() {
    let config = crate::ConnectionConfig::in_memory()
        .busy_timeout(std::time::Duration::from_millis(100));
    let conn = Connection::with_config(config).unwrap();
    assert!(conn.is_open());
}

#[test]
fn test_engine_probes() {
    let version = engine_version();
    assert!(version.starts_with("3."), "unexpected version {version}");
    // The linked library and the SQL-level report agree
    let conn = Connection::open_in_memory().unwrap();
    assert_eq!(
        conn.query_all("SELECT sqlite_version()").unwrap(),
        vec![vec![Value::text(version)]]
    );
    assert!(engine_thread_safe().unwrap());
}

#[test]
fn test_exec_runs_only_the_first_statement() {
    let conn = Connection::open_in_memory().unwrap();
    conn.try_exec("CREATE TABLE a (x); CREATE TABLE b (y)").unwrap();
    assert_eq!(conn.table_names().unwrap(), vec!["a".to_string()]);

    conn.try_exec("CREATE TABLE b (y)").unwrap();
    assert_eq!(conn.table_names().unwrap(), vec!["a".to_string(), "b".to_string()]);
}
