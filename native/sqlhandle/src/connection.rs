/// Connection lifecycle management
///
/// This module handles opening the engine connection, preparing statements
/// against it, and the close sequence: every statement still tracked by the
/// connection is finalized before the engine connection itself is released.
use crate::config::{ConnectionConfig, Location};
use crate::constants::{CONNECTION_REGISTRY, TOKIO_RUNTIME};
use crate::decode;
use crate::error::{Diagnostics, Error, Result};
use crate::models::{ConnectionEntry, StatementSlot};
use crate::statement::{Row, Statement};
use crate::utils::{self, safe_lock, safe_lock_arc};
use crate::value::Value;
use libsql::Builder;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// An open (or closed) link to one database.
///
/// Dropping a `Connection` closes it. Moving it moves the handle; use
/// `std::mem::take` to move the handle out of a place and leave a closed
/// connection behind.
#[derive(Debug, Default)]
pub struct Connection {
    id: Option<String>,
    location: Option<Location>,
    diagnostics: Diagnostics,
}

impl Connection {
    /// Open or create the database file at `path`. An empty path opens a
    /// private in-memory database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_config(ConnectionConfig::file(path))
    }

    /// Open a private, ephemeral in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_config(ConnectionConfig::in_memory())
    }

    pub fn with_config(config: impl Into<ConnectionConfig>) -> Result<Self> {
        let mut conn = Self::default();
        conn.reopen(config)?;
        Ok(conn)
    }

    /// Close this connection (if open) and open `config` in its place.
    ///
    /// On failure the connection is left closed; `prepare` and the other
    /// operations then report usage errors.
    pub fn reopen(&mut self, config: impl Into<ConnectionConfig>) -> Result<()> {
        let config = config.into();

        // Full close sequence first so the previous handle never leaks
        let closed = self.try_close();
        self.diagnostics.record(closed);
        self.location = Some(config.location.clone());

        let entry = open_entry(&config)?;
        let conn_id = Uuid::new_v4().to_string();
        safe_lock(&CONNECTION_REGISTRY, "reopen conn_registry")?
            .insert(conn_id.clone(), Arc::new(Mutex::new(entry)));

        tracing::debug!(conn_id = %conn_id, location = ?config.location, "opened database");
        self.id = Some(conn_id);
        Ok(())
    }

    /// Finalize every tracked statement, then release the engine connection.
    ///
    /// Idempotent. The connection is closed when this returns, even when an
    /// error is reported. Returns the number of statements finalized.
    pub fn try_close(&mut self) -> Result<usize> {
        let Some(conn_id) = self.id.take() else {
            return Ok(0);
        };

        let removed = safe_lock(&CONNECTION_REGISTRY, "close conn_registry")?.remove(&conn_id);
        let Some(entry) = removed else {
            return Err(Error::usage(format!("connection {conn_id} not found")));
        };

        let tracked = std::mem::take(&mut safe_lock_arc(&entry, "close entry")?.statements);

        let mut finalized = 0;
        let mut first_error = None;
        for stmt_id in &tracked {
            match utils::finalize_statement(stmt_id) {
                Ok(Some(_)) => finalized += 1,
                Ok(None) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        // Statements are gone; only now may the engine connection go
        match Arc::try_unwrap(entry) {
            Ok(entry) => {
                let entry = entry
                    .into_inner()
                    .map_err(|e| Error::Poisoned(format!("close entry: {e}")))?;
                let ConnectionEntry { client, db, .. } = entry;
                drop(client);
                drop(db);
            }
            Err(_) => {
                first_error.get_or_insert(Error::engine(
                    "failed to close database (may cause memory leak)",
                    "connection handle is still referenced",
                ));
            }
        }

        tracing::debug!(conn_id = %conn_id, finalized, "closed database");
        match first_error {
            Some(e) => Err(e),
            None => Ok(finalized),
        }
    }

    /// Close, recording any failure in [`Connection::diagnostics`].
    pub fn close(&mut self) -> &mut Self {
        let result = self.try_close();
        self.diagnostics.record(result);
        self
    }

    pub fn is_open(&self) -> bool {
        self.id.is_some()
    }

    /// Registry id of the open connection.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Location of the most recent open attempt.
    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    /// Prepare `sql` and track the resulting statement.
    ///
    /// Syntax errors are reported here rather than on first step, so every
    /// `Statement` that exists is live and tracked. Only the first statement
    /// of `sql` is compiled; any text after its terminating `;` is ignored.
    /// Blank or comment-only `sql` yields a statement that runs no program and
    /// finishes immediately.
    #[allow(clippy::await_holding_lock)]
    pub fn prepare(&self, sql: &str) -> Result<Statement> {
        let conn_id = self.open_id("prepare")?;
        let entry = self.entry("prepare")?;

        let stmt = TOKIO_RUNTIME.block_on(async {
            let entry_guard = safe_lock_arc(&entry, "prepare entry")?;
            entry_guard
                .client
                .prepare(sql)
                .await
                .map_err(|e| Error::engine("prepare failed", e))
        })?;

        let columns: Vec<String> = stmt
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect();
        let parameter_count = stmt.parameter_count();

        let stmt_id = Uuid::new_v4().to_string();
        utils::register_statement(
            conn_id,
            &entry,
            &stmt_id,
            StatementSlot::new(stmt, parameter_count, utils::has_program(sql)),
        )?;
        tracing::debug!(conn_id, stmt_id = %stmt_id, sql, "prepared statement");

        Ok(Statement::new(
            stmt_id,
            conn_id.to_string(),
            sql.to_string(),
            columns,
            parameter_count,
        ))
    }

    /// Prepare `sql` and run it to completion, discarding rows.
    ///
    /// Like [`Connection::prepare`], this runs only the first statement in
    /// `sql`; issue one call per statement. Blank input is a no-op.
    pub fn try_exec(&self, sql: &str) -> Result<()> {
        let mut stmt = self.prepare(sql)?;
        stmt.try_each_row()
    }

    /// Prepare `sql` and call `callback` with the values of each row.
    pub fn try_exec_values<F>(&self, sql: &str, callback: F) -> Result<()>
    where
        F: FnMut(&[Value]),
    {
        let mut stmt = self.prepare(sql)?;
        stmt.try_each_row_values(callback)
    }

    /// Prepare `sql` and call `callback` with the column names and values of each row.
    pub fn try_exec_with_columns<F>(&self, sql: &str, callback: F) -> Result<()>
    where
        F: FnMut(&[String], &[Value]),
    {
        let mut stmt = self.prepare(sql)?;
        stmt.try_each_row_with_columns(callback)
    }

    pub fn exec(&mut self, sql: &str) -> &mut Self {
        let result = self.try_exec(sql);
        self.diagnostics.record(result);
        self
    }

    pub fn exec_values<F>(&mut self, sql: &str, callback: F) -> &mut Self
    where
        F: FnMut(&[Value]),
    {
        let result = self.try_exec_values(sql, callback);
        self.diagnostics.record(result);
        self
    }

    pub fn exec_with_columns<F>(&mut self, sql: &str, callback: F) -> &mut Self
    where
        F: FnMut(&[String], &[Value]),
    {
        let result = self.try_exec_with_columns(sql, callback);
        self.diagnostics.record(result);
        self
    }

    /// Prepare, run and collect every row of `sql`.
    pub fn query_all(&self, sql: &str) -> Result<Vec<Row>> {
        self.prepare(sql)?.try_all_rows()
    }

    /// Number of statements prepared on this connection and not yet closed.
    pub fn live_statements(&self) -> Result<usize> {
        if self.id.is_none() {
            return Ok(0);
        }
        let entry = self.entry("live_statements")?;
        let count = safe_lock_arc(&entry, "live_statements entry")?
            .statements
            .len();
        Ok(count)
    }

    /// Whether `stmt` was prepared here and is still tracked.
    pub fn is_tracking(&self, stmt: &Statement) -> Result<bool> {
        let Some(conn_id) = self.id.as_deref() else {
            return Ok(false);
        };
        if decode::verify_statement_ownership(stmt.connection_id(), conn_id).is_err() {
            return Ok(false);
        }
        let entry = self.entry("is_tracking")?;
        let tracked = safe_lock_arc(&entry, "is_tracking entry")?
            .statements
            .contains(stmt.id());
        Ok(tracked)
    }

    fn open_id(&self, operation: &str) -> Result<&str> {
        self.id
            .as_deref()
            .ok_or_else(|| Error::usage(format!("{operation} on a closed connection")))
    }

    /// Registry entry of the open connection.
    pub(crate) fn entry(&self, operation: &str) -> Result<Arc<Mutex<ConnectionEntry>>> {
        let conn_id = self.open_id(operation)?;
        utils::lookup_connection(conn_id)?
            .ok_or_else(|| Error::usage(format!("{operation}: connection {conn_id} not found")))
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Err(e) = self.try_close() {
            tracing::warn!(error = %e, "error while closing connection on drop");
        }
    }
}

/// Acquire the engine database and connection described by `config`.
fn open_entry(config: &ConnectionConfig) -> Result<ConnectionEntry> {
    let path = config.location.engine_path().to_path_buf();
    let busy_timeout = config.busy_timeout;
    let open_timeout = config.open_timeout;

    // Wrap the whole open with a timeout using the global runtime.
    TOKIO_RUNTIME.block_on(async {
        tokio::time::timeout(open_timeout, async {
            let db = Builder::new_local(&path).build().await.map_err(|e| {
                Error::engine(format!("failed to open database `{}`", path.display()), e)
            })?;

            let client = db.connect().map_err(|e| {
                Error::engine(format!("failed to open database `{}`", path.display()), e)
            })?;

            if let Some(timeout) = busy_timeout {
                client
                    .busy_timeout(timeout)
                    .map_err(|e| Error::engine("busy_timeout failed", e))?;
            }

            Ok(ConnectionEntry {
                client,
                db,
                statements: HashSet::new(),
            })
        })
        .await
        .map_err(|_| {
            Error::engine(
                format!("failed to open database `{}`", path.display()),
                format!("timed out after {} ms", open_timeout.as_millis()),
            )
        })?
    })
}
