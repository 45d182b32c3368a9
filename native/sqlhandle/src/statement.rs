/// Prepared statement management
///
/// This module handles prepared statements, including:
/// - Binding positional and named parameters
/// - Stepping the engine cursor and reading rows into `Value`s
/// - Reset, clearing bindings, and finalization
/// - Column and parameter introspection
///
/// A `Statement` holds only its own registry id and the id of its connection.
/// Its engine handle lives in the statement registry, so closing the owning
/// connection finalizes it without touching the `Statement` value; afterwards
/// every operation on it is a no-op.
use crate::constants::TOKIO_RUNTIME;
use crate::decode;
use crate::error::{Diagnostics, Error, Result};
use crate::models::{Cursor, StatementSlot, StatementState};
use crate::utils::{self, safe_lock_arc};
use crate::value::Value;
use std::sync::{Arc, Mutex};

/// One result row, in column order.
pub type Row = Vec<Value>;

/// A prepared statement bound to the connection that prepared it.
///
/// Created only by [`crate::Connection::prepare`]. Dropping a `Statement`
/// finalizes it and removes it from its connection's tracking set.
#[derive(Debug)]
pub struct Statement {
    id: String,
    conn_id: String,
    sql: String,
    columns: Vec<String>,
    parameter_count: usize,
    diagnostics: Diagnostics,
}

impl Statement {
    pub(crate) fn new(
        id: String,
        conn_id: String,
        sql: String,
        columns: Vec<String>,
        parameter_count: usize,
    ) -> Self {
        Self {
            id,
            conn_id,
            sql,
            columns,
            parameter_count,
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Id of the owning connection.
    pub fn connection_id(&self) -> &str {
        &self.conn_id
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    pub fn state(&self) -> Result<StatementState> {
        match self.slot()? {
            Some(slot) => Ok(safe_lock_arc(&slot, "state slot")?.state()),
            None => Ok(StatementState::Closed),
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state(), Ok(StatementState::Closed))
    }

    // ------------------------------------------------------------------
    // Binding
    // ------------------------------------------------------------------

    /// Bind `value` to the 1-based parameter `index`.
    ///
    /// Passing an owned `Value` moves it into the statement; passing `&Value`
    /// copies it. Binding on a closed statement does nothing.
    pub fn try_bind(&mut self, index: usize, value: impl Into<Value>) -> Result<()> {
        let Some(slot) = self.slot()? else {
            return Ok(());
        };
        let mut guard = safe_lock_arc(&slot, "bind slot")?;
        if guard.stmt.is_none() {
            return Ok(());
        }

        let count = guard.params.len();
        if index == 0 || index > count {
            return Err(Error::usage(format!(
                "bind index {index} out of range (statement has {count} parameters)"
            )));
        }
        guard.params[index - 1] = value.into();
        guard.mark_rebound();
        Ok(())
    }

    /// Bind `value` to the parameter called `name`, prefix included (`:id`, `@id`, `$id`).
    pub fn try_bind_named(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let Some(slot) = self.slot()? else {
            return Ok(());
        };
        let index = {
            let guard = safe_lock_arc(&slot, "bind_named slot")?;
            let Some(stmt) = guard.stmt.as_ref() else {
                return Ok(());
            };
            decode::parameter_index(stmt, name)?
                .ok_or_else(|| Error::usage(format!("no parameter named `{name}`")))?
        };
        self.try_bind(index, value)
    }

    pub fn bind(&mut self, index: usize, value: impl Into<Value>) -> &mut Self {
        let result = self.try_bind(index, value);
        self.diagnostics.record(result);
        self
    }

    pub fn bind_named(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        let result = self.try_bind_named(name, value);
        self.diagnostics.record(result);
        self
    }

    /// Rewind the cursor to `Ready`, keeping bound values.
    pub fn try_reset(&mut self) -> Result<()> {
        let Some(slot) = self.slot()? else {
            return Ok(());
        };
        let mut guard = safe_lock_arc(&slot, "reset slot")?;
        let slot = &mut *guard;
        slot.rows = None;
        if let Some(stmt) = slot.stmt.as_mut() {
            stmt.reset();
            slot.cursor = Cursor::Ready;
        }
        Ok(())
    }

    /// Unbind every parameter; unbound parameters read as `NULL`.
    pub fn try_clear_bindings(&mut self) -> Result<()> {
        let Some(slot) = self.slot()? else {
            return Ok(());
        };
        let mut guard = safe_lock_arc(&slot, "clear_bindings slot")?;
        if guard.stmt.is_none() {
            return Ok(());
        }
        guard.params.iter_mut().for_each(|param| *param = Value::Null);
        guard.mark_rebound();
        Ok(())
    }

    pub fn reset(&mut self) -> &mut Self {
        let result = self.try_reset();
        self.diagnostics.record(result);
        self
    }

    pub fn clear_bindings(&mut self) -> &mut Self {
        let result = self.try_clear_bindings();
        self.diagnostics.record(result);
        self
    }

    /// Current bound value of the 1-based parameter `index`.
    pub fn bound_value(&self, index: usize) -> Result<Option<Value>> {
        let Some(slot) = self.slot()? else {
            return Ok(None);
        };
        let guard = safe_lock_arc(&slot, "bound_value slot")?;
        Ok(index
            .checked_sub(1)
            .and_then(|i| guard.params.get(i))
            .cloned())
    }

    // ------------------------------------------------------------------
    // Row iteration
    // ------------------------------------------------------------------

    /// Advance the cursor by one row.
    ///
    /// On `Ok(true)` the row has been written into `row` (when given). On an
    /// engine failure the cursor is parked at `Done`; the handle stays open.
    fn step(&self, row: Option<&mut [Value]>) -> Result<bool> {
        let Some(slot) = self.slot()? else {
            return Ok(false);
        };
        step_slot(&slot, row)
    }

    /// Run the statement to completion without materializing rows.
    ///
    /// A finished statement stays `Done` until [`Statement::try_reset`]; new
    /// bindings do not restart it. Blank or comment-only SQL finishes at once.
    pub fn try_each_row(&mut self) -> Result<()> {
        while self.step(None)? {}
        Ok(())
    }

    /// Call `callback` with the values of each row, reusing one row buffer.
    pub fn try_each_row_values<F>(&mut self, mut callback: F) -> Result<()>
    where
        F: FnMut(&[Value]),
    {
        let mut buffer = vec![Value::Null; self.columns.len()];
        while self.step(Some(buffer.as_mut_slice()))? {
            callback(buffer.as_slice());
        }
        Ok(())
    }

    /// Call `callback` with the column names and the values of each row.
    pub fn try_each_row_with_columns<F>(&mut self, mut callback: F) -> Result<()>
    where
        F: FnMut(&[String], &[Value]),
    {
        let columns = self.column_names();
        self.try_each_row_values(|values| callback(columns.as_slice(), values))
    }

    /// Collect every remaining row in cursor order.
    pub fn try_all_rows(&mut self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        self.try_each_row_values(|values| rows.push(values.to_vec()))?;
        Ok(rows)
    }

    pub fn each_row(&mut self) -> &mut Self {
        let result = self.try_each_row();
        self.diagnostics.record(result);
        self
    }

    pub fn each_row_values<F>(&mut self, callback: F) -> &mut Self
    where
        F: FnMut(&[Value]),
    {
        let result = self.try_each_row_values(callback);
        self.diagnostics.record(result);
        self
    }

    pub fn each_row_with_columns<F>(&mut self, callback: F) -> &mut Self
    where
        F: FnMut(&[String], &[Value]),
    {
        let result = self.try_each_row_with_columns(callback);
        self.diagnostics.record(result);
        self
    }

    /// Collect every remaining row. A failure is recorded and the rows read
    /// before it are returned.
    pub fn all_rows(&mut self) -> Vec<Row> {
        let mut rows = Vec::new();
        let result = self.try_each_row_values(|values| rows.push(values.to_vec()));
        self.diagnostics.record(result);
        rows
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Name of the 0-based result column `index`.
    pub fn try_column_name(&self, index: usize) -> Result<&str> {
        self.columns.get(index).map(String::as_str).ok_or_else(|| {
            Error::usage(format!(
                "column index {index} out of bounds (statement has {} columns)",
                self.columns.len()
            ))
        })
    }

    /// Name of column `index`, or an empty string (with a recorded error) when out of range.
    pub fn column_name(&mut self, index: usize) -> String {
        let result = self.try_column_name(index).map(str::to_owned);
        self.diagnostics.record(result).unwrap_or_default()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.clone()
    }

    /// Rows changed by the most recent modifying statement on the owning connection.
    pub fn changes(&self) -> Result<u64> {
        let entry = utils::lookup_connection(&self.conn_id)?
            .ok_or_else(|| Error::usage("changes: owning connection is closed"))?;
        let changes = safe_lock_arc(&entry, "statement changes entry")?
            .client
            .changes();
        Ok(changes)
    }

    // ------------------------------------------------------------------
    // Close
    // ------------------------------------------------------------------

    /// Finalize the engine statement and leave the connection's tracking set.
    ///
    /// Idempotent; also a no-op after the owning connection was closed.
    pub fn try_close(&mut self) -> Result<()> {
        let Some(conn_id) = utils::finalize_statement(&self.id)? else {
            return Ok(());
        };
        utils::untrack_statement(&conn_id, &self.id)
    }

    pub fn close(&mut self) -> &mut Self {
        let result = self.try_close();
        self.diagnostics.record(result);
        self
    }

    fn slot(&self) -> Result<Option<Arc<Mutex<StatementSlot>>>> {
        utils::lookup_statement(&self.id)
    }
}

impl Drop for Statement {
    fn drop(&mut self) {
        if let Err(e) = self.try_close() {
            tracing::warn!(stmt_id = %self.id, error = %e, "error while closing statement on drop");
        }
    }
}

/// One step of the cursor state machine.
///
/// `Ready` executes the statement with the bound parameters, `HasRow` fetches
/// the next row, `Done` yields nothing until the statement is reset. Iterating
/// a `Done` statement whose bindings changed since its run is a usage error.
fn step_slot(slot: &Arc<Mutex<StatementSlot>>, row: Option<&mut [Value]>) -> Result<bool> {
    let mut guard = safe_lock_arc(slot, "step slot")?;
    let slot = &mut *guard;
    let Some(stmt) = slot.stmt.as_mut() else {
        return Ok(false);
    };

    match slot.cursor {
        Cursor::Done if slot.rebound => {
            return Err(Error::usage(
                "bindings changed after the statement finished; reset it to run again",
            ));
        }
        Cursor::Done => return Ok(false),
        Cursor::HasRow => {}
        Cursor::Ready if !slot.has_program => {
            slot.cursor = Cursor::Done;
            return Ok(false);
        }
        Cursor::Ready => {
            slot.rebound = false;
            stmt.reset();
            let params = decode::encode_params(&slot.params);
            match TOKIO_RUNTIME.block_on(stmt.query(params)) {
                Ok(rows) => slot.rows = Some(rows),
                Err(e) => {
                    slot.cursor = Cursor::Done;
                    return Err(Error::engine("step failed", e));
                }
            }
        }
    }

    let Some(rows) = slot.rows.as_mut() else {
        slot.cursor = Cursor::Done;
        return Ok(false);
    };

    match TOKIO_RUNTIME.block_on(rows.next()) {
        Ok(Some(next)) => {
            slot.cursor = Cursor::HasRow;
            if let Some(buffer) = row {
                decode::read_row(&next, buffer)?;
            }
            Ok(true)
        }
        Ok(None) => {
            slot.rows = None;
            slot.cursor = Cursor::Done;
            Ok(false)
        }
        Err(e) => {
            slot.rows = None;
            slot.cursor = Cursor::Done;
            Err(Error::engine("step failed", e))
        }
    }
}
