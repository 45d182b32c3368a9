/// Decoding and type conversion utilities
///
/// This module converts between the engine's value representation and
/// [`Value`], reads result rows into reusable buffers, and validates
/// statement ownership.
use crate::error::{Error, Result};
use crate::value::Value;

impl From<libsql::Value> for Value {
    fn from(value: libsql::Value) -> Self {
        match value {
            libsql::Value::Null => Value::Null,
            libsql::Value::Integer(i) => Value::Integer(i),
            libsql::Value::Real(f) => Value::Float(f),
            libsql::Value::Text(t) => Value::Text(t),
            libsql::Value::Blob(b) => Value::Blob(b),
        }
    }
}

impl From<Value> for libsql::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => libsql::Value::Null,
            Value::Integer(i) => libsql::Value::Integer(i),
            Value::Float(f) => libsql::Value::Real(f),
            Value::Text(t) => libsql::Value::Text(t),
            Value::Blob(b) => libsql::Value::Blob(b),
        }
    }
}

/// Engine parameter vector for one execution of a statement.
pub(crate) fn encode_params(params: &[Value]) -> Vec<libsql::Value> {
    params.iter().cloned().map(libsql::Value::from).collect()
}

/// Overwrite `buffer` with the cells of `row`.
///
/// `buffer` is expected to be sized to the statement's column count already.
pub(crate) fn read_row(row: &libsql::Row, buffer: &mut [Value]) -> Result<()> {
    for (i, cell) in buffer.iter_mut().enumerate() {
        let value = row.get::<libsql::Value>(engine_index(i)?).map_err(|e| {
            Error::engine(format!("failed to read column {i}"), e)
        })?;
        *cell = Value::from(value);
    }
    Ok(())
}

/// Resolve a named parameter (including its `:`, `@` or `$` prefix) to its
/// 1-based position.
pub(crate) fn parameter_index(stmt: &libsql::Statement, name: &str) -> Result<Option<usize>> {
    for i in 1..=stmt.parameter_count() {
        if stmt.parameter_name(engine_index(i)?) == Some(name) {
            return Ok(Some(i));
        }
    }
    Ok(None)
}

/// Convert a column or parameter position to the engine's `i32` index.
pub(crate) fn engine_index(index: usize) -> Result<i32> {
    i32::try_from(index)
        .map_err(|_| Error::usage(format!("index {index} exceeds the engine's index range")))
}

/// Verify that a statement belongs to the specified connection
///
/// Returns error if the statement's connection ID doesn't match.
pub(crate) fn verify_statement_ownership(stmt_conn_id: &str, conn_id: &str) -> Result<()> {
    if stmt_conn_id != conn_id {
        return Err(Error::usage("statement does not belong to connection"));
    }
    Ok(())
}
