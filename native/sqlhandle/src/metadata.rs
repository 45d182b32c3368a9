/// Database metadata and introspection functions
///
/// This module provides functions to query database metadata and state information,
/// such as the number of affected rows, last inserted row IDs, and autocommit mode.
/// All of them are pass-through reads of engine state.
use crate::connection::Connection;
use crate::constants::{ENGINE_SINGLE_THREAD_SQL, TABLE_NAMES_SQL};
use crate::error::{Error, Result};
use crate::utils::safe_lock_arc;
use crate::value::{Value, ValueType};

impl Connection {
    /// Get the number of rows affected by the last statement execution.
    ///
    /// This returns the number of rows modified by the most recent INSERT, UPDATE, or DELETE
    /// statement. For SELECT statements or other statements that don't modify data, the
    /// previous count is kept.
    pub fn changes(&self) -> Result<u64> {
        let entry = self.entry("changes")?;
        let changes = safe_lock_arc(&entry, "changes entry")?.client.changes();
        Ok(changes)
    }

    /// Get the total number of rows affected since this connection was opened.
    ///
    /// Unlike `changes()` which returns only the last statement's impact, this returns
    /// the cumulative total of all rows modified (INSERT, UPDATE, DELETE) since the
    /// connection was established.
    pub fn total_changes(&self) -> Result<u64> {
        let entry = self.entry("total_changes")?;
        let total = safe_lock_arc(&entry, "total_changes entry")?
            .client
            .total_changes();
        Ok(total)
    }

    /// Check if the connection is in autocommit mode.
    ///
    /// Returns `true` if in autocommit mode, `false` if inside a transaction.
    pub fn autocommit(&self) -> Result<bool> {
        let entry = self.entry("autocommit")?;
        let autocommit = safe_lock_arc(&entry, "autocommit entry")?
            .client
            .is_autocommit();
        Ok(autocommit)
    }

    /// Get the rowid of the last inserted row in the current connection.
    ///
    /// Returns 0 if no inserts have occurred in this session.
    pub fn last_insert_rowid(&self) -> Result<i64> {
        let entry = self.entry("last_insert_rowid")?;
        let rowid = safe_lock_arc(&entry, "last_insert_rowid entry")?
            .client
            .last_insert_rowid();
        Ok(rowid)
    }

    /// Names of all tables in the schema catalog, in catalog order.
    pub fn table_names(&self) -> Result<Vec<String>> {
        self.query_all(TABLE_NAMES_SQL)?
            .into_iter()
            .map(|row| match row.into_iter().next() {
                Some(Value::Text(name)) => Ok(name),
                Some(other) => Err(Error::TypeMismatch {
                    expected: ValueType::Text,
                    found: other.value_type(),
                }),
                None => Err(Error::usage("catalog row without a name column")),
            })
            .collect()
    }
}

/// Version string of the linked engine, e.g. `3.45.1`.
pub fn engine_version() -> &'static str {
    libsql::version()
}

/// Whether the engine was compiled with thread-safety enabled.
pub fn engine_thread_safe() -> Result<bool> {
    let value = probe(ENGINE_SINGLE_THREAD_SQL)?;
    Ok(value.as_integer()? == 0)
}

/// First cell of `sql` evaluated on a private in-memory connection.
fn probe(sql: &str) -> Result<Value> {
    let conn = Connection::open_in_memory()?;
    conn.query_all(sql)?
        .into_iter()
        .next()
        .and_then(|row| row.into_iter().next())
        .ok_or_else(|| Error::engine("engine probe", format!("`{sql}` returned no rows")))
}
