/// Utility functions and helpers for sqlhandle
///
/// This module provides the locking helpers and the registry operations
/// shared by `Connection` and `Statement`. No function here holds a registry
/// lock while taking an entry or slot lock.
use crate::constants::{CONNECTION_REGISTRY, STMT_REGISTRY};
use crate::error::{Error, Result};
use crate::models::{ConnectionEntry, StatementSlot};
use std::sync::{Arc, Mutex, MutexGuard};

/// Safely lock a mutex with proper error handling
///
/// Returns a descriptive error if the mutex is poisoned.
pub(crate) fn safe_lock<'a, T>(mutex: &'a Mutex<T>, context: &str) -> Result<MutexGuard<'a, T>> {
    mutex
        .lock()
        .map_err(|e| Error::Poisoned(format!("{context}: {e}")))
}

/// Safely lock an Arc<Mutex<T>> with proper error handling
///
/// Returns a descriptive error if the mutex is poisoned.
pub(crate) fn safe_lock_arc<'a, T>(
    arc_mutex: &'a Arc<Mutex<T>>,
    context: &str,
) -> Result<MutexGuard<'a, T>> {
    arc_mutex
        .lock()
        .map_err(|e| Error::Poisoned(format!("{context} (arc): {e}")))
}

/// Resolve a connection id to its entry, releasing the registry lock before returning.
pub(crate) fn lookup_connection(conn_id: &str) -> Result<Option<Arc<Mutex<ConnectionEntry>>>> {
    let conn_map = safe_lock(&CONNECTION_REGISTRY, "lookup_connection conn_map")?;
    Ok(conn_map.get(conn_id).cloned())
}

/// Resolve a statement id to its slot, releasing the registry lock before returning.
pub(crate) fn lookup_statement(stmt_id: &str) -> Result<Option<Arc<Mutex<StatementSlot>>>> {
    let stmt_registry = safe_lock(&STMT_REGISTRY, "lookup_statement stmt_registry")?;
    Ok(stmt_registry.get(stmt_id).map(|(_, slot)| slot.clone()))
}

/// Insert a freshly prepared statement into the statement registry and the
/// owning connection's tracking set.
pub(crate) fn register_statement(
    conn_id: &str,
    entry: &Arc<Mutex<ConnectionEntry>>,
    stmt_id: &str,
    slot: StatementSlot,
) -> Result<()> {
    safe_lock(&STMT_REGISTRY, "register_statement stmt_registry")?.insert(
        stmt_id.to_string(),
        (conn_id.to_string(), Arc::new(Mutex::new(slot))),
    );
    safe_lock_arc(entry, "register_statement entry")?
        .statements
        .insert(stmt_id.to_string());
    Ok(())
}

/// Remove a statement from the registry and finalize its engine handle.
///
/// Returns the owning connection id, or `None` if the statement was already
/// finalized. The caller is responsible for the tracking set.
pub(crate) fn finalize_statement(stmt_id: &str) -> Result<Option<String>> {
    let removed = safe_lock(&STMT_REGISTRY, "finalize_statement stmt_registry")?.remove(stmt_id);

    let Some((conn_id, slot)) = removed else {
        return Ok(None);
    };

    // Mark the slot finalized even if another holder of the Arc is mid-iteration
    let finalized = safe_lock_arc(&slot, "finalize_statement slot")?.finalize();
    tracing::debug!(stmt_id, conn_id = %conn_id, finalized, "finalized statement");

    Ok(Some(conn_id))
}

/// Drop a statement id from its connection's tracking set, if the connection is still open.
pub(crate) fn untrack_statement(conn_id: &str, stmt_id: &str) -> Result<()> {
    if let Some(entry) = lookup_connection(conn_id)? {
        safe_lock_arc(&entry, "untrack_statement entry")?
            .statements
            .remove(stmt_id);
    }
    Ok(())
}

/// Whether `sql` holds anything for the engine to compile.
///
/// Skips whitespace, `;`, `-- line` comments and `/* block */` comments
/// (an unterminated block comment runs to the end). The engine compiles
/// such input to no program at all, and stepping it reports a bogus error.
pub(crate) fn has_program(sql: &str) -> bool {
    let bytes = sql.as_bytes();
    let len = bytes.len();
    let mut i = 0;

    while i < len {
        match bytes[i] {
            b if b.is_ascii_whitespace() || b == b';' => i += 1,
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                while i < len && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i < len && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    i += 1;
                }
                i += 2;
            }
            _ => return true,
        }
    }

    false
}
