/// Data structures held in the registries
///
/// A [`ConnectionEntry`] owns the engine database and connection together
/// with the ids of the statements prepared on it. A [`StatementSlot`] owns
/// one engine statement, its live cursor and its bound parameters.
use crate::value::Value;
use std::collections::HashSet;

/// Engine state behind an open `Connection`.
pub(crate) struct ConnectionEntry {
    /// Declared before `db` so it is dropped first
    pub client: libsql::Connection,
    pub db: libsql::Database,
    /// Ids of statements prepared here and not yet finalized
    pub statements: HashSet<String>,
}

/// Engine state behind a `Statement`.
///
/// `stmt` is `None` once finalized; a finalized slot is also gone from the
/// statement registry.
pub(crate) struct StatementSlot {
    pub stmt: Option<libsql::Statement>,
    /// Live cursor while `cursor` is `HasRow`
    pub rows: Option<libsql::Rows>,
    /// One entry per positional parameter, `Null` when unbound
    pub params: Vec<Value>,
    pub cursor: Cursor,
    /// False for blank or comment-only SQL; such a statement runs to `Done` at once
    pub has_program: bool,
    /// Set when `params` changes after the current run started
    pub rebound: bool,
}

impl StatementSlot {
    pub fn new(stmt: libsql::Statement, parameter_count: usize, has_program: bool) -> Self {
        Self {
            stmt: Some(stmt),
            rows: None,
            params: vec![Value::Null; parameter_count],
            cursor: Cursor::Ready,
            has_program,
            rebound: false,
        }
    }

    /// Note a parameter change; it only reaches the engine at the next run.
    pub fn mark_rebound(&mut self) {
        if self.cursor != Cursor::Ready {
            self.rebound = true;
        }
    }

    /// Drop the cursor before the statement it reads from.
    pub fn finalize(&mut self) -> bool {
        self.rows = None;
        self.cursor = Cursor::Done;
        self.stmt.take().is_some()
    }

    pub fn state(&self) -> StatementState {
        if self.stmt.is_none() {
            return StatementState::Closed;
        }
        match self.cursor {
            Cursor::Ready => StatementState::Ready,
            Cursor::HasRow => StatementState::HasRow,
            Cursor::Done => StatementState::Done,
        }
    }
}

/// Cursor position of a live engine statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Cursor {
    Ready,
    HasRow,
    Done,
}

/// Observable lifecycle state of a [`crate::Statement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementState {
    /// Prepared or reset, no row fetched yet
    Ready,
    /// A row was fetched and more may follow
    HasRow,
    /// Every row was consumed; `reset` makes the statement runnable again
    Done,
    /// Finalized, either directly or by closing the owning connection
    Closed,
}
