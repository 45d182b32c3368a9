//! `sqlhandle`: deterministic resource management over an embedded LibSQL/SQLite engine
//!
//! This is the root module of the crate. A [`Connection`] owns one engine
//! connection and tracks every [`Statement`] it has prepared; closing the
//! connection finalizes all of them before the engine connection is released.
//! Values cross the boundary as the closed [`Value`] sum type.
//!
//! ```no_run
//! use sqlhandle::{Connection, Value};
//!
//! # fn main() -> sqlhandle::Result<()> {
//! let mut conn = Connection::open_in_memory()?;
//! conn.try_exec("CREATE TABLE t (a INTEGER, b TEXT)")?;
//! conn.try_exec("INSERT INTO t VALUES (1, 'x')")?;
//! assert_eq!(conn.changes()?, 1);
//!
//! let rows = conn.prepare("SELECT * FROM t")?.try_all_rows()?;
//! assert_eq!(rows, vec![vec![Value::Integer(1), Value::text("x")]]);
//! # Ok(())
//! # }
//! ```
pub mod config;
pub mod connection;
pub mod constants;
pub mod decode;
pub mod error;
pub mod metadata;
pub mod models;
pub mod statement;
pub mod utils;
pub mod value;

// Re-export key types for callers
pub use config::{ConnectionConfig, Location};
pub use connection::Connection;
pub use error::{Diagnostics, Error, Result};
pub use metadata::{engine_thread_safe, engine_version};
pub use models::StatementState;
pub use statement::{Row, Statement};
pub use value::{FromValue, Value, ValueType};

#[cfg(test)]
mod tests;
