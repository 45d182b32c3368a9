/// Global constants and registries for sqlhandle
///
/// This module holds the shared Tokio runtime that drives the async engine
/// API, the connection and statement registries, and fixed SQL text.
use lazy_static::lazy_static;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::runtime::Runtime;

use crate::models::{ConnectionEntry, StatementSlot};

/// Type alias to reduce complexity of the statement registry
pub(crate) type StatementEntry = (String, Arc<Mutex<StatementSlot>>);

/// Global Tokio runtime for async engine calls
///
/// Every public operation is synchronous; engine futures are driven to
/// completion here with `block_on`. Calling into this crate from inside
/// another Tokio runtime's async context is not supported.
///
/// IMPORTANT: This panics if Tokio runtime creation fails, which can only happen in
/// extremely rare circumstances (e.g., system has no available threads).
pub static TOKIO_RUNTIME: Lazy<Runtime> = Lazy::new(|| {
    Runtime::new()
        .expect("Failed to initialize Tokio runtime - check system resources and thread limits")
});

/// Default timeout for acquiring a connection handle (in seconds)
pub const DEFAULT_OPEN_TIMEOUT_SECS: u64 = 30;

/// Engine path selecting a private in-memory database
pub const IN_MEMORY: &str = ":memory:";

/// Catalog query behind `Connection::table_names`
pub const TABLE_NAMES_SQL: &str = "SELECT name FROM sqlite_schema WHERE type = 'table'";

pub(crate) const ENGINE_SINGLE_THREAD_SQL: &str =
    "SELECT sqlite_compileoption_used('THREADSAFE=0')";

// Global registry for open connections - Maps connection ID to its engine handle and tracking set
lazy_static! {
    pub(crate) static ref CONNECTION_REGISTRY: Mutex<HashMap<String, Arc<Mutex<ConnectionEntry>>>> =
        Mutex::new(HashMap::new());
}

// Global registry for prepared statements - Maps statement ID to (connection_id, slot)
lazy_static! {
    pub(crate) static ref STMT_REGISTRY: Mutex<HashMap<String, StatementEntry>> =
        Mutex::new(HashMap::new());
}
