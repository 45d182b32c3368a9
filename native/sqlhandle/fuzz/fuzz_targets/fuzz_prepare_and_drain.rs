#![no_main]
//! Structured statement fuzzing
//!
//! Prepares SQL-like input against a scratch table, binds arbitrary values
//! and drains the cursor. Every failure must come back as an `Err`, and
//! closing the connection must finalize whatever was prepared.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sqlhandle::{Connection, Value};

#[derive(Debug, Arbitrary)]
enum Param<'a> {
    Integer(i64),
    Float(f64),
    Text(&'a str),
    Blob(&'a [u8]),
    Null,
}

impl From<&Param<'_>> for Value {
    fn from(param: &Param<'_>) -> Self {
        match param {
            Param::Integer(i) => Value::Integer(*i),
            Param::Float(f) => Value::Float(*f),
            Param::Text(t) => Value::text(*t),
            Param::Blob(b) => Value::blob(*b),
            Param::Null => Value::Null,
        }
    }
}

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    /// Appended to a fixed prefix so most inputs reach the engine cursor
    tail: &'a str,
    use_prefix: bool,
    params: Vec<(u8, Param<'a>)>,
    reset_between: bool,
}

fuzz_target!(|input: Input| {
    let Ok(mut conn) = Connection::open_in_memory() else {
        return;
    };
    let _ = conn.try_exec("CREATE TABLE t (a INTEGER, b TEXT, c BLOB)");

    let sql = if input.use_prefix {
        format!("SELECT a, b, c FROM t WHERE {}", input.tail)
    } else {
        input.tail.to_string()
    };

    if let Ok(mut stmt) = conn.prepare(&sql) {
        for (index, param) in &input.params {
            let _ = stmt.try_bind(usize::from(*index), Value::from(param));
        }
        let _ = stmt.try_all_rows();
        if input.reset_between {
            let _ = stmt.try_reset();
            let _ = stmt.try_all_rows();
        }

        let _ = conn.try_close();
        assert!(stmt.is_closed());
    }
});
