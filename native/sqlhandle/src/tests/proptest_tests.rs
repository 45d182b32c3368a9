//! Property-based tests using proptest
//!
//! These tests verify invariants that should hold for all inputs,
//! helping catch edge cases that unit tests might miss.

// Allow unwrap() in tests for cleaner test code
#![allow(clippy::unwrap_used)]

use crate::{Connection, Value, ValueType};
use proptest::prelude::*;

const ALL_TYPES: [ValueType; 5] = [
    ValueType::Integer,
    ValueType::Float,
    ValueType::Text,
    ValueType::Blob,
    ValueType::Null,
];

/// Values the engine stores without normalization (NaN would come back as NULL).
fn any_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::Integer),
        (-1.0e12f64..1.0e12).prop_map(Value::Float),
        "\\PC{0,40}".prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..64).prop_map(Value::Blob),
        Just(Value::Null),
    ]
}

/// True when `v.get::<T>()` for the payload type of `tag` succeeds.
fn narrows_to(v: &Value, tag: ValueType) -> bool {
    match tag {
        ValueType::Integer => v.get::<i64>().is_ok(),
        ValueType::Float => v.get::<f64>().is_ok(),
        ValueType::Text => v.get::<&str>().is_ok(),
        ValueType::Blob => v.get::<&[u8]>().is_ok(),
        ValueType::Null => v.get::<()>().is_ok(),
    }
}

proptest! {
    /// Property: exactly one downcast succeeds, the one matching the tag
    #[test]
    fn downcast_succeeds_only_for_active_tag(v in any_value()) {
        for tag in ALL_TYPES {
            prop_assert_eq!(narrows_to(&v, tag), v.value_type() == tag);
        }
    }

    /// Property: reset leaves exactly the new tag and payload
    #[test]
    fn reset_is_atomic(before in any_value(), after in any_value()) {
        let mut v = before;
        v.reset(after.clone());
        prop_assert_eq!(v.value_type(), after.value_type());
        prop_assert_eq!(v, after);
    }

    /// Property: a bound value comes back unchanged, and survives reset
    #[test]
    fn bound_value_survives_engine_and_reset(v in any_value()) {
        let conn = Connection::open_in_memory().unwrap();
        let mut stmt = conn.prepare("SELECT ?").unwrap();
        stmt.bind(1, &v);
        prop_assert_eq!(stmt.try_all_rows().unwrap(), vec![vec![v.clone()]]);

        stmt.reset();
        prop_assert_eq!(stmt.try_all_rows().unwrap(), vec![vec![v]]);

        stmt.reset().clear_bindings();
        prop_assert_eq!(stmt.try_all_rows().unwrap(), vec![vec![Value::Null]]);
    }

    /// Property: closing a connection with any number of live statements finalizes all of them
    #[test]
    fn close_finalizes_all_statements(n in 0usize..8) {
        let mut conn = Connection::open_in_memory().unwrap();
        let statements: Vec<_> = (0..n).map(|i| conn.prepare(&format!("SELECT {i}")).unwrap()).collect();
        prop_assert_eq!(conn.live_statements().unwrap(), n);
        prop_assert_eq!(conn.try_close().unwrap(), n);
        prop_assert!(statements.iter().all(crate::Statement::is_closed));
    }
}
