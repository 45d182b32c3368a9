#![no_main]
//! Fuzz test for Value narrowing
//!
//! Exactly one typed accessor may succeed for any value, and `reset` must
//! leave the new tag and payload together.

use libfuzzer_sys::fuzz_target;
use sqlhandle::{Value, ValueType};

fn value_from(tag: u8, data: &[u8]) -> Value {
    match tag % 5 {
        0 => Value::Null,
        1 => Value::Integer(data.iter().fold(0i64, |acc, b| acc.wrapping_mul(31).wrapping_add(i64::from(*b)))),
        2 => Value::Float(f64::from(data.len() as u32) / 3.0),
        3 => Value::text(String::from_utf8_lossy(data)),
        _ => Value::blob(data),
    }
}

fuzz_target!(|input: (u8, u8, &[u8])| {
    let (first, second, data) = input;
    let mut value = value_from(first, data);

    let successes = [
        value.as_integer().is_ok(),
        value.as_float().is_ok(),
        value.as_text().is_ok(),
        value.as_blob().is_ok(),
        value.is_null(),
    ];
    assert_eq!(successes.iter().filter(|ok| **ok).count(), 1);

    let replacement = value_from(second, data);
    let expected: ValueType = replacement.value_type();
    value.reset(replacement.clone());
    assert_eq!(value.value_type(), expected);
    assert_eq!(value, replacement);
});
