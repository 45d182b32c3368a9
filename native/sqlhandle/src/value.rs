/// SQL-typed scalar values exchanged with the engine
///
/// `Value` is a closed sum over the five storage classes the engine knows.
/// Reading a payload is a checked downcast: asking for a variant that is not
/// the active one yields [`Error::TypeMismatch`], there is no implicit
/// numeric or textual coercion between variants.
use crate::error::{Error, Result};
use std::fmt;

/// Tag of the active [`Value`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Integer,
    Float,
    Text,
    Blob,
    Null,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Integer => "INTEGER",
            ValueType::Float => "FLOAT",
            ValueType::Text => "TEXT",
            ValueType::Blob => "BLOB",
            ValueType::Null => "NULL",
        };
        f.write_str(name)
    }
}

/// One SQL scalar.
///
/// Text and blob payloads are owned; a `Value` never refers to memory owned
/// by the engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
    #[default]
    Null,
}

impl Value {
    pub fn integer(i: i64) -> Self {
        Value::Integer(i)
    }

    pub fn float(f: f64) -> Self {
        Value::Float(f)
    }

    pub fn text(t: impl Into<String>) -> Self {
        Value::Text(t.into())
    }

    pub fn blob(b: impl Into<Vec<u8>>) -> Self {
        Value::Blob(b.into())
    }

    pub fn null() -> Self {
        Value::Null
    }

    /// The tag of the active variant.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Integer(_) => ValueType::Integer,
            Value::Float(_) => ValueType::Float,
            Value::Text(_) => ValueType::Text,
            Value::Blob(_) => ValueType::Blob,
            Value::Null => ValueType::Null,
        }
    }

    /// Checked view of the payload as `T`.
    ///
    /// ```
    /// use sqlhandle::{Error, Value, ValueType};
    ///
    /// let v = Value::text("hello");
    /// assert_eq!(v.get::<&str>().unwrap(), "hello");
    /// assert!(matches!(
    ///     v.get::<i64>(),
    ///     Err(Error::TypeMismatch { expected: ValueType::Integer, found: ValueType::Text })
    /// ));
    /// ```
    pub fn get<'a, T: FromValue<'a>>(&'a self) -> Result<T> {
        T::from_value(self).ok_or(Error::TypeMismatch {
            expected: T::VALUE_TYPE,
            found: self.value_type(),
        })
    }

    pub fn as_integer(&self) -> Result<i64> {
        self.get()
    }

    pub fn as_float(&self) -> Result<f64> {
        self.get()
    }

    pub fn as_text(&self) -> Result<&str> {
        self.get()
    }

    pub fn as_blob(&self) -> Result<&[u8]> {
        self.get()
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Replace tag and payload in one assignment.
    pub fn reset(&mut self, value: impl Into<Value>) {
        *self = value.into();
    }
}

/// Payload types a [`Value`] can be narrowed to.
pub trait FromValue<'a>: Sized {
    /// Variant this payload type belongs to.
    const VALUE_TYPE: ValueType;

    /// `None` when the active variant is not [`Self::VALUE_TYPE`].
    fn from_value(value: &'a Value) -> Option<Self>;
}

impl<'a> FromValue<'a> for i64 {
    const VALUE_TYPE: ValueType = ValueType::Integer;

    fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl<'a> FromValue<'a> for f64 {
    const VALUE_TYPE: ValueType = ValueType::Float;

    fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl<'a> FromValue<'a> for &'a str {
    const VALUE_TYPE: ValueType = ValueType::Text;

    fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::Text(t) => Some(t.as_str()),
            _ => None,
        }
    }
}

impl<'a> FromValue<'a> for &'a [u8] {
    const VALUE_TYPE: ValueType = ValueType::Blob;

    fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::Blob(b) => Some(b.as_slice()),
            _ => None,
        }
    }
}

impl<'a> FromValue<'a> for () {
    const VALUE_TYPE: ValueType = ValueType::Null;

    fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::Null => Some(()),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(t: String) -> Self {
        Value::Text(t)
    }
}

impl From<&str> for Value {
    fn from(t: &str) -> Self {
        Value::Text(t.to_owned())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Blob(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Blob(b.to_vec())
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Value::Null
    }
}

/// Borrowed values are copied; this is the copying form of `Statement::bind`.
impl From<&Value> for Value {
    fn from(v: &Value) -> Self {
        v.clone()
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(t) => f.write_str(t),
            Value::Blob(b) => {
                f.write_str("X'")?;
                for byte in b {
                    write!(f, "{byte:02X}")?;
                }
                f.write_str("'")
            }
            Value::Null => f.write_str("NULL"),
        }
    }
}
