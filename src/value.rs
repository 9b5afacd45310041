//! Stored Values
//!
//! Values are opaque to the store with one exception: counter operations need
//! to know whether a value is an integer. Instead of coercing strings to
//! numbers, every value carries an explicit tag and only [`Value::Integer`]
//! and [`Value::Null`] are accepted by `increment`/`decrement`.

use bytes::Bytes;
use std::fmt;

/// A value held by a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// An explicit null. Counters treat it as `0`.
    Null,
    /// A boolean flag.
    Bool(bool),
    /// A signed 64-bit integer, the only type counters operate on.
    Integer(i64),
    /// UTF-8 text.
    Text(String),
    /// Arbitrary binary data.
    Bytes(Bytes),
}

impl Value {
    /// Returns the integer inside, if this is an `Integer`.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the text inside, if this is `Text`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns true if this value is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Reads the value as a counter.
    ///
    /// `Null` counts as zero; anything other than an integer is rejected.
    pub(crate) fn counter(&self) -> Option<i64> {
        match self {
            Value::Null => Some(0),
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "\"{}\"", s),
            Value::Bytes(b) => write!(f, "(binary data, {} bytes)", b.len()),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n.into())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Bytes(b)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(b))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
