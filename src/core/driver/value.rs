//! Value Module
//!
//! Defines the tagged value union exchanged with drivers: bound
//! parameters, fetched cells, and `quote` input all use `Value`. The
//! variants mirror the SQLite storage classes, which also cover what the
//! other supported engines exchange at this layer.

use std::fmt;

/// A database value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL
    Null,
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit float
    Real(f64),
    /// UTF-8 text
    Text(String),
    /// Raw byte sequence
    Blob(Vec<u8>),
}

impl Value {
    /// Short type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
        }
    }

    /// Returns true for `Value::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    /// Plain display form, suitable for logs and result grids. This is
    /// not SQL quoting; use `Connection::quote` for literals.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(t) => write!(f, "{}", t),
            Value::Blob(b) => write!(f, "<BLOB: {} bytes>", b.len()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl From<Option<Value>> for Value {
    fn from(v: Option<Value>) -> Self {
        v.unwrap_or(Value::Null)
    }
}

/// Type hint passed to `Connection::quote` alongside the value.
///
/// Drivers use the hint to pick a literal form when the value itself is
/// ambiguous (e.g. quoting an integer that arrives as text). A hint the
/// driver cannot honor for the given value is a `Quote` error, not a
/// silent coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// SQL NULL
    Null,
    /// Boolean (rendered as an integer by engines without a bool type)
    Bool,
    /// Integer literal
    Int,
    /// Text literal
    Str,
    /// Binary literal
    Blob,
    /// A statement handle; never quotable
    Statement,
}
