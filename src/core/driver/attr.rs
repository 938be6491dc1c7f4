//! Attribute Module
//!
//! Connection attributes are named configuration settings scoped to a
//! single connection. The identifier space is a closed enum; which
//! identifiers a driver supports, and which of those are writable, is a
//! driver matter reported through `Attribute` errors.

use std::fmt;

/// Attribute identifiers recognized by the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attr {
    /// Driver name, e.g. "sqlite" (read-only string)
    DriverName,
    /// Underlying engine version (read-only string)
    DriverVersion,
    /// Whether the connection is currently in autocommit mode
    /// (read-only boolean, derived from the transaction state)
    Autocommit,
    /// Busy/lock wait budget in milliseconds (writable integer)
    BusyTimeoutMs,
    /// Foreign key constraint enforcement (writable boolean)
    ForeignKeys,
    /// Journal mode, e.g. "wal" (writable string)
    JournalMode,
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Attr::DriverName => "driver_name",
            Attr::DriverVersion => "driver_version",
            Attr::Autocommit => "autocommit",
            Attr::BusyTimeoutMs => "busy_timeout_ms",
            Attr::ForeignKeys => "foreign_keys",
            Attr::JournalMode => "journal_mode",
        };
        write!(f, "{}", name)
    }
}

/// An attribute value.
///
/// Attribute values are heterogeneous across identifiers, so they are
/// modeled as a tagged union rather than an untyped value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Boolean setting
    Bool(bool),
    /// Integer setting
    Int(i64),
    /// String setting
    Str(String),
    /// Unset / not applicable
    Null,
}

impl AttrValue {
    /// Short type name used in attribute error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            AttrValue::Bool(_) => "bool",
            AttrValue::Int(_) => "int",
            AttrValue::Str(_) => "str",
            AttrValue::Null => "null",
        }
    }

    /// Extracts a boolean, if this value carries one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Extracts an integer, if this value carries one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Extracts a string slice, if this value carries one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Str(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Str(v)
    }
}
