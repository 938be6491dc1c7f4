//! sqlbridge Error Module
//!
//! This module defines the error types shared by the connection contract
//! and every driver implementation. It provides structured error handling
//! with proper error propagation and user-facing error messages.
use thiserror::Error;

use crate::core::driver::connection::ErrorInfo;

/// Comprehensive error type for sqlbridge operations.
///
/// This enum covers the failure classes a connection or statement can
/// report:
/// - Transaction state violations (begin while active, commit while idle)
/// - Statement failures (syntax, semantics, connectivity) during
///   exec/prepare/query/bind/fetch
/// - Attribute get/set rejections
/// - Values the driver cannot quote
/// - Untranslated engine failures and configuration problems
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid transaction-state transition
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// SQL text rejected by the driver during exec/prepare/query
    #[error("Statement error: {}", .info)]
    Statement {
        /// Structured diagnostic for the failing statement
        info: ErrorInfo,
    },

    /// Unknown, unsupported, or read-only attribute in get/set
    #[error("Attribute error: {0}")]
    Attribute(String),

    /// Value/type combination the driver cannot safely quote
    #[error("Quote error: {0}")]
    Quote(String),

    /// Engine failure surfaced while opening or configuring a connection
    #[error("Driver error: {0}")]
    Driver(#[from] rusqlite::Error),

    /// DSN, registry, or configuration file errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Builds a statement error from a structured diagnostic.
    pub fn statement(info: ErrorInfo) -> Self {
        Error::Statement { info }
    }

    /// Returns the structured diagnostic carried by this error, if any.
    pub fn info(&self) -> Option<&ErrorInfo> {
        match self {
            Error::Statement { info } => Some(info),
            _ => None,
        }
    }
}

/// Type alias for Result to use Error as the error type.
///
/// This provides a consistent error type across the entire crate instead
/// of using `Result<T, String>` or mixed error types.
pub type Result<T> = std::result::Result<T, Error>;
