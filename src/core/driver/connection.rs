//! Connection Contract Module
//!
//! This module provides the connection side of the driver contract: the
//! `Connection` and `Driver` traits, the transaction state machine every
//! driver enforces, and the diagnostics record behind the dual-channel
//! error contract (`Result` as the primary channel, `error_code`/
//! `error_info` reflecting the most recent operation after the fact).

use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::core::driver::attr::{Attr, AttrValue};
use crate::core::driver::statement::{QueryPlan, Statement, StatementOptions};
use crate::core::driver::value::{ParamType, Value};
use crate::core::{Error, Result};

/// SQLSTATE class reported when no error has occurred.
pub const SQLSTATE_OK: &str = "00000";

/// Structured error triple: SQLSTATE-like class, driver error code, and
/// driver message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Five-character SQLSTATE-like class ("00000" when clear)
    pub sqlstate: String,
    /// Driver-native error code, when one exists
    pub code: Option<i64>,
    /// Driver-native error message, when one exists
    pub message: Option<String>,
}

impl ErrorInfo {
    /// Builds a populated diagnostic.
    pub fn new(sqlstate: &str, code: Option<i64>, message: Option<String>) -> Self {
        ErrorInfo {
            sqlstate: sqlstate.to_string(),
            code,
            message,
        }
    }

    /// True when this diagnostic reports no error.
    pub fn is_clear(&self) -> bool {
        self.sqlstate == SQLSTATE_OK && self.code.is_none() && self.message.is_none()
    }
}

impl Default for ErrorInfo {
    fn default() -> Self {
        ErrorInfo {
            sqlstate: SQLSTATE_OK.to_string(),
            code: None,
            message: None,
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SQLSTATE[{}]", self.sqlstate)?;
        if let Some(code) = self.code {
            write!(f, " [{}]", code)?;
        }
        if let Some(message) = &self.message {
            write!(f, " {}", message)?;
        }
        Ok(())
    }
}

/// Per-connection diagnostics record.
///
/// Every fallible operation on a connection either records its failure
/// here or clears the record on success, so the accessors always reflect
/// the most recently executed operation. The record is shared between a
/// connection and the statements it creates.
#[derive(Debug, Default)]
pub struct Diagnostics {
    info: ErrorInfo,
}

impl Diagnostics {
    /// Records a failing operation's diagnostic.
    pub fn record(&mut self, info: ErrorInfo) {
        self.info = info;
    }

    /// Resets the record after a successful operation.
    pub fn clear(&mut self) {
        self.info = ErrorInfo::default();
    }

    /// The current diagnostic.
    pub fn info(&self) -> ErrorInfo {
        self.info.clone()
    }

    /// The SQLSTATE class of the current diagnostic, or `None` when no
    /// error has been recorded.
    pub fn code(&self) -> Option<String> {
        if self.info.is_clear() {
            None
        } else {
            Some(self.info.sqlstate.clone())
        }
    }
}

/// Diagnostics handle shared between a connection and its statements.
pub type SharedDiagnostics = Arc<Mutex<Diagnostics>>;

/// Creates a fresh shared diagnostics record.
pub fn shared_diagnostics() -> SharedDiagnostics {
    Arc::new(Mutex::new(Diagnostics::default()))
}

/// Represents database transaction states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionState {
    /// No active transaction (autocommit mode)
    #[default]
    Autocommit,
    /// Transaction in progress
    InTransaction,
}

impl TransactionState {
    /// True while a transaction is in progress.
    pub fn is_active(&self) -> bool {
        *self == TransactionState::InTransaction
    }

    /// Guards the Autocommit -> InTransaction transition.
    ///
    /// Nested transactions are not part of the contract; beginning while
    /// one is active fails without mutating state.
    pub fn guard_begin(&self) -> Result<()> {
        if self.is_active() {
            return Err(Error::Transaction(
                "Transaction already in progress".to_string(),
            ));
        }
        Ok(())
    }

    /// Guards the InTransaction -> Autocommit transition via commit.
    pub fn guard_commit(&self) -> Result<()> {
        if !self.is_active() {
            return Err(Error::Transaction(
                "No transaction in progress".to_string(),
            ));
        }
        Ok(())
    }

    /// Guards the InTransaction -> Autocommit transition via rollback.
    pub fn guard_roll_back(&self) -> Result<()> {
        if !self.is_active() {
            return Err(Error::Transaction(
                "No transaction in progress".to_string(),
            ));
        }
        Ok(())
    }
}

/// Options handed to `Driver::connect`: attribute values applied to the
/// connection as soon as it is open, in order.
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    /// Attribute assignments applied after open
    pub attributes: Vec<(Attr, AttrValue)>,
}

impl ConnectOptions {
    /// Adds an attribute assignment, builder style.
    pub fn attribute(mut self, attr: Attr, value: AttrValue) -> Self {
        self.attributes.push((attr, value));
        self
    }
}

/// A live database session.
///
/// Implementations are synchronous and blocking: every operation is a
/// direct round trip to the underlying engine and returns once the
/// engine completes or fails the request. A single connection is not
/// safe for concurrent use by multiple callers (transaction state and
/// diagnostics are per-connection, unsynchronized concerns); open one
/// connection per concurrent unit of work instead.
pub trait Connection: fmt::Debug + Send {
    /// Static name of the driver behind this connection.
    fn driver_name(&self) -> &'static str;

    /// Starts a transaction, disabling autocommit.
    ///
    /// Fails with a `Transaction` error while a transaction is already
    /// in progress.
    fn begin_transaction(&mut self) -> Result<()>;

    /// Commits the active transaction and re-enables autocommit.
    ///
    /// Fails with a `Transaction` error while no transaction is in
    /// progress.
    fn commit(&mut self) -> Result<()>;

    /// Rolls the active transaction back, discarding pending writes, and
    /// re-enables autocommit.
    ///
    /// Fails with a `Transaction` error while no transaction is in
    /// progress.
    fn roll_back(&mut self) -> Result<()>;

    /// True while a transaction is in progress.
    fn in_transaction(&self) -> bool;

    /// Executes a non-parameterized statement immediately and returns
    /// the affected row count.
    fn exec(&mut self, sql: &str) -> Result<u64>;

    /// Prepares a statement for later execution.
    fn prepare<'c>(
        &'c mut self,
        sql: &str,
        options: StatementOptions,
    ) -> Result<Box<dyn Statement + 'c>>;

    /// Prepares and executes a statement in one call, returning a
    /// statement handle already positioned at its result set with the
    /// given fetch plan applied.
    fn query<'c>(&'c mut self, sql: &str, plan: QueryPlan) -> Result<Box<dyn Statement + 'c>>;

    /// Renders a value as a safely escaped and delimited SQL literal.
    fn quote(&self, value: &Value, hint: ParamType) -> Result<String>;

    /// Reads a connection attribute.
    fn get_attribute(&self, attr: Attr) -> Result<AttrValue>;

    /// Writes a connection attribute.
    ///
    /// Read-only and unsupported attributes, and type-mismatched values,
    /// fail with an `Attribute` error.
    fn set_attribute(&mut self, attr: Attr, value: AttrValue) -> Result<()>;

    /// String form of the most recently generated row identifier.
    ///
    /// Drivers without auto-increment identifiers require a sequence
    /// name; drivers with them accept and ignore one.
    fn last_insert_id(&self, sequence: Option<&str>) -> Result<String>;

    /// SQLSTATE class of the most recent failing operation, or `None`
    /// when the last operation succeeded.
    fn error_code(&self) -> Option<String>;

    /// Structured diagnostic for the most recent operation.
    fn error_info(&self) -> ErrorInfo;
}

/// A connection factory for one database engine.
pub trait Driver: Send + Sync {
    /// Registry name, which doubles as the DSN scheme (e.g. "sqlite").
    fn name(&self) -> &'static str;

    /// Opens a connection to `target` (the DSN with its scheme stripped)
    /// and applies the given options.
    fn connect(&self, target: &str, options: &ConnectOptions) -> Result<Box<dyn Connection>>;
}

/// Logs a transaction transition at debug level.
///
/// Drivers call this after a successful state change so transitions are
/// observable with the same shape across engines.
pub fn trace_transition(driver: &str, from: TransactionState, to: TransactionState) {
    debug!(driver, ?from, ?to, "transaction state changed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_info_default_is_clear() {
        let info = ErrorInfo::default();
        assert!(info.is_clear());
        assert_eq!(info.sqlstate, SQLSTATE_OK);
        assert_eq!(info.code, None);
        assert_eq!(info.message, None);
    }

    #[test]
    fn test_error_info_display() {
        let info = ErrorInfo::new("42000", Some(1), Some("syntax error".to_string()));
        assert_eq!(info.to_string(), "SQLSTATE[42000] [1] syntax error");

        let clear = ErrorInfo::default();
        assert_eq!(clear.to_string(), "SQLSTATE[00000]");
    }

    #[test]
    fn test_diagnostics_record_and_clear() {
        let mut diagnostics = Diagnostics::default();
        assert_eq!(diagnostics.code(), None);

        diagnostics.record(ErrorInfo::new("HY000", Some(5), None));
        assert_eq!(diagnostics.code(), Some("HY000".to_string()));
        assert!(!diagnostics.info().is_clear());

        diagnostics.clear();
        assert_eq!(diagnostics.code(), None);
        assert!(diagnostics.info().is_clear());
    }

    #[test]
    fn test_transaction_state_guards() {
        let idle = TransactionState::Autocommit;
        assert!(idle.guard_begin().is_ok());
        assert!(idle.guard_commit().is_err());
        assert!(idle.guard_roll_back().is_err());

        let active = TransactionState::InTransaction;
        assert!(active.guard_begin().is_err());
        assert!(active.guard_commit().is_ok());
        assert!(active.guard_roll_back().is_ok());
    }

    #[test]
    fn test_guard_failures_are_transaction_errors() {
        match TransactionState::Autocommit.guard_commit().unwrap_err() {
            Error::Transaction(message) => {
                assert!(message.contains("No transaction in progress"));
            }
            other => panic!("Expected Transaction error, got {other:?}"),
        }

        match TransactionState::InTransaction.guard_begin().unwrap_err() {
            Error::Transaction(message) => {
                assert!(message.contains("already in progress"));
            }
            other => panic!("Expected Transaction error, got {other:?}"),
        }
    }

    #[test]
    fn test_connect_options_builder() {
        let options = ConnectOptions::default()
            .attribute(Attr::ForeignKeys, AttrValue::Bool(true))
            .attribute(Attr::BusyTimeoutMs, AttrValue::Int(5000));

        assert_eq!(options.attributes.len(), 2);
        assert_eq!(options.attributes[0].0, Attr::ForeignKeys);
    }
}
