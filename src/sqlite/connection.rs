//! SQLite connection: engine handle, transaction state, diagnostics,
//! quoting, and attribute plumbing.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error};

use crate::core::driver::{
    shared_diagnostics, trace_transition, Attr, AttrValue, ConnectOptions, Connection, Driver,
    ErrorInfo, ParamType, QueryPlan, SharedDiagnostics, Statement, StatementOptions,
    TransactionState, Value,
};
use crate::core::{Error, Result};
use crate::sqlite::statement::SqliteStatement;

/// Journal modes SQLite accepts for `PRAGMA journal_mode`.
const JOURNAL_MODES: &[&str] = &["delete", "truncate", "persist", "memory", "wal", "off"];

/// Driver factory for SQLite databases.
///
/// The DSN target is a filesystem path, or `:memory:` (also the empty
/// string) for an in-memory database.
#[derive(Debug)]
pub struct SqliteDriver;

impl Driver for SqliteDriver {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn connect(&self, target: &str, options: &ConnectOptions) -> Result<Box<dyn Connection>> {
        let mut connection = SqliteConnection::open(target)?;
        for (attr, value) in &options.attributes {
            connection.set_attribute(*attr, value.clone())?;
        }
        Ok(Box::new(connection))
    }
}

/// A live SQLite session implementing the connection contract.
#[derive(Debug)]
pub struct SqliteConnection {
    conn: rusqlite::Connection,
    state: TransactionState,
    /// Shared with every statement this connection creates, so the
    /// connection-level accessors reflect the most recent operation on
    /// the handle, statement operations included.
    diagnostics: SharedDiagnostics,
}

impl SqliteConnection {
    /// Opens a connection to the given path, or an in-memory database
    /// for `:memory:` and the empty string.
    pub fn open(target: &str) -> Result<Self> {
        let conn = if target.is_empty() || target == ":memory:" {
            rusqlite::Connection::open_in_memory()?
        } else {
            rusqlite::Connection::open(target)?
        };
        debug!(path = target, "opened sqlite database");

        Ok(SqliteConnection {
            conn,
            state: TransactionState::Autocommit,
            diagnostics: shared_diagnostics(),
        })
    }

    fn record(&self, info: ErrorInfo) {
        error!(%info, "sqlite operation failed");
        if let Ok(mut guard) = self.diagnostics.lock() {
            guard.record(info);
        }
    }

    fn clear_diagnostics(&self) {
        if let Ok(mut guard) = self.diagnostics.lock() {
            guard.clear();
        }
    }

    /// Records a failed transaction-state transition and passes the
    /// guard error through.
    fn record_transaction_failure(&self, err: Error) -> Error {
        self.record(ErrorInfo::new("25000", None, Some(err.to_string())));
        err
    }

    /// Runs one transaction-control statement against the engine,
    /// keeping diagnostics and the state machine in step.
    fn run_transaction_control(&mut self, sql: &str, next: TransactionState) -> Result<()> {
        match self.conn.execute_batch(sql) {
            Ok(()) => {
                self.clear_diagnostics();
                let from = self.state;
                self.state = next;
                trace_transition("sqlite", from, next);
                Ok(())
            }
            Err(e) => {
                let info = classify(&e);
                self.record(info.clone());
                Err(Error::statement(info))
            }
        }
    }

    fn read_pragma_int(&self, pragma: &str) -> Result<i64> {
        let sql = format!("PRAGMA {}", pragma);
        self.conn
            .query_row(&sql, [], |row| row.get::<_, i64>(0))
            .map_err(|e| self.attribute_failure(pragma, &e))
    }

    fn read_pragma_text(&self, pragma: &str) -> Result<String> {
        let sql = format!("PRAGMA {}", pragma);
        self.conn
            .query_row(&sql, [], |row| row.get::<_, String>(0))
            .map_err(|e| self.attribute_failure(pragma, &e))
    }

    fn attribute_failure(&self, attr: &str, err: &rusqlite::Error) -> Error {
        self.record(classify(err));
        Error::Attribute(format!("{}: {}", attr, err))
    }

    fn attribute_rejected(&self, message: String) -> Error {
        self.record(ErrorInfo::new("HY092", None, Some(message.clone())));
        Error::Attribute(message)
    }
}

impl Connection for SqliteConnection {
    fn driver_name(&self) -> &'static str {
        "sqlite"
    }

    fn begin_transaction(&mut self) -> Result<()> {
        self.state
            .guard_begin()
            .map_err(|e| self.record_transaction_failure(e))?;
        self.run_transaction_control("BEGIN", TransactionState::InTransaction)
    }

    fn commit(&mut self) -> Result<()> {
        self.state
            .guard_commit()
            .map_err(|e| self.record_transaction_failure(e))?;
        self.run_transaction_control("COMMIT", TransactionState::Autocommit)
    }

    fn roll_back(&mut self) -> Result<()> {
        self.state
            .guard_roll_back()
            .map_err(|e| self.record_transaction_failure(e))?;
        self.run_transaction_control("ROLLBACK", TransactionState::Autocommit)
    }

    fn in_transaction(&self) -> bool {
        self.state.is_active()
    }

    fn exec(&mut self, sql: &str) -> Result<u64> {
        match run_exec(&self.conn, sql) {
            Ok(count) => {
                self.clear_diagnostics();
                Ok(count)
            }
            Err(e) => {
                let info = classify(&e);
                self.record(info.clone());
                Err(Error::statement(info))
            }
        }
    }

    fn prepare<'c>(
        &'c mut self,
        sql: &str,
        options: StatementOptions,
    ) -> Result<Box<dyn Statement + 'c>> {
        let diagnostics = Arc::clone(&self.diagnostics);
        match self.conn.prepare(sql) {
            Ok(stmt) => {
                let statement =
                    SqliteStatement::new(stmt, options.fetch.unwrap_or_default(), diagnostics)?;
                Ok(Box::new(statement))
            }
            Err(e) => {
                let info = classify(&e);
                self.record(info.clone());
                Err(Error::statement(info))
            }
        }
    }

    fn query<'c>(&'c mut self, sql: &str, plan: QueryPlan) -> Result<Box<dyn Statement + 'c>> {
        let diagnostics = Arc::clone(&self.diagnostics);
        match self.conn.prepare(sql) {
            Ok(stmt) => {
                let mut statement = SqliteStatement::new(stmt, plan, diagnostics)?;
                statement.execute(&[])?;
                Ok(Box::new(statement))
            }
            Err(e) => {
                let info = classify(&e);
                self.record(info.clone());
                Err(Error::statement(info))
            }
        }
    }

    fn quote(&self, value: &Value, hint: ParamType) -> Result<String> {
        match render_literal(value, hint) {
            Ok(literal) => {
                self.clear_diagnostics();
                Ok(literal)
            }
            Err(message) => {
                self.record(ErrorInfo::new("HY105", None, Some(message.clone())));
                Err(Error::Quote(message))
            }
        }
    }

    fn get_attribute(&self, attr: Attr) -> Result<AttrValue> {
        let value = match attr {
            Attr::DriverName => AttrValue::Str("sqlite".to_string()),
            Attr::DriverVersion => AttrValue::Str(rusqlite::version().to_string()),
            Attr::Autocommit => AttrValue::Bool(self.conn.is_autocommit()),
            Attr::BusyTimeoutMs => AttrValue::Int(self.read_pragma_int("busy_timeout")?),
            Attr::ForeignKeys => AttrValue::Bool(self.read_pragma_int("foreign_keys")? != 0),
            Attr::JournalMode => AttrValue::Str(self.read_pragma_text("journal_mode")?),
        };
        self.clear_diagnostics();
        Ok(value)
    }

    fn set_attribute(&mut self, attr: Attr, value: AttrValue) -> Result<()> {
        match (attr, &value) {
            (Attr::DriverName | Attr::DriverVersion | Attr::Autocommit, _) => {
                return Err(
                    self.attribute_rejected(format!("attribute {} is read-only", attr))
                );
            }
            (Attr::BusyTimeoutMs, AttrValue::Int(ms)) if *ms >= 0 => {
                self.conn
                    .busy_timeout(Duration::from_millis(*ms as u64))
                    .map_err(|e| self.attribute_failure("busy_timeout", &e))?;
            }
            (Attr::BusyTimeoutMs, AttrValue::Int(ms)) => {
                return Err(self.attribute_rejected(format!(
                    "busy_timeout_ms must be non-negative, got {}",
                    ms
                )));
            }
            (Attr::ForeignKeys, AttrValue::Bool(on)) => {
                self.conn
                    .pragma_update(None, "foreign_keys", on)
                    .map_err(|e| self.attribute_failure("foreign_keys", &e))?;
            }
            (Attr::JournalMode, AttrValue::Str(mode)) => {
                let mode = mode.to_lowercase();
                if !JOURNAL_MODES.contains(&mode.as_str()) {
                    return Err(
                        self.attribute_rejected(format!("unknown journal mode {mode:?}"))
                    );
                }
                self.conn
                    .pragma_update(None, "journal_mode", &mode)
                    .map_err(|e| self.attribute_failure("journal_mode", &e))?;
            }
            (attr, value) => {
                return Err(self.attribute_rejected(format!(
                    "attribute {} rejects {} values",
                    attr,
                    value.type_name()
                )));
            }
        }
        debug!(%attr, ?value, "attribute set");
        self.clear_diagnostics();
        Ok(())
    }

    fn last_insert_id(&self, _sequence: Option<&str>) -> Result<String> {
        // SQLite has rowids rather than sequence objects; a sequence
        // name is accepted and ignored.
        self.clear_diagnostics();
        Ok(self.conn.last_insert_rowid().to_string())
    }

    fn error_code(&self) -> Option<String> {
        self.diagnostics.lock().ok().and_then(|guard| guard.code())
    }

    fn error_info(&self) -> ErrorInfo {
        self.diagnostics
            .lock()
            .map(|guard| guard.info())
            .unwrap_or_default()
    }
}

/// Executes one non-parameterized statement.
///
/// Data-modifying statements report the engine's change count.
/// Row-returning statements cannot report an affected count, so their
/// rows are drained and the drained count is reported instead.
fn run_exec(conn: &rusqlite::Connection, sql: &str) -> rusqlite::Result<u64> {
    let mut stmt = conn.prepare(sql)?;
    if stmt.column_count() == 0 {
        let changed = stmt.execute([])?;
        Ok(changed as u64)
    } else {
        let mut rows = stmt.query([])?;
        let mut drained = 0u64;
        while rows.next()?.is_some() {
            drained += 1;
        }
        Ok(drained)
    }
}

/// Renders a value as a SQLite literal, honoring the quote hint.
fn render_literal(value: &Value, hint: ParamType) -> std::result::Result<String, String> {
    if hint == ParamType::Statement {
        return Err("statement handles cannot be quoted".to_string());
    }

    match value {
        Value::Null => Ok("NULL".to_string()),
        Value::Integer(i) => match hint {
            ParamType::Str => Ok(format!("'{}'", i)),
            _ => Ok(i.to_string()),
        },
        Value::Real(r) => match hint {
            ParamType::Str => Ok(format!("'{}'", r)),
            _ => Ok(r.to_string()),
        },
        Value::Text(t) => {
            if t.contains('\0') {
                return Err("text containing NUL cannot be quoted as a SQLite literal".to_string());
            }
            Ok(format!("'{}'", t.replace('\'', "''")))
        }
        Value::Blob(b) => {
            let hex: String = b.iter().map(|byte| format!("{:02X}", byte)).collect();
            Ok(format!("X'{}'", hex))
        }
    }
}

/// Classifies an engine failure into the SQLSTATE-like class table,
/// keeping the primary error code and message alongside.
pub(crate) fn classify(err: &rusqlite::Error) -> ErrorInfo {
    match err {
        rusqlite::Error::SqliteFailure(cause, message) => {
            let message = message
                .clone()
                .unwrap_or_else(|| cause.to_string());
            let sqlstate = match cause.code {
                rusqlite::ErrorCode::ConstraintViolation => "23000",
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked => "55000",
                rusqlite::ErrorCode::ReadOnly => "25006",
                rusqlite::ErrorCode::TypeMismatch => "22000",
                _ => classify_message(&message),
            };
            ErrorInfo::new(sqlstate, Some(i64::from(cause.extended_code)), Some(message))
        }
        rusqlite::Error::InvalidColumnIndex(_)
        | rusqlite::Error::InvalidColumnName(_)
        | rusqlite::Error::InvalidParameterCount(_, _) => {
            ErrorInfo::new("07009", None, Some(err.to_string()))
        }
        other => ErrorInfo::new("HY000", None, Some(other.to_string())),
    }
}

fn classify_message(message: &str) -> &'static str {
    if message.contains("syntax error") {
        "42000"
    } else if message.contains("no such table") || message.contains("no such column") {
        "42S02"
    } else {
        "HY000"
    }
}
