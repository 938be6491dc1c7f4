//! SQLite prepared statements.
//!
//! A statement borrows the connection that prepared it. Execution binds
//! the accumulated parameters, runs the engine statement, and
//! materializes any result rows; `fetch` then walks the materialized set
//! and shapes each row according to the active fetch plan.

use std::collections::VecDeque;
use std::sync::Arc;

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::ToSql;

use crate::core::driver::{
    ErrorInfo, Fetched, QueryPlan, Row, SharedDiagnostics, Statement, Value,
};
use crate::core::{Error, Result};
use crate::sqlite::connection::classify;

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::Integer(i) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(*i)),
            Value::Real(r) => ToSqlOutput::Owned(rusqlite::types::Value::Real(*r)),
            Value::Text(t) => ToSqlOutput::Borrowed(ValueRef::Text(t.as_bytes())),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

/// Converts an engine cell into the contract value union.
pub(crate) fn value_from_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(r) => Value::Real(r),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).to_string()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    }
}

/// A prepared SQLite statement bound to its connection.
#[derive(Debug)]
pub struct SqliteStatement<'conn> {
    stmt: rusqlite::Statement<'conn>,
    columns: Arc<Vec<String>>,
    plan: QueryPlan,
    params: Vec<Value>,
    pending: VecDeque<Vec<Value>>,
    diagnostics: SharedDiagnostics,
    info: ErrorInfo,
}

impl<'conn> SqliteStatement<'conn> {
    /// Wraps a freshly prepared engine statement.
    ///
    /// Validates the fetch plan against the statement's result shape;
    /// a rejected plan is recorded in the shared diagnostics exactly
    /// like any other failing operation on the connection.
    pub(crate) fn new(
        stmt: rusqlite::Statement<'conn>,
        plan: QueryPlan,
        diagnostics: SharedDiagnostics,
    ) -> Result<Self> {
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let param_count = stmt.parameter_count();

        let mut statement = SqliteStatement {
            stmt,
            columns: Arc::new(columns),
            plan: QueryPlan::default(),
            params: vec![Value::Null; param_count],
            pending: VecDeque::new(),
            diagnostics,
            info: ErrorInfo::default(),
        };
        statement.set_fetch_mode(plan)?;
        Ok(statement)
    }

    fn record(&mut self, info: ErrorInfo) {
        self.info = info.clone();
        if let Ok(mut guard) = self.diagnostics.lock() {
            guard.record(info);
        }
    }

    fn clear(&mut self) {
        self.info = ErrorInfo::default();
        if let Ok(mut guard) = self.diagnostics.lock() {
            guard.clear();
        }
    }

    fn fail(&mut self, info: ErrorInfo) -> Error {
        self.record(info.clone());
        Error::statement(info)
    }

    /// Binds parameters, runs the statement, and materializes rows.
    fn run(&mut self) -> rusqlite::Result<u64> {
        self.pending.clear();
        if self.stmt.column_count() == 0 {
            let changed = self
                .stmt
                .execute(rusqlite::params_from_iter(self.params.iter()))?;
            Ok(changed as u64)
        } else {
            let column_count = self.stmt.column_count();
            let mut pending = VecDeque::new();
            let mut rows = self
                .stmt
                .query(rusqlite::params_from_iter(self.params.iter()))?;
            while let Some(row) = rows.next()? {
                let mut values = Vec::with_capacity(column_count);
                for index in 0..column_count {
                    values.push(value_from_ref(row.get_ref(index)?));
                }
                pending.push_back(values);
            }
            drop(rows);
            self.pending = pending;
            Ok(0)
        }
    }
}

impl Statement for SqliteStatement<'_> {
    fn bind(&mut self, index: usize, value: Value) -> Result<()> {
        if index == 0 || index > self.params.len() {
            let info = ErrorInfo::new(
                "07009",
                None,
                Some(format!(
                    "parameter index {} out of range (statement has {} parameters)",
                    index,
                    self.params.len()
                )),
            );
            return Err(self.fail(info));
        }
        self.params[index - 1] = value;
        Ok(())
    }

    fn execute(&mut self, params: &[Value]) -> Result<u64> {
        if !params.is_empty() {
            if params.len() != self.params.len() {
                let info = ErrorInfo::new(
                    "07009",
                    None,
                    Some(format!(
                        "expected {} parameters, got {}",
                        self.params.len(),
                        params.len()
                    )),
                );
                return Err(self.fail(info));
            }
            self.params = params.to_vec();
        }

        match self.run() {
            Ok(count) => {
                self.clear();
                Ok(count)
            }
            Err(e) => {
                let info = classify(&e);
                Err(self.fail(info))
            }
        }
    }

    fn fetch(&mut self) -> Result<Option<Fetched>> {
        let Some(values) = self.pending.pop_front() else {
            return Ok(None);
        };

        let fetched = match self.plan {
            QueryPlan::Named => Fetched::Row(Row::new(Arc::clone(&self.columns), values)),
            QueryPlan::Indexed => Fetched::Tuple(values),
            // The projection index was validated when the plan was set
            QueryPlan::Column { index } => {
                Fetched::Cell(values.into_iter().nth(index).unwrap_or(Value::Null))
            }
        };
        Ok(Some(fetched))
    }

    fn set_fetch_mode(&mut self, plan: QueryPlan) -> Result<()> {
        if let QueryPlan::Column { index } = plan {
            if index >= self.columns.len() {
                let info = ErrorInfo::new(
                    "07009",
                    None,
                    Some(format!(
                        "column projection {} out of range (statement has {} columns)",
                        index,
                        self.columns.len()
                    )),
                );
                return Err(self.fail(info));
            }
        }
        self.plan = plan;
        Ok(())
    }

    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_name(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(String::as_str)
    }

    fn error_info(&self) -> ErrorInfo {
        self.info.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::driver::{shared_diagnostics, Connection, StatementOptions};
    use crate::sqlite::connection::SqliteConnection;

    fn seeded_connection() -> SqliteConnection {
        let mut conn = SqliteConnection::open(":memory:").unwrap();
        conn.exec(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, score REAL)",
        )
        .unwrap();
        conn.exec("INSERT INTO users (name, score) VALUES ('Alice', 12.5)")
            .unwrap();
        conn.exec("INSERT INTO users (name, score) VALUES ('Bob', 7.25)")
            .unwrap();
        conn
    }

    #[test]
    fn test_prepare_execute_fetch_named() {
        let mut conn = seeded_connection();
        let mut stmt = conn
            .prepare("SELECT id, name FROM users ORDER BY id", StatementOptions::default())
            .unwrap();

        stmt.execute(&[]).unwrap();
        assert_eq!(stmt.column_count(), 2);
        assert_eq!(stmt.column_name(1), Some("name"));

        let first = stmt.fetch().unwrap().unwrap();
        let row = first.as_row().unwrap();
        assert_eq!(row.get("id"), Some(&Value::Integer(1)));
        assert_eq!(row.get("name"), Some(&Value::Text("Alice".to_string())));

        let rest = stmt.fetch_all().unwrap();
        assert_eq!(rest.len(), 1);
        assert!(stmt.fetch().unwrap().is_none());
    }

    #[test]
    fn test_bound_parameters() {
        let mut conn = seeded_connection();
        let mut stmt = conn
            .prepare(
                "SELECT name FROM users WHERE id = ?",
                StatementOptions::with_fetch(QueryPlan::Column { index: 0 }),
            )
            .unwrap();

        stmt.bind(1, Value::Integer(2)).unwrap();
        stmt.execute(&[]).unwrap();
        let fetched = stmt.fetch().unwrap().unwrap();
        assert_eq!(fetched.as_cell(), Some(&Value::Text("Bob".to_string())));

        // Positional arguments to execute replace prior binds
        stmt.execute(&[Value::Integer(1)]).unwrap();
        let fetched = stmt.fetch().unwrap().unwrap();
        assert_eq!(fetched.as_cell(), Some(&Value::Text("Alice".to_string())));
    }

    #[test]
    fn test_bind_out_of_range() {
        let mut conn = seeded_connection();
        let mut stmt = conn
            .prepare("SELECT name FROM users WHERE id = ?", StatementOptions::default())
            .unwrap();

        let err = stmt.bind(2, Value::Integer(1)).unwrap_err();
        match err {
            Error::Statement { info } => assert_eq!(info.sqlstate, "07009"),
            other => panic!("Expected Statement error, got {other:?}"),
        }
        assert_eq!(stmt.error_info().sqlstate, "07009");
    }

    #[test]
    fn test_unbound_parameters_are_null() {
        let mut conn = seeded_connection();
        let mut stmt = conn
            .prepare("SELECT ? IS NULL", StatementOptions::with_fetch(QueryPlan::Column { index: 0 }))
            .unwrap();

        stmt.execute(&[]).unwrap();
        let fetched = stmt.fetch().unwrap().unwrap();
        assert_eq!(fetched.as_cell(), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_indexed_fetch_mode() {
        let mut conn = seeded_connection();
        let mut stmt = conn
            .query("SELECT id, name FROM users ORDER BY id", QueryPlan::Indexed)
            .unwrap();

        let rows = stmt.fetch_all().unwrap();
        assert_eq!(rows.len(), 2);
        match &rows[0] {
            Fetched::Tuple(values) => {
                assert_eq!(values[0], Value::Integer(1));
                assert_eq!(values[1], Value::Text("Alice".to_string()));
            }
            other => panic!("Expected Tuple, got {other:?}"),
        }
    }

    #[test]
    fn test_column_projection_out_of_range() {
        let mut conn = seeded_connection();
        let err = conn
            .query("SELECT id FROM users", QueryPlan::Column { index: 3 })
            .unwrap_err();

        match err {
            Error::Statement { info } => assert_eq!(info.sqlstate, "07009"),
            other => panic!("Expected Statement error, got {other:?}"),
        }
        assert_eq!(conn.error_code(), Some("07009".to_string()));
    }

    #[test]
    fn test_dml_through_statement() {
        let mut conn = seeded_connection();
        let mut stmt = conn
            .prepare("UPDATE users SET score = ? WHERE name = ?", StatementOptions::default())
            .unwrap();

        let affected = stmt
            .execute(&[Value::Real(99.0), Value::Text("Alice".to_string())])
            .unwrap();
        assert_eq!(affected, 1);
    }

    #[test]
    fn test_statement_failure_reaches_connection_diagnostics() {
        let mut conn = seeded_connection();
        {
            let mut stmt = conn
                .prepare("INSERT INTO users (id, name) VALUES (?, ?)", StatementOptions::default())
                .unwrap();
            // Duplicate primary key
            let err = stmt
                .execute(&[Value::Integer(1), Value::Text("Eve".to_string())])
                .unwrap_err();
            match err {
                Error::Statement { info } => assert_eq!(info.sqlstate, "23000"),
                other => panic!("Expected Statement error, got {other:?}"),
            }
            assert_eq!(stmt.error_info().sqlstate, "23000");
        }
        assert_eq!(conn.error_code(), Some("23000".to_string()));
    }

    #[test]
    fn test_value_round_trip_through_engine() {
        let mut conn = SqliteConnection::open(":memory:").unwrap();
        conn.exec("CREATE TABLE v (x)").unwrap();

        let samples = vec![
            Value::Null,
            Value::Integer(-7),
            Value::Real(2.5),
            Value::Text("snow ❄".to_string()),
            Value::Blob(vec![0, 159, 146, 150]),
        ];
        for sample in &samples {
            let mut stmt = conn
                .prepare("INSERT INTO v (x) VALUES (?)", StatementOptions::default())
                .unwrap();
            stmt.execute(std::slice::from_ref(sample)).unwrap();
        }

        let mut stmt = conn
            .query("SELECT x FROM v ORDER BY rowid", QueryPlan::Column { index: 0 })
            .unwrap();
        let cells: Vec<Value> = stmt
            .fetch_all()
            .unwrap()
            .into_iter()
            .filter_map(|fetched| fetched.as_cell().cloned())
            .collect();
        assert_eq!(cells, samples);
    }

    #[test]
    fn test_value_from_ref_covers_storage_classes() {
        assert_eq!(value_from_ref(ValueRef::Null), Value::Null);
        assert_eq!(value_from_ref(ValueRef::Integer(3)), Value::Integer(3));
        assert_eq!(value_from_ref(ValueRef::Real(0.5)), Value::Real(0.5));
        assert_eq!(
            value_from_ref(ValueRef::Text(b"hi")),
            Value::Text("hi".to_string())
        );
        assert_eq!(
            value_from_ref(ValueRef::Blob(&[1, 2])),
            Value::Blob(vec![1, 2])
        );
    }

    #[test]
    fn test_new_statement_validates_plan() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let stmt = conn.prepare("SELECT 1, 2").unwrap();
        let diagnostics = shared_diagnostics();

        let result = SqliteStatement::new(stmt, QueryPlan::Column { index: 2 }, diagnostics);
        assert!(result.is_err());
    }
}
