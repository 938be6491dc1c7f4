//! Test Utilities Module
//!
//! Scripted doubles for the connection contract. `StubConnection`
//! honors the same transaction state machine and dual-channel
//! diagnostics as a real driver while letting tests script statement
//! outcomes and canned result sets, so call sites written against the
//! traits can be exercised without an engine.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::core::driver::{
    shared_diagnostics, trace_transition, Attr, AttrValue, ConnectOptions, Connection, Driver,
    ErrorInfo, Fetched, ParamType, QueryPlan, Row, SharedDiagnostics, Statement,
    StatementOptions, TransactionState, Value,
};
use crate::core::{Error, Result};

/// Driver factory producing fresh, unscripted stub connections.
///
/// Registering this driver (scheme `"stub"`) lets tests exercise
/// registry dispatch without touching an engine.
#[derive(Debug)]
pub struct StubDriver;

impl Driver for StubDriver {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn connect(&self, _target: &str, options: &ConnectOptions) -> Result<Box<dyn Connection>> {
        let mut connection = StubConnection::new();
        for (attr, value) in &options.attributes {
            connection.set_attribute(*attr, value.clone())?;
        }
        Ok(Box::new(connection))
    }
}

/// A scripted in-memory implementation of the connection contract.
#[derive(Debug)]
pub struct StubConnection {
    state: TransactionState,
    diagnostics: SharedDiagnostics,
    /// Method names in invocation order, for asserting that generic
    /// call sites actually reached the double
    calls: Mutex<Vec<String>>,
    /// Scripted outcomes for `exec`, consumed front to back; an empty
    /// script means every exec succeeds with 0 affected rows
    exec_script: VecDeque<std::result::Result<u64, ErrorInfo>>,
    /// Canned result set served by `prepare`/`query`
    columns: Arc<Vec<String>>,
    rows: Vec<Vec<Value>>,
    attributes: HashMap<Attr, AttrValue>,
    last_insert_id: i64,
}

impl StubConnection {
    pub fn new() -> Self {
        let mut attributes = HashMap::new();
        attributes.insert(Attr::BusyTimeoutMs, AttrValue::Int(0));

        StubConnection {
            state: TransactionState::Autocommit,
            diagnostics: shared_diagnostics(),
            calls: Mutex::new(Vec::new()),
            exec_script: VecDeque::new(),
            columns: Arc::new(Vec::new()),
            rows: Vec::new(),
            attributes,
            last_insert_id: 0,
        }
    }

    /// Scripts the outcome of the next unscripted `exec` call.
    pub fn script_exec(&mut self, outcome: std::result::Result<u64, ErrorInfo>) {
        self.exec_script.push_back(outcome);
    }

    /// Installs the canned result set served by `prepare` and `query`.
    pub fn with_result_set(mut self, columns: Vec<&str>, rows: Vec<Vec<Value>>) -> Self {
        self.columns = Arc::new(columns.into_iter().map(String::from).collect());
        self.rows = rows;
        self
    }

    /// Sets the identifier reported by `last_insert_id`.
    pub fn set_last_insert_id(&mut self, id: i64) {
        self.last_insert_id = id;
    }

    /// Method names recorded so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    fn note(&self, method: &str) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(method.to_string());
        }
    }

    fn record(&self, info: ErrorInfo) {
        if let Ok(mut guard) = self.diagnostics.lock() {
            guard.record(info);
        }
    }

    fn clear(&self) {
        if let Ok(mut guard) = self.diagnostics.lock() {
            guard.clear();
        }
    }

    fn transaction_failure(&self, err: Error) -> Error {
        self.record(ErrorInfo::new("25000", None, Some(err.to_string())));
        err
    }
}

impl Default for StubConnection {
    fn default() -> Self {
        StubConnection::new()
    }
}

impl Connection for StubConnection {
    fn driver_name(&self) -> &'static str {
        "stub"
    }

    fn begin_transaction(&mut self) -> Result<()> {
        self.note("begin_transaction");
        self.state
            .guard_begin()
            .map_err(|e| self.transaction_failure(e))?;
        let from = self.state;
        self.state = TransactionState::InTransaction;
        trace_transition("stub", from, self.state);
        self.clear();
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.note("commit");
        self.state
            .guard_commit()
            .map_err(|e| self.transaction_failure(e))?;
        let from = self.state;
        self.state = TransactionState::Autocommit;
        trace_transition("stub", from, self.state);
        self.clear();
        Ok(())
    }

    fn roll_back(&mut self) -> Result<()> {
        self.note("roll_back");
        self.state
            .guard_roll_back()
            .map_err(|e| self.transaction_failure(e))?;
        let from = self.state;
        self.state = TransactionState::Autocommit;
        trace_transition("stub", from, self.state);
        self.clear();
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.state.is_active()
    }

    fn exec(&mut self, _sql: &str) -> Result<u64> {
        self.note("exec");
        match self.exec_script.pop_front() {
            Some(Ok(affected)) => {
                self.clear();
                Ok(affected)
            }
            Some(Err(info)) => {
                self.record(info.clone());
                Err(Error::statement(info))
            }
            None => {
                self.clear();
                Ok(0)
            }
        }
    }

    fn prepare<'c>(
        &'c mut self,
        sql: &str,
        options: StatementOptions,
    ) -> Result<Box<dyn Statement + 'c>> {
        self.note("prepare");
        let statement = StubStatement::new(
            Arc::clone(&self.columns),
            self.rows.clone(),
            sql.matches('?').count(),
            options.fetch.unwrap_or_default(),
            Arc::clone(&self.diagnostics),
        )?;
        self.clear();
        Ok(Box::new(statement))
    }

    fn query<'c>(&'c mut self, sql: &str, plan: QueryPlan) -> Result<Box<dyn Statement + 'c>> {
        self.note("query");
        let mut statement = StubStatement::new(
            Arc::clone(&self.columns),
            self.rows.clone(),
            sql.matches('?').count(),
            plan,
            Arc::clone(&self.diagnostics),
        )?;
        statement.execute(&[])?;
        self.clear();
        Ok(Box::new(statement))
    }

    fn quote(&self, value: &Value, hint: ParamType) -> Result<String> {
        self.note("quote");
        // The stub has no native blob quoting, exercising the
        // driver-cannot-quote branch of the contract
        let literal = match value {
            _ if hint == ParamType::Statement => None,
            Value::Blob(_) => None,
            Value::Null => Some("NULL".to_string()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Real(r) => Some(r.to_string()),
            Value::Text(t) => Some(format!("'{}'", t.replace('\'', "''"))),
        };
        match literal {
            Some(literal) => {
                self.clear();
                Ok(literal)
            }
            None => {
                let message = format!("stub driver cannot quote {} values", value.type_name());
                self.record(ErrorInfo::new("HY105", None, Some(message.clone())));
                Err(Error::Quote(message))
            }
        }
    }

    fn get_attribute(&self, attr: Attr) -> Result<AttrValue> {
        self.note("get_attribute");
        let value = match attr {
            Attr::DriverName => AttrValue::Str("stub".to_string()),
            Attr::Autocommit => AttrValue::Bool(!self.in_transaction()),
            _ => match self.attributes.get(&attr) {
                Some(value) => value.clone(),
                None => {
                    let message = format!("attribute {} is not supported by the stub driver", attr);
                    self.record(ErrorInfo::new("HY092", None, Some(message.clone())));
                    return Err(Error::Attribute(message));
                }
            },
        };
        self.clear();
        Ok(value)
    }

    fn set_attribute(&mut self, attr: Attr, value: AttrValue) -> Result<()> {
        self.note("set_attribute");
        let writable = matches!(attr, Attr::BusyTimeoutMs);
        if !writable {
            let message = format!("attribute {} is not writable on the stub driver", attr);
            self.record(ErrorInfo::new("HY092", None, Some(message.clone())));
            return Err(Error::Attribute(message));
        }
        self.attributes.insert(attr, value);
        self.clear();
        Ok(())
    }

    fn last_insert_id(&self, _sequence: Option<&str>) -> Result<String> {
        self.note("last_insert_id");
        self.clear();
        Ok(self.last_insert_id.to_string())
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

/// Statement double serving a canned result set.
#[derive(Debug)]
pub struct StubStatement {
    columns: Arc<Vec<String>>,
    rows: Vec<Vec<Value>>,
    pending: VecDeque<Vec<Value>>,
    params: Vec<Value>,
    plan: QueryPlan,
    diagnostics: SharedDiagnostics,
    info: ErrorInfo,
}

impl StubStatement {
    fn new(
        columns: Arc<Vec<String>>,
        rows: Vec<Vec<Value>>,
        param_count: usize,
        plan: QueryPlan,
        diagnostics: SharedDiagnostics,
    ) -> Result<Self> {
        let mut statement = StubStatement {
            columns,
            rows,
            pending: VecDeque::new(),
            params: vec![Value::Null; param_count],
            plan: QueryPlan::default(),
            diagnostics,
            info: ErrorInfo::default(),
        };
        statement.set_fetch_mode(plan)?;
        Ok(statement)
    }

    fn fail(&mut self, info: ErrorInfo) -> Error {
        self.info = info.clone();
        if let Ok(mut guard) = self.diagnostics.lock() {
            guard.record(info.clone());
        }
        Error::statement(info)
    }
}

impl Statement for StubStatement {
    fn bind(&mut self, index: usize, value: Value) -> Result<()> {
        if index == 0 || index > self.params.len() {
            let info = ErrorInfo::new(
                "07009",
                None,
                Some(format!("parameter index {} out of range", index)),
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
        self.pending = self.rows.clone().into();
        self.info = ErrorInfo::default();
        Ok(0)
    }

    fn fetch(&mut self) -> Result<Option<Fetched>> {
        let Some(values) = self.pending.pop_front() else {
            return Ok(None);
        };
        let fetched = match self.plan {
            QueryPlan::Named => Fetched::Row(Row::new(Arc::clone(&self.columns), values)),
            QueryPlan::Indexed => Fetched::Tuple(values),
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
                    Some(format!("column projection {} out of range", index)),
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
