//! Statement Contract Module
//!
//! This module defines the prepared statement side of the driver
//! contract: the `Statement` trait, the fetch-mode plan that shapes
//! result rows, and the row/cell types handed back to callers.
//!
//! Statement handles are created by `Connection::prepare` and
//! `Connection::query` and borrow the connection that produced them, so
//! the borrow checker enforces that a statement never outlives its
//! connection.

use std::fmt;
use std::sync::Arc;

use crate::core::driver::connection::ErrorInfo;
use crate::core::driver::value::Value;
use crate::core::Result;

/// Result-shaping plan for `query` and `Statement::set_fetch_mode`.
///
/// Mode-dependent arguments are modeled as a discriminated record rather
/// than an open-ended argument list; the payload is validated when the
/// plan is applied to a statement, not when it is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPlan {
    /// Rows keyed by column name (`Fetched::Row`)
    Named,
    /// Rows as positional tuples (`Fetched::Tuple`)
    Indexed,
    /// A single column projected by zero-based index (`Fetched::Cell`)
    Column {
        /// Zero-based result column to project
        index: usize,
    },
}

impl Default for QueryPlan {
    fn default() -> Self {
        QueryPlan::Named
    }
}

/// Statement-level overrides recognized at prepare time.
///
/// A driver that cannot honor a requested option must reject it rather
/// than ignore it.
#[derive(Debug, Clone, Default)]
pub struct StatementOptions {
    /// Pre-set fetch mode for the statement's result rows
    pub fetch: Option<QueryPlan>,
}

impl StatementOptions {
    /// Options with a pre-set fetch mode.
    pub fn with_fetch(plan: QueryPlan) -> Self {
        StatementOptions { fetch: Some(plan) }
    }
}

/// A fetched result row under the `Named` fetch mode.
///
/// Column names are shared across all rows of a result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<Vec<String>>,
    values: Vec<Value>,
}

impl Row {
    /// Builds a row over a shared column-name list.
    pub fn new(columns: Arc<Vec<String>>, values: Vec<Value>) -> Self {
        Row { columns, values }
    }

    /// Looks a value up by column name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.values.get(index)
    }

    /// Looks a value up by zero-based position.
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Column names for this row.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All values, in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A fetched result, shaped by the statement's active `QueryPlan`.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    /// `QueryPlan::Named`: a row addressable by column name
    Row(Row),
    /// `QueryPlan::Indexed`: a positional tuple of values
    Tuple(Vec<Value>),
    /// `QueryPlan::Column`: the projected cell
    Cell(Value),
}

impl Fetched {
    /// The row form, if this result carries one.
    pub fn as_row(&self) -> Option<&Row> {
        match self {
            Fetched::Row(row) => Some(row),
            _ => None,
        }
    }

    /// The projected cell, if this result carries one.
    pub fn as_cell(&self) -> Option<&Value> {
        match self {
            Fetched::Cell(value) => Some(value),
            _ => None,
        }
    }
}

/// A prepared statement bound to the connection that created it.
///
/// Execution is synchronous: `execute` returns once the driver has run
/// the statement, and `fetch`/`fetch_all` walk the materialized result
/// set. Positional parameters are 1-based, following SQL placeholder
/// numbering.
pub trait Statement: fmt::Debug {
    /// Binds a positional parameter (1-based index).
    fn bind(&mut self, index: usize, value: Value) -> Result<()>;

    /// Executes the statement.
    ///
    /// A non-empty `params` slice replaces any previously bound
    /// parameters. Returns the affected row count for data-modifying
    /// statements and 0 for row-returning statements (whose rows are
    /// consumed through `fetch`).
    fn execute(&mut self, params: &[Value]) -> Result<u64>;

    /// Fetches the next result row, or `None` when the set is exhausted.
    fn fetch(&mut self) -> Result<Option<Fetched>>;

    /// Fetches all remaining result rows.
    fn fetch_all(&mut self) -> Result<Vec<Fetched>> {
        let mut rows = Vec::new();
        while let Some(fetched) = self.fetch()? {
            rows.push(fetched);
        }
        Ok(rows)
    }

    /// Replaces the active fetch mode.
    ///
    /// The plan payload is validated against the statement's result
    /// shape; an out-of-range column projection is a statement error.
    fn set_fetch_mode(&mut self, plan: QueryPlan) -> Result<()>;

    /// Number of result columns (0 for statements that return no rows).
    fn column_count(&self) -> usize;

    /// Name of a result column by zero-based index.
    fn column_name(&self, index: usize) -> Option<&str>;

    /// Structured diagnostic for the most recent operation on this
    /// statement; the default value when no error has occurred.
    fn error_info(&self) -> ErrorInfo;
}
