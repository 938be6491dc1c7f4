//! SQLite Driver Module
//!
//! The bundled reference implementation of the connection contract,
//! backed by `rusqlite`. The driver registers under the `"sqlite"`
//! scheme; the DSN target is a filesystem path or `:memory:`.
//!
//! ## Architecture
//!
//! - **Connection** (`connection.rs`): owns the engine handle, the
//!   transaction state machine, and the shared diagnostics record;
//!   implements quoting, attributes, and SQLSTATE classification
//! - **Statement** (`statement.rs`): wraps a prepared engine statement;
//!   rows are materialized at execute time and shaped by the active
//!   fetch plan
pub mod connection;
pub mod statement;

pub use connection::{SqliteConnection, SqliteDriver};
pub use statement::SqliteStatement;
