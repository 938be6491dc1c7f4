//! Driver Contract Module
//!
//! This module defines the capability surface a concrete database driver
//! must satisfy, organized into focused submodules:
//!
//! - **Connection Contract** (`connection.rs`): the `Connection` and
//!   `Driver` traits, transaction state machine, and the dual-channel
//!   diagnostics record behind `error_code`/`error_info`
//! - **Statement Contract** (`statement.rs`): the `Statement` trait,
//!   fetch-mode plans, and result-row shapes
//! - **Values** (`value.rs`): the tagged value union and quote hints
//! - **Attributes** (`attr.rs`): connection attribute identifiers and
//!   their heterogeneous values
//! - **Registry** (`registry.rs`): scheme-keyed driver lookup and DSN
//!   dispatch
//!
//! Calling code programs against these traits rather than a concrete
//! driver type, so a driver can be substituted (including a test double)
//! without touching call sites. All operations use the standardized
//! `Error` type for consistent propagation.
pub mod attr;
pub mod connection;
pub mod registry;
pub mod statement;
pub mod value;

pub use attr::*;
pub use connection::*;
pub use statement::*;
pub use value::*;
