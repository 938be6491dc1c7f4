//! Driver Registry Module
//!
//! A process-wide table mapping DSN schemes to driver instances, so
//! applications can open connections by URL (`"sqlite:app.db"`) without
//! naming a concrete driver type. The bundled SQLite driver is
//! registered up front; additional drivers can be registered at runtime.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use tracing::debug;

use crate::core::driver::connection::{ConnectOptions, Connection, Driver};
use crate::core::{Error, Result};

/// Global scheme -> driver table.
///
/// Uses Lazy initialization to ensure thread-safe singleton behavior;
/// the bundled drivers are seeded when the table is first touched.
static DRIVERS: Lazy<RwLock<HashMap<&'static str, Arc<dyn Driver>>>> = Lazy::new(|| {
    let mut drivers: HashMap<&'static str, Arc<dyn Driver>> = HashMap::new();
    let sqlite: Arc<dyn Driver> = Arc::new(crate::sqlite::SqliteDriver);
    drivers.insert(sqlite.name(), sqlite);
    RwLock::new(drivers)
});

/// Registers a driver under its own name, replacing any driver already
/// registered under that name.
pub fn register(driver: Arc<dyn Driver>) {
    let name = driver.name();
    if let Ok(mut drivers) = DRIVERS.write() {
        debug!(scheme = name, "registering driver");
        drivers.insert(name, driver);
    }
}

/// Names of the currently registered drivers, sorted.
///
/// The connection contract itself has no driver-enumeration operation;
/// enumeration is a registry concern.
pub fn registered_schemes() -> Vec<&'static str> {
    let mut schemes: Vec<&'static str> = DRIVERS
        .read()
        .map(|drivers| drivers.keys().copied().collect())
        .unwrap_or_default();
    schemes.sort_unstable();
    schemes
}

/// Looks a driver up by scheme.
pub fn driver(scheme: &str) -> Option<Arc<dyn Driver>> {
    DRIVERS
        .read()
        .ok()
        .and_then(|drivers| drivers.get(scheme).cloned())
}

/// Opens a connection for a DSN of the form `scheme:target`.
///
/// The scheme selects the driver; the rest of the DSN is handed to the
/// driver untouched (`"sqlite::memory:"` opens an in-memory SQLite
/// database).
pub fn connect(dsn: &str, options: &ConnectOptions) -> Result<Box<dyn Connection>> {
    let (scheme, target) = dsn
        .split_once(':')
        .ok_or_else(|| Error::Config(format!("DSN has no scheme: {dsn:?}")))?;
    if scheme.is_empty() {
        return Err(Error::Config(format!("DSN has an empty scheme: {dsn:?}")));
    }

    let driver = driver(scheme)
        .ok_or_else(|| Error::Config(format!("no driver registered for scheme {scheme:?}")))?;

    debug!(scheme, "opening connection");
    driver.connect(target, options)
}
