//! SQLite-backed relational store
//!
//! ## Tables
//!
//! - `publish_status` - one publication lifecycle row per collection
//! - `collections` - collection metadata (tags and banners as JSON arrays)
//! - `collection_dois` - ordered, unique DOI membership
//! - `collection_roles` - per-user role on a collection
//! - `users` - profiles of publishing users
//!
//! Each handle owns one connection; independent handles on the same file
//! behave like independent request handlers, so the publish claim relies on
//! the conditional write alone and never on the handle's mutex.

pub mod collections;
pub mod publish_status;
pub mod schema;
pub mod users;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

use crate::core::error::StatusStoreError;

pub use collections::NewCollection;

/// How long a writer waits for a competing writer before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the SQLite database
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create the database at `path`
    pub fn open(path: &Path) -> Result<Self, StatusStoreError> {
        info!("Opening SQLite database at {:?}", path);

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        Self::init(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, StatusStoreError> {
        debug!("Opening in-memory SQLite database");

        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StatusStoreError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        schema::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool
    pub(crate) async fn call<F, T>(&self, f: F) -> Result<T, StatusStoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StatusStoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StatusStoreError::Task(format!("lock poisoned: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StatusStoreError::Task(e.to_string()))?
    }
}
