//! Database layer for the task list.

pub mod tasks;

use crate::error::{StoreError, StoreResult};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Database handle wrapping a SQLite connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    /// `None` for in-memory databases.
    path: Option<PathBuf>,
}

impl Database {
    /// Open or create the database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let conn = Connection::open(path)?;

        // WAL so a `watch` process can read while another invocation writes
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA busy_timeout=5000;",
        )?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        };

        db.run_migrations()?;
        debug!(path = %path.display(), "opened task database");

        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        };

        db.run_migrations()?;

        Ok(db)
    }

    /// File backing this database.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// SQLite's `data_version`: moves whenever another connection commits.
    /// Commits made through this handle leave it unchanged.
    pub fn data_version(&self) -> StoreResult<i64> {
        self.with_conn(|conn| {
            let version = conn.query_row("PRAGMA data_version", [], |row| row.get(0))?;
            Ok(version)
        })
    }

    /// Run database migrations.
    fn run_migrations(&self) -> StoreResult<()> {
        let mut conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        embedded::migrations::runner().run(&mut *conn)?;
        Ok(())
    }

    /// Execute a function with exclusive access to the connection.
    pub fn with_conn<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T>,
    {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&conn)
    }
}

/// Get the current timestamp in milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
