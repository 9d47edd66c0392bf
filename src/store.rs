//! Async task store with live queries.
//!
//! [`TaskStore`] moves every SQLite call onto tokio's blocking pool so the
//! calling controller only suspends, and records each effective mutation in
//! a [`ChangeTracker`]. [`LiveQuery`] re-runs its query whenever the tracker
//! reports a change.

use crate::db::Database;
use crate::error::{StoreError, StoreResult};
use crate::subscriptions::{ChangeTracker, MutationKind, Revision};
use crate::types::{Task, TaskQuery};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, trace};

/// Change-notified store of tasks.
#[derive(Clone)]
pub struct TaskStore {
    db: Database,
    changes: Arc<ChangeTracker>,
    /// Last `data_version` seen from the database file.
    seen_version: Arc<Mutex<Option<i64>>>,
}

impl TaskStore {
    pub fn new(db: Database) -> Self {
        let seen_version = db.data_version().ok();
        Self {
            db,
            changes: Arc::new(ChangeTracker::new()),
            seen_version: Arc::new(Mutex::new(seen_version)),
        }
    }

    /// Open or create the SQLite database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    /// In-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    /// The underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// File backing the store, `None` when in memory.
    pub fn path(&self) -> Option<&Path> {
        self.db.path()
    }

    /// Latest table revision.
    pub fn revision(&self) -> Revision {
        self.changes.current()
    }

    async fn blocking<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Database) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db)).await?
    }

    /// Insert a task, assigning an id if it has none; replaces an existing
    /// row with the same id. Returns the stored task.
    pub async fn insert(&self, task: Task) -> StoreResult<Task> {
        let stored = self.blocking(move |db| db.insert_task(&task)).await?;
        debug!(task_id = stored.id, "inserted task");
        self.changes.record(MutationKind::TaskInserted);
        Ok(stored)
    }

    /// Replace the row matching `task.id`. No-op when the task does not exist.
    pub async fn update(&self, task: &Task) -> StoreResult<()> {
        let task = task.clone();
        let task_id = task.id;
        let changed = self.blocking(move |db| db.update_task(&task)).await?;
        if changed > 0 {
            debug!(task_id, "updated task");
            self.changes.record(MutationKind::TaskUpdated);
        } else {
            debug!(task_id, "update skipped, no such task");
        }
        Ok(())
    }

    /// Remove the row matching `task.id`. No-op when the task does not exist.
    pub async fn delete(&self, task: &Task) -> StoreResult<()> {
        let task_id = task.id;
        let removed = self.blocking(move |db| db.delete_task(task_id)).await?;
        if removed > 0 {
            debug!(task_id, "deleted task");
            self.changes.record(MutationKind::TaskDeleted);
        }
        Ok(())
    }

    /// Remove every completed task as one statement. Returns how many rows went.
    pub async fn delete_completed_tasks(&self) -> StoreResult<usize> {
        let removed = self.blocking(|db| db.delete_completed_tasks()).await?;
        debug!(removed, "deleted completed tasks");
        if removed > 0 {
            self.changes.record(MutationKind::CompletedCleared);
        }
        Ok(removed)
    }

    /// Pick up commits made through other connections to the same file,
    /// such as another process. Wakes live queries and returns `true` when
    /// there were any.
    pub async fn sync_external_changes(&self) -> StoreResult<bool> {
        let version = self.blocking(|db| db.data_version()).await?;
        let changed = {
            let mut seen = self
                .seen_version
                .lock()
                .map_err(|_| StoreError::LockPoisoned)?;
            let changed = *seen != Some(version);
            *seen = Some(version);
            changed
        };
        if changed {
            debug!(version, "database changed by another connection");
            self.changes.record(MutationKind::External);
        }
        Ok(changed)
    }

    /// Look up a single task.
    pub async fn get(&self, task_id: i64) -> StoreResult<Option<Task>> {
        self.blocking(move |db| db.get_task(task_id)).await
    }

    /// One-shot read of a query.
    pub async fn fetch(&self, query: &TaskQuery) -> StoreResult<Vec<Task>> {
        let query = query.clone();
        self.blocking(move |db| db.query_tasks(&query)).await
    }

    /// Live view of a query. The first [`LiveQuery::next`] yields the current
    /// result; each later call waits for a table change and yields the
    /// recomputed result.
    pub fn query(&self, query: TaskQuery) -> LiveQuery {
        LiveQuery {
            db: self.db.clone(),
            changes: self.changes.subscribe(),
            query,
            primed: false,
        }
    }
}

/// Push-updated query result.
///
/// Holds only a receiver on the change tracker, so the stream ends once
/// every [`TaskStore`] handle has been dropped.
pub struct LiveQuery {
    db: Database,
    changes: watch::Receiver<Revision>,
    query: TaskQuery,
    primed: bool,
}

impl LiveQuery {
    pub fn query(&self) -> &TaskQuery {
        &self.query
    }

    /// Next snapshot of the result set, or `None` once the store is gone.
    ///
    /// Cancel safe: if the future is dropped after a change was observed but
    /// before the result was delivered, the next call re-reads immediately.
    pub async fn next(&mut self) -> Option<StoreResult<Vec<Task>>> {
        if self.primed {
            if self.changes.changed().await.is_err() {
                return None;
            }
            self.primed = false;
        }
        let rev = *self.changes.borrow_and_update();
        trace!(seq = rev.seq, last = ?rev.last, query = ?self.query, "running live query");

        let db = self.db.clone();
        let query = self.query.clone();
        let result = match tokio::task::spawn_blocking(move || db.query_tasks(&query)).await {
            Ok(result) => result,
            Err(e) => Err(e.into()),
        };
        self.primed = true;
        Some(result)
    }
}
