//! Task table CRUD and the filtered/sorted list query.

use super::Database;
use crate::error::StoreResult;
use crate::types::{Task, TaskQuery};
use rusqlite::{Connection, Row, params};

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get("id")?,
        name: row.get("name")?,
        important: row.get("important")?,
        completed: row.get("completed")?,
        created: row.get("created")?,
    })
}

/// Internal helper to get a task using an existing connection (avoids deadlock).
fn get_task_internal(conn: &Connection, task_id: i64) -> StoreResult<Option<Task>> {
    let mut stmt = conn.prepare("SELECT * FROM tasks WHERE id = ?1")?;

    let result = stmt.query_row(params![task_id], parse_task_row);

    match result {
        Ok(task) => Ok(Some(task)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl Database {
    /// Insert a task.
    ///
    /// A task with `id == 0` gets a freshly generated id. A task that already
    /// carries an id is written with replace-on-conflict semantics, so
    /// re-inserting a deleted task restores it under its original id.
    /// Returns the stored task.
    pub fn insert_task(&self, task: &Task) -> StoreResult<Task> {
        self.with_conn(|conn| {
            if task.is_persisted() {
                conn.execute(
                    "INSERT OR REPLACE INTO tasks (id, name, important, completed, created)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        task.id,
                        task.name,
                        task.important,
                        task.completed,
                        task.created
                    ],
                )?;
                Ok(task.clone())
            } else {
                conn.execute(
                    "INSERT INTO tasks (name, important, completed, created)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![task.name, task.important, task.completed, task.created],
                )?;
                Ok(Task {
                    id: conn.last_insert_rowid(),
                    ..task.clone()
                })
            }
        })
    }

    /// Replace the row matching `task.id`. Returns the number of rows changed
    /// (0 when no such row exists).
    pub fn update_task(&self, task: &Task) -> StoreResult<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE tasks SET name = ?2, important = ?3, completed = ?4, created = ?5
                 WHERE id = ?1",
                params![
                    task.id,
                    task.name,
                    task.important,
                    task.completed,
                    task.created
                ],
            )?;
            Ok(changed)
        })
    }

    /// Delete a task by id. Returns the number of rows removed.
    pub fn delete_task(&self, task_id: i64) -> StoreResult<usize> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
            Ok(removed)
        })
    }

    /// Delete every completed task in a single statement.
    pub fn delete_completed_tasks(&self) -> StoreResult<usize> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM tasks WHERE completed = 1", [])?;
            Ok(removed)
        })
    }

    /// Get a task by id.
    pub fn get_task(&self, task_id: i64) -> StoreResult<Option<Task>> {
        self.with_conn(|conn| get_task_internal(conn, task_id))
    }

    /// Run the list query: name substring match, optional completed filter,
    /// important tasks first, then the chosen secondary key.
    pub fn query_tasks(&self, query: &TaskQuery) -> StoreResult<Vec<Task>> {
        let sql = format!(
            "SELECT * FROM tasks
             WHERE (completed = 0 OR ?1 = 0)
               AND name LIKE ?2 ESCAPE '\\'
             ORDER BY {}",
            query.sort_order.order_clause()
        );

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let tasks = stmt
                .query_map(
                    params![query.hide_completed, query.like_pattern()],
                    parse_task_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tasks)
        })
    }

    /// Count all tasks and completed tasks.
    pub fn task_counts(&self) -> StoreResult<(usize, usize)> {
        self.with_conn(|conn| {
            let counts = conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(completed), 0) FROM tasks",
                [],
                |row| Ok((row.get::<_, i64>(0)? as usize, row.get::<_, i64>(1)? as usize)),
            )?;
            Ok(counts)
        })
    }
}
