//! Core types for the task list.

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

/// Result code reported back to the list screen after a task was created.
pub const ADD_TASK_RESULT_OK: i32 = 1;

/// Result code reported back to the list screen after a task was edited.
pub const EDIT_TASK_RESULT_OK: i32 = 2;

/// A single to-do item.
///
/// `id == 0` means the task has not been persisted yet; the store assigns
/// the id on first insert. `created` is stamped once and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub important: bool,
    #[serde(default)]
    pub completed: bool,
    /// Creation time in milliseconds since the Unix epoch.
    pub created: i64,
}

impl Task {
    /// Create an unsaved task stamped with the current time.
    pub fn new(name: impl Into<String>, important: bool) -> Self {
        Self {
            id: 0,
            name: name.into(),
            important,
            completed: false,
            created: crate::db::now_ms(),
        }
    }

    /// Whether the store has assigned this task an id yet.
    pub fn is_persisted(&self) -> bool {
        self.id != 0
    }

    /// Copy of this task with a different completion flag.
    pub fn with_completed(&self, completed: bool) -> Self {
        Self {
            completed,
            ..self.clone()
        }
    }

    /// Creation time rendered in the local timezone, e.g. `2024-03-01 14:05:09`.
    pub fn created_formatted(&self) -> String {
        match Local.timestamp_millis_opt(self.created).single() {
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => self.created.to_string(),
        }
    }
}

/// Secondary ordering key. Importance always sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortOrder {
    #[default]
    ByName,
    ByDate,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::ByName => "BY_NAME",
            SortOrder::ByDate => "BY_DATE",
        }
    }

    /// SQL ORDER BY expression for this sort order.
    pub(crate) fn order_clause(&self) -> &'static str {
        match self {
            SortOrder::ByName => "important DESC, name ASC, id ASC",
            SortOrder::ByDate => "important DESC, created ASC, id ASC",
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the persisted filter settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterPreferences {
    pub sort_order: SortOrder,
    pub hide_completed: bool,
}

/// Parameters of a task list query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskQuery {
    /// Substring the task name must contain. Empty matches everything.
    pub search: String,
    pub sort_order: SortOrder,
    pub hide_completed: bool,
}

impl TaskQuery {
    pub fn new(search: impl Into<String>, sort_order: SortOrder, hide_completed: bool) -> Self {
        Self {
            search: search.into(),
            sort_order,
            hide_completed,
        }
    }

    /// Build a query from a search string and the current preferences.
    pub fn from_preferences(search: impl Into<String>, prefs: FilterPreferences) -> Self {
        Self::new(search, prefs.sort_order, prefs.hide_completed)
    }

    /// The search text as a LIKE pattern with wildcards escaped.
    pub(crate) fn like_pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.search.len() + 2);
        pattern.push('%');
        for c in self.search.chars() {
            if matches!(c, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    }
}
