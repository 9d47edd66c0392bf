//! Output formatting utilities for markdown and JSON.

use crate::types::{FilterPreferences, Task};
use serde_json::{Value, json};

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    Json,
    #[default]
    Markdown,
}

/// Format a single task as a markdown checklist line.
pub fn format_task_markdown(task: &Task) -> String {
    let check = if task.completed { "x" } else { " " };
    let star = if task.important { " !" } else { "" };
    format!(
        "- [{}] {}{} (`#{}`, {})",
        check,
        task.name,
        star,
        task.id,
        task.created_formatted()
    )
}

/// Format a task list as markdown with a header describing the active filter.
pub fn format_tasks_markdown(tasks: &[Task], prefs: &FilterPreferences, search: &str) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Tasks ({})\n", tasks.len()));
    md.push_str(&format!("_sort: {}", prefs.sort_order));
    if prefs.hide_completed {
        md.push_str(", completed hidden");
    }
    if !search.is_empty() {
        md.push_str(&format!(", search: \"{}\"", search));
    }
    md.push_str("_\n\n");

    if tasks.is_empty() {
        md.push_str("No tasks.\n");
    }
    for task in tasks {
        md.push_str(&format_task_markdown(task));
        md.push('\n');
    }

    md
}

/// Format preferences as markdown.
pub fn format_preferences_markdown(prefs: &FilterPreferences) -> String {
    format!(
        "- **sort_order**: {}\n- **hide_completed**: {}\n",
        prefs.sort_order, prefs.hide_completed
    )
}

/// JSON payload for a task list.
pub fn tasks_json(tasks: &[Task], prefs: &FilterPreferences, search: &str) -> Value {
    json!({
        "search": search,
        "preferences": prefs,
        "count": tasks.len(),
        "tasks": tasks,
    })
}
