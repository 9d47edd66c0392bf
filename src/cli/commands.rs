//! Command execution.
//!
//! Every command drives the same controllers a graphical front end would:
//! the add/edit flow goes through [`TaskEditController`] and reports its
//! result code back to [`TaskListController`], which produces the
//! confirmation text.

use super::{AddArgs, EditArgs, ListArgs, PrefsArgs, TaskIdArgs, WatchArgs};
use crate::config::Config;
use crate::controller::{
    AddEditTaskEvent, DeleteAllCompletedController, TaskEditController, TaskEvent,
    TaskListController, TaskListSnapshot,
};
use crate::format::{
    OutputFormat, format_preferences_markdown, format_tasks_markdown, tasks_json,
};
use crate::preferences::PreferenceStore;
use crate::state::SavedState;
use crate::store::TaskStore;
use crate::types::{FilterPreferences, Task};
use crate::watcher::{DEFAULT_DEBOUNCE, start_watcher};
use anyhow::{Context, Result, anyhow, bail};
use serde_json::json;
use std::future::Future;
use std::time::Duration;
use tracing::info;

/// Opened stores plus output settings shared by every command.
pub struct App {
    store: TaskStore,
    preferences: PreferenceStore,
    format: OutputFormat,
    event_capacity: usize,
    watch_debounce: Duration,
}

impl App {
    pub fn new(
        store: TaskStore,
        preferences: PreferenceStore,
        format: OutputFormat,
        event_capacity: usize,
    ) -> Self {
        Self {
            store,
            preferences,
            format,
            event_capacity,
            watch_debounce: DEFAULT_DEBOUNCE,
        }
    }

    /// Quiet period `watch` waits for before reacting to file changes.
    pub fn with_watch_debounce(mut self, debounce: Duration) -> Self {
        self.watch_debounce = debounce;
        self
    }

    /// Open the database and preference file named by `config`.
    pub async fn open(config: &Config, format: OutputFormat) -> Result<Self> {
        let db_path = config.database_path();
        let store = TaskStore::open(&db_path)
            .with_context(|| format!("opening task database {}", db_path.display()))?;
        let preferences = PreferenceStore::open(config.preferences_path()).await;
        info!(database = %db_path.display(), "task store ready");
        Ok(Self::new(store, preferences, format, config.events.capacity)
            .with_watch_debounce(config.watch.debounce()))
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn preferences(&self) -> &PreferenceStore {
        &self.preferences
    }

    fn list_controller(&self) -> TaskListController {
        TaskListController::new(
            self.store.clone(),
            self.preferences.clone(),
            SavedState::new(),
            self.event_capacity,
        )
    }

    async fn find_task(&self, id: i64) -> Result<Task> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| anyhow!("Task not found: {}", id))
    }

    /// Show the list, persisting any sort/filter change first.
    pub async fn list(&self, args: ListArgs) -> Result<String> {
        let controller = self.list_controller();
        if let Some(sort) = args.sort {
            controller.on_sort_order_selected(sort.into()).await?;
        }
        if let Some(hide) = args.hide_completed {
            controller.on_hide_completed_clicked(hide).await?;
        }
        if let Some(search) = args.search {
            controller.on_search_query_changed(search);
        }

        let snapshot = controller.settled().await;
        if let Some(error) = snapshot.error {
            bail!("task query failed: {}", error);
        }
        Ok(self.render_list(&snapshot))
    }

    pub async fn add(&self, args: AddArgs) -> Result<String> {
        let mut editor =
            TaskEditController::new(self.store.clone(), SavedState::new(), self.event_capacity);
        editor.set_task_name(args.name);
        editor.set_task_importance(args.important);
        self.save(editor).await
    }

    pub async fn edit(&self, args: EditArgs) -> Result<String> {
        let task = self.find_task(args.id).await?;
        let mut editor = TaskEditController::for_task(
            self.store.clone(),
            SavedState::new(),
            task,
            self.event_capacity,
        );
        if let Some(name) = args.name {
            editor.set_task_name(name);
        }
        if let Some(important) = args.important {
            editor.set_task_importance(important);
        }
        self.save(editor).await
    }

    /// Run the save flow and translate its events into output.
    async fn save(&self, editor: TaskEditController) -> Result<String> {
        let mut edit_events = editor
            .events()
            .ok_or_else(|| anyhow!("edit events already attached"))?;
        editor.on_save_click().await?;

        match edit_events.try_recv() {
            Some(AddEditTaskEvent::ShowInvalidInputMessage(msg)) => bail!(msg),
            Some(AddEditTaskEvent::NavigateBackWithResult(code)) => {
                let list = self.list_controller();
                let mut list_events = list
                    .events()
                    .ok_or_else(|| anyhow!("list events already attached"))?;
                list.on_add_edit_result(code).await;
                match list_events.try_recv() {
                    Some(TaskEvent::ShowTaskSavedConfirmationMessage(msg)) => {
                        Ok(self.render_message(&msg))
                    }
                    _ => Ok(String::new()),
                }
            }
            None => Ok(String::new()),
        }
    }

    /// Set the completion flag of a task.
    pub async fn set_completed(&self, args: TaskIdArgs, completed: bool) -> Result<String> {
        let task = self.find_task(args.id).await?;
        let controller = self.list_controller();
        controller.on_task_checked(&task, completed).await?;
        let verb = if completed { "completed" } else { "reopened" };
        Ok(self.render_message(&format!("Task #{} {}", task.id, verb)))
    }

    pub async fn delete(&self, args: TaskIdArgs) -> Result<String> {
        let task = self.find_task(args.id).await?;
        let controller = self.list_controller();
        let mut events = controller
            .events()
            .ok_or_else(|| anyhow!("list events already attached"))?;
        controller.on_task_swiped(task).await?;

        match events.try_recv() {
            Some(TaskEvent::ShowUndoDeleteTaskMessage(deleted)) => Ok(self.render_message(
                &format!("Task deleted: {} (`#{}`)", deleted.name, deleted.id),
            )),
            _ => Ok(String::new()),
        }
    }

    /// Delete all completed tasks once `confirm` agrees.
    pub async fn clear_completed<F>(&self, confirm: F) -> Result<String>
    where
        F: FnOnce() -> bool,
    {
        let controller = self.list_controller();
        let mut events = controller
            .events()
            .ok_or_else(|| anyhow!("list events already attached"))?;
        controller.on_delete_all_completed_click().await;

        let requested = matches!(
            events.try_recv(),
            Some(TaskEvent::NavigateToDeleteAllCompletedScreen)
        );
        if !requested || !confirm() {
            return Ok(self.render_message("Nothing deleted"));
        }

        let removed = DeleteAllCompletedController::new(self.store.clone())
            .on_confirm_click()
            .await??;
        Ok(self.render_message(&format!("Deleted {} completed task(s)", removed)))
    }

    pub async fn prefs(&self, args: PrefsArgs) -> Result<String> {
        if let Some(sort) = args.sort {
            self.preferences.update_sort_order(sort.into()).await?;
        }
        if let Some(hide) = args.hide_completed {
            self.preferences.update_hide_completed(hide).await?;
        }
        let prefs = self.preferences.current();
        Ok(match self.format {
            OutputFormat::Json => json!(prefs).to_string(),
            OutputFormat::Markdown => format_preferences_markdown(&prefs),
        })
    }

    /// Emit the list every time it changes until `shutdown` resolves,
    /// including changes other processes make to the database or the
    /// preference file.
    pub async fn watch<S, F>(&self, args: WatchArgs, shutdown: S, mut emit: F) -> Result<()>
    where
        S: Future<Output = ()>,
        F: FnMut(String),
    {
        let _watcher = start_watcher(
            self.store.clone(),
            self.preferences.clone(),
            self.watch_debounce,
        )
        .context("starting file watcher")?;
        let controller = self.list_controller();
        if let Some(search) = args.search {
            controller.on_search_query_changed(search);
        }
        let mut rx = controller.tasks();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => return Ok(()),
                changed = rx.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                    let snapshot = rx.borrow_and_update().clone();
                    if snapshot.error.is_none() && snapshot.query.is_some() {
                        emit(self.render_list(&snapshot));
                    }
                }
            }
        }
    }

    fn render_list(&self, snapshot: &TaskListSnapshot) -> String {
        let query = snapshot.query.clone().unwrap_or_default();
        let prefs = FilterPreferences {
            sort_order: query.sort_order,
            hide_completed: query.hide_completed,
        };
        match self.format {
            OutputFormat::Json => tasks_json(&snapshot.tasks, &prefs, &query.search).to_string(),
            OutputFormat::Markdown => format_tasks_markdown(&snapshot.tasks, &prefs, &query.search),
        }
    }

    fn render_message(&self, message: &str) -> String {
        match self.format {
            OutputFormat::Json => json!({ "message": message }).to_string(),
            OutputFormat::Markdown => message.to_string(),
        }
    }
}
