//! Task list controller.
//!
//! Combines the search text and the preference stream into the active
//! query. Whenever either input changes, the running [`LiveQuery`] is
//! dropped and a new one is issued with the new parameters. Results land in
//! a `watch` channel (latest snapshot wins). User actions become store or
//! preference mutations and one-shot [`TaskEvent`]s.
//!
//! Each published [`TaskListSnapshot`] carries the query that produced it,
//! so a consumer can tell a fresh result from one still computed with the
//! previous search text or preferences.
//!
//! [`LiveQuery`]: crate::store::LiveQuery

use crate::error::StoreResult;
use crate::events::{EventChannel, EventSubscription};
use crate::preferences::PreferenceStore;
use crate::state::SavedState;
use crate::store::TaskStore;
use crate::types::{
    ADD_TASK_RESULT_OK, EDIT_TASK_RESULT_OK, FilterPreferences, SortOrder, Task, TaskQuery,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Saved-state key for the search text.
pub const SEARCH_QUERY_KEY: &str = "search_query";

/// A published list together with the query that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskListSnapshot {
    /// `None` until the first query has completed.
    pub query: Option<TaskQuery>,
    pub tasks: Vec<Task>,
    /// Set when the latest run of `query` failed; `tasks` then still holds
    /// the previous result.
    pub error: Option<String>,
}

/// One-shot notifications for the list screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    NavigateToAddTaskScreen,
    NavigateToEditTaskScreen(Task),
    ShowUndoDeleteTaskMessage(Task),
    ShowTaskSavedConfirmationMessage(String),
    NavigateToDeleteAllCompletedScreen,
}

pub struct TaskListController {
    store: TaskStore,
    preferences: PreferenceStore,
    state: SavedState,
    search: watch::Sender<String>,
    tasks: watch::Receiver<TaskListSnapshot>,
    events: EventChannel<TaskEvent>,
    pipeline: JoinHandle<()>,
}

impl TaskListController {
    /// Create the controller and start its query pipeline.
    ///
    /// Must be called from within a tokio runtime. The search text is
    /// restored from `state` if present.
    pub fn new(
        store: TaskStore,
        preferences: PreferenceStore,
        state: SavedState,
        event_capacity: usize,
    ) -> Self {
        let initial_search = state.get::<String>(SEARCH_QUERY_KEY).unwrap_or_default();
        let (search, search_rx) = watch::channel(initial_search);
        let (tasks_tx, tasks) = watch::channel(TaskListSnapshot::default());

        let pipeline = tokio::spawn(run_pipeline(
            store.clone(),
            search_rx,
            preferences.read_preferences(),
            tasks_tx,
        ));

        Self {
            store,
            preferences,
            state,
            search,
            tasks,
            events: EventChannel::new(event_capacity),
            pipeline,
        }
    }

    /// Receiver for the continuously updated, filtered and sorted task list.
    pub fn tasks(&self) -> watch::Receiver<TaskListSnapshot> {
        self.tasks.clone()
    }

    /// The query the pipeline is expected to be running for the current
    /// search text and preferences.
    pub fn active_query(&self) -> TaskQuery {
        TaskQuery::from_preferences(self.search_query(), self.preferences.current())
    }

    /// Wait until the published snapshot was computed for the current
    /// search text and preferences, then return it.
    pub async fn settled(&self) -> TaskListSnapshot {
        let expected = self.active_query();
        let mut rx = self.tasks.clone();
        match rx
            .wait_for(|snapshot| snapshot.query.as_ref() == Some(&expected))
            .await
        {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.tasks.borrow().clone(),
        }
    }

    pub fn search_query(&self) -> String {
        self.search.borrow().clone()
    }

    /// Attach the single event consumer.
    pub fn events(&self) -> Option<EventSubscription<TaskEvent>> {
        self.events.attach()
    }

    pub fn on_search_query_changed(&self, query: impl Into<String>) {
        let query = query.into();
        self.state.set(SEARCH_QUERY_KEY, &query);
        self.search.send_if_modified(|current| {
            if *current == query {
                false
            } else {
                *current = query;
                true
            }
        });
    }

    pub async fn on_sort_order_selected(&self, sort_order: SortOrder) -> StoreResult<()> {
        self.preferences.update_sort_order(sort_order).await
    }

    pub async fn on_hide_completed_clicked(&self, hide_completed: bool) -> StoreResult<()> {
        self.preferences.update_hide_completed(hide_completed).await
    }

    pub async fn on_task_selected(&self, task: Task) {
        self.events
            .send(TaskEvent::NavigateToEditTaskScreen(task))
            .await;
    }

    pub async fn on_task_checked(&self, task: &Task, checked: bool) -> StoreResult<()> {
        self.store.update(&task.with_completed(checked)).await
    }

    /// Delete the task and offer an undo.
    pub async fn on_task_swiped(&self, task: Task) -> StoreResult<()> {
        self.store.delete(&task).await?;
        self.events
            .send(TaskEvent::ShowUndoDeleteTaskMessage(task))
            .await;
        Ok(())
    }

    /// Re-insert a swiped task under its original id.
    pub async fn on_undo_delete_clicked(&self, task: Task) -> StoreResult<()> {
        self.store.insert(task).await?;
        Ok(())
    }

    pub async fn on_add_new_task_clicked(&self) {
        self.events.send(TaskEvent::NavigateToAddTaskScreen).await;
    }

    /// Confirm a finished add/edit. Unknown result codes are ignored.
    pub async fn on_add_edit_result(&self, result: i32) {
        let message = match result {
            ADD_TASK_RESULT_OK => "Task added",
            EDIT_TASK_RESULT_OK => "Task edited",
            _ => return,
        };
        self.events
            .send(TaskEvent::ShowTaskSavedConfirmationMessage(
                message.to_string(),
            ))
            .await;
    }

    pub async fn on_delete_all_completed_click(&self) {
        self.events
            .send(TaskEvent::NavigateToDeleteAllCompletedScreen)
            .await;
    }
}

impl Drop for TaskListController {
    fn drop(&mut self) {
        self.pipeline.abort();
    }
}

/// Restart-on-change combination of search text and preferences.
async fn run_pipeline(
    store: TaskStore,
    mut search: watch::Receiver<String>,
    mut preferences: watch::Receiver<FilterPreferences>,
    out: watch::Sender<TaskListSnapshot>,
) {
    loop {
        let query = TaskQuery::from_preferences(
            search.borrow_and_update().clone(),
            *preferences.borrow_and_update(),
        );
        debug!(?query, "issuing task query");
        let mut live = store.query(query.clone());

        loop {
            tokio::select! {
                changed = search.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    break;
                }
                changed = preferences.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    break;
                }
                next = live.next() => match next {
                    Some(Ok(tasks)) => {
                        out.send_replace(TaskListSnapshot {
                            query: Some(query.clone()),
                            tasks,
                            error: None,
                        });
                    }
                    // Keep the last good list; the query re-runs on the next change
                    Some(Err(e)) => {
                        error!(error = %e, "task query failed");
                        out.send_modify(|snapshot| {
                            snapshot.query = Some(query.clone());
                            snapshot.error = Some(e.to_string());
                        });
                    }
                    None => return,
                },
            }
        }
    }
}
