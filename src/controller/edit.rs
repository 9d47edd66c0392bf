//! Add/edit task controller.

use crate::error::StoreResult;
use crate::events::{EventChannel, EventSubscription};
use crate::state::SavedState;
use crate::store::TaskStore;
use crate::types::{ADD_TASK_RESULT_OK, EDIT_TASK_RESULT_OK, Task};
use tracing::debug;

/// Saved-state key holding the task being edited (absent when adding).
pub const TASK_KEY: &str = "task";
pub const TASK_NAME_KEY: &str = "task_name";
pub const TASK_IMPORTANCE_KEY: &str = "task_importance";

/// Message shown when saving a task with a blank name.
pub const EMPTY_NAME_MESSAGE: &str = "Name cannot be empty";

/// One-shot notifications for the add/edit screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddEditTaskEvent {
    ShowInvalidInputMessage(String),
    NavigateBackWithResult(i32),
}

pub struct TaskEditController {
    store: TaskStore,
    state: SavedState,
    task: Option<Task>,
    task_name: String,
    task_importance: bool,
    events: EventChannel<AddEditTaskEvent>,
}

impl TaskEditController {
    /// Restore the edit session from `state`.
    ///
    /// Name and importance come from their own saved entries first, then
    /// from the task being edited, then from the empty defaults.
    pub fn new(store: TaskStore, state: SavedState, event_capacity: usize) -> Self {
        let task = state.get::<Task>(TASK_KEY);
        let task_name = state
            .get::<String>(TASK_NAME_KEY)
            .or_else(|| task.as_ref().map(|t| t.name.clone()))
            .unwrap_or_default();
        let task_importance = state
            .get::<bool>(TASK_IMPORTANCE_KEY)
            .or_else(|| task.as_ref().map(|t| t.important))
            .unwrap_or(false);

        Self {
            store,
            state,
            task,
            task_name,
            task_importance,
            events: EventChannel::new(event_capacity),
        }
    }

    /// Start editing `task`, recording it in `state`.
    pub fn for_task(store: TaskStore, state: SavedState, task: Task, event_capacity: usize) -> Self {
        state.set(TASK_KEY, &task);
        Self::new(store, state, event_capacity)
    }

    /// The task being edited, or `None` when creating a new one.
    pub fn task(&self) -> Option<&Task> {
        self.task.as_ref()
    }

    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    pub fn set_task_name(&mut self, name: impl Into<String>) {
        self.task_name = name.into();
        self.state.set(TASK_NAME_KEY, &self.task_name);
    }

    pub fn task_importance(&self) -> bool {
        self.task_importance
    }

    pub fn set_task_importance(&mut self, important: bool) {
        self.task_importance = important;
        self.state.set(TASK_IMPORTANCE_KEY, important);
    }

    /// Attach the single event consumer.
    pub fn events(&self) -> Option<EventSubscription<AddEditTaskEvent>> {
        self.events.attach()
    }

    /// Validate and persist. A blank name only produces a message; a storage
    /// failure is returned without navigating back.
    pub async fn on_save_click(&self) -> StoreResult<()> {
        if self.task_name.trim().is_empty() {
            self.events
                .send(AddEditTaskEvent::ShowInvalidInputMessage(
                    EMPTY_NAME_MESSAGE.to_string(),
                ))
                .await;
            return Ok(());
        }

        let result = match &self.task {
            Some(task) => {
                let updated = Task {
                    name: self.task_name.clone(),
                    important: self.task_importance,
                    ..task.clone()
                };
                self.store.update(&updated).await?;
                debug!(task_id = updated.id, "task edited");
                EDIT_TASK_RESULT_OK
            }
            None => {
                let created = self
                    .store
                    .insert(Task::new(self.task_name.clone(), self.task_importance))
                    .await?;
                debug!(task_id = created.id, "task added");
                ADD_TASK_RESULT_OK
            }
        };

        self.events
            .send(AddEditTaskEvent::NavigateBackWithResult(result))
            .await;
        Ok(())
    }
}
