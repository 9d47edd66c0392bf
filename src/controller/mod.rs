//! Controllers that turn user actions into store mutations and one-shot events.

pub mod delete_completed;
pub mod edit;
pub mod task_list;

pub use delete_completed::DeleteAllCompletedController;
pub use edit::{AddEditTaskEvent, TaskEditController};
pub use task_list::{TaskEvent, TaskListController, TaskListSnapshot};
