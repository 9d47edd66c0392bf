//! Confirmation step for deleting all completed tasks.

use crate::error::StoreResult;
use crate::store::TaskStore;
use tokio::task::JoinHandle;

pub struct DeleteAllCompletedController {
    store: TaskStore,
}

impl DeleteAllCompletedController {
    pub fn new(store: TaskStore) -> Self {
        Self { store }
    }

    /// Run the bulk delete detached from the caller, so it finishes even if
    /// the confirming screen is torn down. Resolves to the removed-row count.
    pub fn on_confirm_click(&self) -> JoinHandle<StoreResult<usize>> {
        let store = self.store.clone();
        tokio::spawn(async move { store.delete_completed_tasks().await })
    }
}
