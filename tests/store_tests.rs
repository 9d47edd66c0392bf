//! Integration tests for the task store.
//!
//! These tests run against an in-memory SQLite database and cover the query
//! contract (substring search, hide-completed filter, importance-first
//! ordering) and the mutation contract (insert, update, delete, bulk delete).

use tasklist::error::StoreError;
use tasklist::store::TaskStore;
use tasklist::types::{SortOrder, Task, TaskQuery};

/// Helper to create a fresh in-memory store for testing.
fn setup_store() -> TaskStore {
    TaskStore::open_in_memory().expect("Failed to create in-memory store")
}

fn task_at(name: &str, important: bool, completed: bool, created: i64) -> Task {
    Task {
        id: 0,
        name: name.to_string(),
        important,
        completed,
        created,
    }
}

fn all(sort_order: SortOrder) -> TaskQuery {
    TaskQuery::new("", sort_order, false)
}

fn names(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(|t| t.name.as_str()).collect()
}

mod insert_tests {
    use super::*;

    #[tokio::test]
    async fn insert_assigns_unique_ids() {
        let store = setup_store();
        let a = store.insert(Task::new("a", false)).await.unwrap();
        let b = store.insert(Task::new("b", false)).await.unwrap();

        assert!(a.id > 0);
        assert!(b.id > 0);
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn inserted_task_is_queryable_with_same_fields() {
        let store = setup_store();
        let original = task_at("Write report", true, false, 1_234);
        let stored = store.insert(original.clone()).await.unwrap();

        let tasks = store.fetch(&all(SortOrder::ByName)).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0], stored);
        assert_eq!(tasks[0].name, original.name);
        assert_eq!(tasks[0].important, original.important);
        assert_eq!(tasks[0].completed, original.completed);
        assert_eq!(tasks[0].created, original.created);
    }

    #[tokio::test]
    async fn insert_with_existing_id_replaces_row() {
        let store = setup_store();
        let stored = store.insert(Task::new("draft", false)).await.unwrap();

        let replacement = Task {
            name: "final".to_string(),
            ..stored.clone()
        };
        store.insert(replacement).await.unwrap();

        let tasks = store.fetch(&all(SortOrder::ByName)).await.unwrap();
        assert_eq!(names(&tasks), vec!["final"]);
        assert_eq!(tasks[0].id, stored.id);
    }

    #[tokio::test]
    async fn undo_reinsert_restores_original_identity() {
        let store = setup_store();
        let stored = store
            .insert(task_at("Water plants", true, true, 42))
            .await
            .unwrap();

        store.delete(&stored).await.unwrap();
        assert!(store.fetch(&all(SortOrder::ByName)).await.unwrap().is_empty());

        let restored = store.insert(stored.clone()).await.unwrap();
        assert_eq!(restored, stored);

        let tasks = store.fetch(&all(SortOrder::ByName)).await.unwrap();
        assert_eq!(tasks, vec![stored]);
    }

    #[tokio::test]
    async fn deleted_ids_are_not_reused() {
        let store = setup_store();
        let first = store.insert(Task::new("first", false)).await.unwrap();
        store.delete(&first).await.unwrap();

        let second = store.insert(Task::new("second", false)).await.unwrap();
        assert_ne!(second.id, first.id);
    }
}

mod mutation_tests {
    use super::*;

    #[tokio::test]
    async fn update_replaces_whole_row() {
        let store = setup_store();
        let stored = store.insert(task_at("old", false, false, 10)).await.unwrap();

        let edited = Task {
            name: "new".to_string(),
            important: true,
            completed: true,
            ..stored.clone()
        };
        store.update(&edited).await.unwrap();

        let fetched = store.get(stored.id).await.unwrap().unwrap();
        assert_eq!(fetched, edited);
        assert_eq!(fetched.created, 10);
    }

    #[tokio::test]
    async fn update_missing_task_is_noop() {
        let store = setup_store();
        let ghost = Task {
            id: 404,
            ..Task::new("ghost", false)
        };

        store.update(&ghost).await.unwrap();
        assert!(store.get(404).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_missing_task_is_noop() {
        let store = setup_store();
        let kept = store.insert(Task::new("kept", false)).await.unwrap();
        let ghost = Task {
            id: kept.id + 100,
            ..Task::new("ghost", false)
        };

        store.delete(&ghost).await.unwrap();
        assert_eq!(store.fetch(&all(SortOrder::ByName)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_completed_removes_only_completed() {
        let store = setup_store();
        store.insert(task_at("open 1", false, false, 1)).await.unwrap();
        store.insert(task_at("done 1", false, true, 2)).await.unwrap();
        store.insert(task_at("done 2", true, true, 3)).await.unwrap();
        store.insert(task_at("open 2", true, false, 4)).await.unwrap();

        let removed = store.delete_completed_tasks().await.unwrap();
        assert_eq!(removed, 2);

        let tasks = store.fetch(&all(SortOrder::ByDate)).await.unwrap();
        assert_eq!(names(&tasks), vec!["open 2", "open 1"]);
        assert!(tasks.iter().all(|t| !t.completed));
        assert_eq!(store.database().task_counts().unwrap(), (2, 0));
    }
}

mod query_tests {
    use super::*;

    #[tokio::test]
    async fn search_matches_substrings() {
        let store = setup_store();
        store.insert(Task::new("Buy milk", false)).await.unwrap();
        store.insert(Task::new("Buy bread", false)).await.unwrap();
        store.insert(Task::new("Call plumber", false)).await.unwrap();

        let tasks = store
            .fetch(&TaskQuery::new("Buy", SortOrder::ByName, false))
            .await
            .unwrap();
        assert_eq!(names(&tasks), vec!["Buy bread", "Buy milk"]);

        let tasks = store
            .fetch(&TaskQuery::new("umb", SortOrder::ByName, false))
            .await
            .unwrap();
        assert_eq!(names(&tasks), vec!["Call plumber"]);
    }

    #[tokio::test]
    async fn search_is_ascii_case_insensitive() {
        let store = setup_store();
        store.insert(Task::new("Buy MILK", false)).await.unwrap();

        let tasks = store
            .fetch(&TaskQuery::new("milk", SortOrder::ByName, false))
            .await
            .unwrap();
        assert_eq!(tasks.len(), 1);
    }

    #[tokio::test]
    async fn search_treats_wildcards_literally() {
        let store = setup_store();
        store.insert(Task::new("50% off sale", false)).await.unwrap();
        store.insert(Task::new("500 emails", false)).await.unwrap();
        store.insert(Task::new("snake_case rename", false)).await.unwrap();
        store.insert(Task::new("snakeXcase", false)).await.unwrap();

        let tasks = store
            .fetch(&TaskQuery::new("50%", SortOrder::ByName, false))
            .await
            .unwrap();
        assert_eq!(names(&tasks), vec!["50% off sale"]);

        let tasks = store
            .fetch(&TaskQuery::new("e_c", SortOrder::ByName, false))
            .await
            .unwrap();
        assert_eq!(names(&tasks), vec!["snake_case rename"]);
    }

    #[tokio::test]
    async fn hide_completed_filters_completed_tasks() {
        let store = setup_store();
        store.insert(task_at("open", false, false, 1)).await.unwrap();
        store.insert(task_at("done", false, true, 2)).await.unwrap();

        let shown = store
            .fetch(&TaskQuery::new("", SortOrder::ByName, false))
            .await
            .unwrap();
        assert_eq!(names(&shown), vec!["done", "open"]);

        let hidden = store
            .fetch(&TaskQuery::new("", SortOrder::ByName, true))
            .await
            .unwrap();
        assert_eq!(names(&hidden), vec!["open"]);
    }

    #[tokio::test]
    async fn hide_completed_combines_with_search() {
        let store = setup_store();
        store.insert(task_at("report draft", false, true, 1)).await.unwrap();
        store.insert(task_at("report final", false, false, 2)).await.unwrap();
        store.insert(task_at("groceries", false, false, 3)).await.unwrap();

        let tasks = store
            .fetch(&TaskQuery::new("report", SortOrder::ByName, true))
            .await
            .unwrap();
        assert_eq!(names(&tasks), vec!["report final"]);
    }

    #[tokio::test]
    async fn by_name_puts_important_first_then_name() {
        let store = setup_store();
        store.insert(task_at("banana", false, false, 1)).await.unwrap();
        store.insert(task_at("zebra", true, false, 2)).await.unwrap();
        store.insert(task_at("apple", false, false, 3)).await.unwrap();
        store.insert(task_at("mango", true, false, 4)).await.unwrap();

        let tasks = store.fetch(&all(SortOrder::ByName)).await.unwrap();
        assert_eq!(names(&tasks), vec!["mango", "zebra", "apple", "banana"]);
    }

    #[tokio::test]
    async fn by_date_puts_important_first_then_oldest() {
        let store = setup_store();
        store.insert(task_at("c", false, false, 300)).await.unwrap();
        store.insert(task_at("a", true, false, 200)).await.unwrap();
        store.insert(task_at("b", false, false, 100)).await.unwrap();
        store.insert(task_at("d", true, false, 50)).await.unwrap();

        let tasks = store.fetch(&all(SortOrder::ByDate)).await.unwrap();
        assert_eq!(names(&tasks), vec!["d", "a", "b", "c"]);
    }

    #[tokio::test]
    async fn sort_invariant_holds_for_every_pair() {
        let store = setup_store();
        let rows = [
            ("k", false, 9),
            ("b", true, 3),
            ("x", false, 1),
            ("a", true, 7),
            ("m", false, 5),
            ("c", true, 2),
        ];
        for (name, important, created) in rows {
            store
                .insert(task_at(name, important, false, created))
                .await
                .unwrap();
        }

        for order in [SortOrder::ByName, SortOrder::ByDate] {
            let tasks = store.fetch(&all(order)).await.unwrap();
            for pair in tasks.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                if a.important != b.important {
                    assert!(a.important, "important task must come first");
                } else if order == SortOrder::ByName {
                    assert!(a.name <= b.name);
                } else {
                    assert!(a.created <= b.created);
                }
            }
        }
    }
}

mod live_query_tests {
    use super::*;
    use std::time::Duration;

    async fn next_result(live: &mut tasklist::store::LiveQuery) -> Vec<Task> {
        tokio::time::timeout(Duration::from_secs(5), live.next())
            .await
            .expect("live query timed out")
            .expect("store dropped")
            .expect("query failed")
    }

    #[tokio::test]
    async fn live_query_follows_every_mutation() {
        let store = setup_store();
        let mut live = store.query(TaskQuery::new("", SortOrder::ByName, true));
        assert!(next_result(&mut live).await.is_empty());

        let task = store.insert(Task::new("laundry", false)).await.unwrap();
        assert_eq!(names(&next_result(&mut live).await), vec!["laundry"]);

        store.update(&task.with_completed(true)).await.unwrap();
        assert!(next_result(&mut live).await.is_empty());

        store.update(&task.with_completed(false)).await.unwrap();
        assert_eq!(next_result(&mut live).await.len(), 1);

        store.delete(&task).await.unwrap();
        assert!(next_result(&mut live).await.is_empty());
    }

    #[tokio::test]
    async fn live_query_sees_bulk_delete() {
        let store = setup_store();
        store.insert(task_at("done", false, true, 1)).await.unwrap();
        store.insert(task_at("open", false, false, 2)).await.unwrap();

        let mut live = store.query(all(SortOrder::ByName));
        assert_eq!(next_result(&mut live).await.len(), 2);

        store.delete_completed_tasks().await.unwrap();
        assert_eq!(names(&next_result(&mut live).await), vec!["open"]);
    }
}

mod failure_tests {
    use super::*;

    fn break_schema(store: &TaskStore) {
        store
            .database()
            .with_conn(|conn| {
                conn.execute_batch("DROP TABLE tasks")?;
                Ok(())
            })
            .unwrap();
    }

    #[tokio::test]
    async fn storage_failures_propagate() {
        let store = setup_store();
        let task = store.insert(Task::new("a", false)).await.unwrap();
        break_schema(&store);

        assert!(matches!(
            store.insert(Task::new("b", false)).await,
            Err(StoreError::Database(_))
        ));
        assert!(store.update(&task).await.is_err());
        assert!(store.delete(&task).await.is_err());
        assert!(store.delete_completed_tasks().await.is_err());
        assert!(store.fetch(&all(SortOrder::ByName)).await.is_err());
    }

    #[tokio::test]
    async fn failed_mutation_does_not_notify() {
        let store = setup_store();
        break_schema(&store);
        let before = store.revision();
        let _ = store.insert(Task::new("b", false)).await;
        assert_eq!(store.revision(), before);
    }
}

mod shared_file_tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn writes_from_another_handle_wake_live_queries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.db");
        let watcher_side = TaskStore::open(&path).unwrap();
        let writer_side = TaskStore::open(&path).unwrap();

        let mut live = watcher_side.query(all(SortOrder::ByName));
        assert!(live.next().await.unwrap().unwrap().is_empty());

        writer_side
            .insert(Task::new("from another process", false))
            .await
            .unwrap();
        // The writer's change tracker is not shared with this handle
        assert_eq!(watcher_side.revision().seq, 0);

        assert!(watcher_side.sync_external_changes().await.unwrap());
        let tasks = tokio::time::timeout(Duration::from_secs(5), live.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(names(&tasks), vec!["from another process"]);

        // Already seen
        assert!(!watcher_side.sync_external_changes().await.unwrap());
    }

    #[tokio::test]
    async fn store_reports_its_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.db");
        let store = TaskStore::open(&path).unwrap();
        assert_eq!(store.path(), Some(path.as_path()));
        assert!(setup_store().path().is_none());
    }
}
