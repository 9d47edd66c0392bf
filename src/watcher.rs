//! File watcher for changes made by other processes.
//!
//! Watches the directories holding the task database and the preference
//! file. A change to the database (or its WAL/rollback journal) makes the
//! store compare SQLite's `data_version` and wake its live queries; a change
//! to the preference file triggers a reload. Rapid changes are debounced.

use crate::preferences::PreferenceStore;
use crate::store::TaskStore;
use notify::RecommendedWatcher;
use notify_debouncer_mini::{DebouncedEvent, DebouncedEventKind, Debouncer, new_debouncer};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;
use tokio::sync::mpsc as tokio_mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Default quiet period before a burst of changes is reported.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Which store a file change belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExternalChange {
    Database,
    Preferences,
}

/// Files to watch. `None` for stores that live in memory.
#[derive(Debug, Clone, Default)]
pub struct WatchPaths {
    pub database: Option<PathBuf>,
    pub preferences: Option<PathBuf>,
}

impl WatchPaths {
    pub fn of(store: &TaskStore, preferences: &PreferenceStore) -> Self {
        Self {
            database: store.path().map(Path::to_path_buf),
            preferences: preferences.path().map(Path::to_path_buf),
        }
    }

    /// Directories to register with the watcher.
    fn directories(&self) -> BTreeSet<PathBuf> {
        [&self.database, &self.preferences]
            .into_iter()
            .flatten()
            .map(|file| match file.parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
                _ => PathBuf::from("."),
            })
            .collect()
    }

    fn classify(&self, path: &Path) -> Option<ExternalChange> {
        let name = path.file_name()?.to_str()?;

        if let Some(db_name) = file_name(&self.database) {
            // `-shm` is touched by readers too, so it is not a signal
            let wal = format!("{}-wal", db_name);
            let journal = format!("{}-journal", db_name);
            if name == db_name || name == wal || name == journal {
                return Some(ExternalChange::Database);
            }
        }

        if file_name(&self.preferences) == Some(name) {
            return Some(ExternalChange::Preferences);
        }

        None
    }
}

fn file_name(path: &Option<PathBuf>) -> Option<&str> {
    path.as_deref()?.file_name()?.to_str()
}

/// Running watcher. Dropping it stops watching.
pub struct ExternalWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
    _forward: JoinHandle<()>,
    apply: JoinHandle<()>,
}

impl Drop for ExternalWatcher {
    fn drop(&mut self) {
        self.apply.abort();
    }
}

/// Start watching the files behind `store` and `preferences`.
///
/// Must be called from within a tokio runtime. Missing directories are
/// skipped with a warning.
pub fn start_watcher(
    store: TaskStore,
    preferences: PreferenceStore,
    debounce: Duration,
) -> Result<ExternalWatcher, notify::Error> {
    let paths = WatchPaths::of(&store, &preferences);
    let (notify_tx, notify_rx) = mpsc::channel();
    let mut debouncer = new_debouncer(debounce, notify_tx)?;

    let watcher = debouncer.watcher();
    for dir in paths.directories() {
        if dir.exists() {
            info!("Watching directory: {}", dir.display());
            watcher.watch(&dir, notify::RecursiveMode::NonRecursive)?;
        } else {
            warn!("Directory does not exist, skipping watch: {}", dir.display());
        }
    }

    let (change_tx, change_rx) = tokio_mpsc::unbounded_channel();
    let forward =
        tokio::task::spawn_blocking(move || process_notify_events(notify_rx, change_tx, &paths));
    let apply = tokio::spawn(apply_changes(change_rx, store, preferences));

    Ok(ExternalWatcher {
        _debouncer: debouncer,
        _forward: forward,
        apply,
    })
}

/// Turn debounced notify batches into at most one change per store.
fn process_notify_events(
    rx: mpsc::Receiver<Result<Vec<DebouncedEvent>, notify::Error>>,
    tx: tokio_mpsc::UnboundedSender<ExternalChange>,
    paths: &WatchPaths,
) {
    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                for change in classify_events(events, paths) {
                    debug!(?change, "file change detected");
                    if tx.send(change).is_err() {
                        return;
                    }
                }
            }
            Ok(Err(e)) => error!("File watcher error: {}", e),
            // Debouncer dropped
            Err(_) => return,
        }
    }
}

fn classify_events(events: Vec<DebouncedEvent>, paths: &WatchPaths) -> BTreeSet<ExternalChange> {
    events
        .into_iter()
        .filter(|event| {
            matches!(
                event.kind,
                DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous
            )
        })
        .filter_map(|event| paths.classify(&event.path))
        .collect()
}

async fn apply_changes(
    mut rx: tokio_mpsc::UnboundedReceiver<ExternalChange>,
    store: TaskStore,
    preferences: PreferenceStore,
) {
    while let Some(change) = rx.recv().await {
        match change {
            ExternalChange::Database => {
                if let Err(e) = store.sync_external_changes().await {
                    error!(error = %e, "checking database for outside changes failed");
                }
            }
            ExternalChange::Preferences => {
                preferences.reload().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> WatchPaths {
        WatchPaths {
            database: Some(PathBuf::from("data/tasks.db")),
            preferences: Some(PathBuf::from("config/preferences.yaml")),
        }
    }

    #[test]
    fn database_and_wal_are_database_changes() {
        let paths = paths();
        assert_eq!(
            paths.classify(Path::new("data/tasks.db")),
            Some(ExternalChange::Database)
        );
        assert_eq!(
            paths.classify(Path::new("data/tasks.db-wal")),
            Some(ExternalChange::Database)
        );
        assert_eq!(paths.classify(Path::new("data/tasks.db-shm")), None);
    }

    #[test]
    fn preference_file_but_not_its_temp_file() {
        let paths = paths();
        assert_eq!(
            paths.classify(Path::new("config/preferences.yaml")),
            Some(ExternalChange::Preferences)
        );
        assert_eq!(paths.classify(Path::new("config/preferences.yaml.tmp")), None);
    }

    #[test]
    fn unrelated_files_are_ignored() {
        assert_eq!(paths().classify(Path::new("data/notes.txt")), None);
        assert_eq!(WatchPaths::default().classify(Path::new("tasks.db")), None);
    }

    #[test]
    fn directories_are_deduplicated() {
        let paths = WatchPaths {
            database: Some(PathBuf::from("data/tasks.db")),
            preferences: Some(PathBuf::from("data/preferences.yaml")),
        };
        assert_eq!(
            paths.directories().into_iter().collect::<Vec<_>>(),
            vec![PathBuf::from("data")]
        );

        let bare = WatchPaths {
            database: Some(PathBuf::from("tasks.db")),
            preferences: None,
        };
        assert_eq!(
            bare.directories().into_iter().collect::<Vec<_>>(),
            vec![PathBuf::from(".")]
        );
    }
}
