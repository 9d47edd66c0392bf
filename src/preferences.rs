//! Persisted filter preferences.
//!
//! Two independent scalar entries live in a small YAML document:
//!
//! ```yaml
//! sort_order: BY_DATE
//! hide_completed: true
//! ```
//!
//! A missing entry means "use the default". Reads never fail: an unreadable
//! or malformed file is logged and treated as empty. Writes replace the file
//! atomically (temp file + rename) and are then published to every reader.

use crate::error::{StoreError, StoreResult};
use crate::types::{FilterPreferences, SortOrder};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, watch};
use tracing::{debug, warn};

/// On-disk shape. `None` means the entry was never written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct StoredPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sort_order: Option<SortOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hide_completed: Option<bool>,
}

impl StoredPreferences {
    fn snapshot(&self) -> FilterPreferences {
        FilterPreferences {
            sort_order: self.sort_order.unwrap_or_default(),
            hide_completed: self.hide_completed.unwrap_or(false),
        }
    }
}

struct Inner {
    path: Option<PathBuf>,
    /// Last persisted document; the lock serialises writers.
    stored: Mutex<StoredPreferences>,
    tx: watch::Sender<FilterPreferences>,
}

/// Durable store for the sort order and hide-completed flag.
#[derive(Clone)]
pub struct PreferenceStore {
    inner: Arc<Inner>,
}

impl PreferenceStore {
    /// Open the preference file at `path`. A missing file yields defaults.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let stored = read_stored(&path).await;
        Self::build(Some(path), stored)
    }

    /// Preferences that live only as long as this handle (for testing).
    pub fn in_memory() -> Self {
        Self::build(None, StoredPreferences::default())
    }

    fn build(path: Option<PathBuf>, stored: StoredPreferences) -> Self {
        let (tx, _rx) = watch::channel(stored.snapshot());
        Self {
            inner: Arc::new(Inner {
                path,
                stored: Mutex::new(stored),
                tx,
            }),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    /// Live stream of preference snapshots. The current value is readable
    /// immediately through `borrow()`.
    pub fn read_preferences(&self) -> watch::Receiver<FilterPreferences> {
        self.inner.tx.subscribe()
    }

    /// Current snapshot.
    pub fn current(&self) -> FilterPreferences {
        *self.inner.tx.borrow()
    }

    pub async fn update_sort_order(&self, sort_order: SortOrder) -> StoreResult<()> {
        self.edit(|prefs| prefs.sort_order = Some(sort_order)).await
    }

    pub async fn update_hide_completed(&self, hide_completed: bool) -> StoreResult<()> {
        self.edit(|prefs| prefs.hide_completed = Some(hide_completed))
            .await
    }

    /// Re-read the file and publish it if it differs from the current
    /// snapshot. Returns whether anything changed.
    pub async fn reload(&self) -> bool {
        let Some(path) = &self.inner.path else {
            return false;
        };
        let mut stored = self.inner.stored.lock().await;
        *stored = read_stored(path).await;
        let changed = self.publish(stored.snapshot());
        if changed {
            debug!(path = %path.display(), "preferences reloaded");
        }
        changed
    }

    async fn edit<F>(&self, f: F) -> StoreResult<()>
    where
        F: FnOnce(&mut StoredPreferences),
    {
        let mut stored = self.inner.stored.lock().await;
        // Start from the file, not our copy: another handle may have written
        // the other entry since we last read it
        let mut next = match &self.inner.path {
            Some(path) => read_stored(path).await,
            None => stored.clone(),
        };
        f(&mut next);

        if let Some(path) = &self.inner.path {
            write_stored(path, &next).await?;
        }

        *stored = next;
        let snapshot = stored.snapshot();
        debug!(?snapshot, "preferences updated");
        self.publish(snapshot);
        Ok(())
    }

    fn publish(&self, snapshot: FilterPreferences) -> bool {
        self.inner.tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        })
    }
}

async fn read_stored(path: &Path) -> StoredPreferences {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return StoredPreferences::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "error reading preferences, using defaults");
            return StoredPreferences::default();
        }
    };

    if text.trim().is_empty() {
        return StoredPreferences::default();
    }

    match serde_yaml::from_str(&text) {
        Ok(stored) => stored,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "malformed preferences, using defaults");
            StoredPreferences::default()
        }
    }
}

async fn write_stored(path: &Path, stored: &StoredPreferences) -> StoreResult<()> {
    let yaml = serde_yaml::to_string(stored)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::io(parent, e))?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let mut file = tokio::fs::File::create(&tmp)
        .await
        .map_err(|e| StoreError::io(&tmp, e))?;
    file.write_all(yaml.as_bytes())
        .await
        .map_err(|e| StoreError::io(&tmp, e))?;
    file.sync_all().await.map_err(|e| StoreError::io(&tmp, e))?;
    drop(file);

    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| StoreError::io(path, e))?;
    Ok(())
}
