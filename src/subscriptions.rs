//! Row-level change notification for the task table.
//!
//! Every successful mutation that touched at least one row bumps a revision
//! counter published on a tokio `watch` channel. Live queries hold a
//! receiver and re-run whenever the revision moves. A slow subscriber only
//! ever sees the newest revision; intermediate ones are coalesced.

use tokio::sync::watch;
use tracing::trace;

/// Categories of mutations that affect the task table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// A task was inserted (including undo re-inserts).
    TaskInserted,
    /// A task row was replaced by an update.
    TaskUpdated,
    /// A single task was deleted.
    TaskDeleted,
    /// All completed tasks were deleted in bulk.
    CompletedCleared,
    /// Another connection committed to the same database file.
    External,
}

/// Monotonic change counter plus the kind of the latest mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Revision {
    pub seq: u64,
    pub last: Option<MutationKind>,
}

/// Publishes table revisions to any number of live queries.
pub struct ChangeTracker {
    tx: watch::Sender<Revision>,
}

impl ChangeTracker {
    /// Create a tracker at revision 0.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Revision::default());
        Self { tx }
    }

    /// Record a mutation and wake every subscriber. Returns the new revision.
    pub fn record(&self, kind: MutationKind) -> Revision {
        self.tx.send_modify(|rev| {
            rev.seq += 1;
            rev.last = Some(kind);
        });
        let rev = *self.tx.borrow();
        trace!(seq = rev.seq, ?kind, "task table changed");
        rev
    }

    /// Subscribe to future revisions. The current revision counts as seen.
    pub fn subscribe(&self) -> watch::Receiver<Revision> {
        self.tx.subscribe()
    }

    /// The latest revision.
    pub fn current(&self) -> Revision {
        *self.tx.borrow()
    }
}

impl Default for ChangeTracker {
    fn default() -> Self {
        Self::new()
    }
}
