//! Buffer-then-flush delivery of per-cell updates

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;

use super::grid::Grid;
use crate::types::PendingUpdate;

/// Coalesces completions into bulk grid mutations.
///
/// One batcher belongs to one run. Once closed it drops every enqueue and
/// never touches the grid again.
pub struct UpdateBatcher {
    run_id: u64,
    pending: Mutex<Vec<PendingUpdate>>,
    grid: Arc<RwLock<Grid>>,
    revisions: Arc<watch::Sender<u64>>,
    closed: AtomicBool,
}

impl UpdateBatcher {
    pub fn new(run_id: u64, grid: Arc<RwLock<Grid>>, revisions: Arc<watch::Sender<u64>>) -> Self {
        Self {
            run_id,
            pending: Mutex::new(Vec::new()),
            grid,
            revisions,
            closed: AtomicBool::new(false),
        }
    }

    /// Buffer an update; returns false when the batcher is closed
    pub fn enqueue(&self, update: PendingUpdate) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        self.pending.lock().push(update);
        true
    }

    /// Drain the buffer into the grid; returns the number of rows replaced.
    ///
    /// The grid write lock is held across the drain so flushes never overlap.
    pub fn flush(&self) -> usize {
        let mut grid = self.grid.write();
        let drained = std::mem::take(&mut *self.pending.lock());

        if drained.is_empty() || self.closed.load(Ordering::Acquire) || grid.run_id() != self.run_id {
            return 0;
        }

        let count = drained.len();
        let changed = grid.apply(drained);
        if changed > 0 {
            self.revisions.send_replace(grid.revision());
        }
        tracing::trace!(run_id = self.run_id, updates = count, rows = changed, "Flushed updates");
        changed
    }

    /// Stop accepting updates and discard anything buffered
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.pending.lock().clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }
}
