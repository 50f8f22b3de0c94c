//! Run-scoped state: counters, cancellation and the run's batcher

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::batcher::UpdateBatcher;
use crate::types::{CheckOutcome, Combination, PendingUpdate, ProgressSnapshot};

/// Everything one submission owns. Created at start, dropped after
/// completion or cancellation; never shared between runs.
pub struct RunContext {
    id: u64,
    total_checks: usize,
    completed_checks: AtomicUsize,
    cancelled: AtomicBool,
    started: Instant,
    started_at: DateTime<Utc>,
    finished_after: Mutex<Option<Duration>>,
    batcher: UpdateBatcher,
}

impl RunContext {
    pub fn new(id: u64, total_checks: usize, batcher: UpdateBatcher) -> Self {
        Self {
            id,
            total_checks,
            completed_checks: AtomicUsize::new(0),
            cancelled: AtomicBool::new(false),
            started: Instant::now(),
            started_at: Utc::now(),
            finished_after: Mutex::new(None),
            batcher,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn total_checks(&self) -> usize {
        self.total_checks
    }

    pub fn completed_checks(&self) -> usize {
        self.completed_checks.load(Ordering::Acquire)
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn batcher(&self) -> &UpdateBatcher {
        &self.batcher
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn is_complete(&self) -> bool {
        self.completed_checks() >= self.total_checks
    }

    /// Record one finished combination. Returns true on the transition to complete.
    ///
    /// After cancellation the outcome is discarded and nothing is counted.
    pub fn settle(&self, combination: &Combination, outcome: CheckOutcome) -> bool {
        if self.is_cancelled() {
            return false;
        }
        self.batcher.enqueue(PendingUpdate::from_outcome(combination, outcome));
        self.record_completion()
    }

    /// Count a completion that has no cell update attached
    pub fn record_completion(&self) -> bool {
        let total = self.total_checks;
        let previous = self
            .completed_checks
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < total).then_some(n + 1));
        matches!(previous, Ok(n) if n + 1 == total)
    }

    /// Freeze the elapsed time at terminal completion
    pub fn mark_finished(&self) -> Duration {
        *self
            .finished_after
            .lock()
            .get_or_insert_with(|| self.started.elapsed())
    }

    /// Stop the run: later results are dropped and buffered ones discarded
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.batcher.close();
    }

    pub fn elapsed(&self) -> Duration {
        let finished = *self.finished_after.lock();
        finished.unwrap_or_else(|| self.started.elapsed())
    }

    pub fn progress(&self) -> ProgressSnapshot {
        let finished = self.finished_after.lock().is_some();
        ProgressSnapshot {
            run_id: self.id,
            total_checks: self.total_checks,
            completed_checks: self.completed_checks(),
            running: !finished && !self.is_cancelled(),
            elapsed: self.elapsed(),
        }
    }
}
