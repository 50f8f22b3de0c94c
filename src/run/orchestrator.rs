//! Check orchestrator - fans classification out over every combination

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{oneshot, watch, Semaphore};
use tokio::task::{self, JoinError, JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

use super::batcher::UpdateBatcher;
use super::context::RunContext;
use super::grid::Grid;
use super::view;
use crate::domain::{StatusClassifier, Submission};
use crate::error::Result;
use crate::resolver::{DnsResolver, DohClient};
use crate::types::{CheckConfig, CheckOutcome, Combination, GridRow, ProgressSnapshot, RunReport};

/// Reason attached when a classification task fails unexpectedly
pub const CHECK_FAILED_REASON: &str = "Error during check";

struct ActiveRun {
    context: Arc<RunContext>,
    driver: JoinHandle<()>,
}

impl ActiveRun {
    fn cancel(self) {
        if !self.driver.is_finished() {
            tracing::info!(run_id = self.context.id(), "Cancelling superseded run");
        }
        self.context.cancel();
        // dropping the driver's JoinSet aborts every in-flight classification
        self.driver.abort();
    }
}

/// Drives one run at a time and owns the grid observers read from
pub struct CheckOrchestrator {
    config: CheckConfig,
    classifier: Arc<StatusClassifier>,
    grid: Arc<RwLock<Grid>>,
    revisions: Arc<watch::Sender<u64>>,
    active: Mutex<Option<ActiveRun>>,
    next_run_id: AtomicU64,
}

impl CheckOrchestrator {
    /// Create an orchestrator backed by the DoH client
    pub fn new(config: CheckConfig) -> Result<Self> {
        let resolver = Arc::new(DohClient::new(&config)?);
        Ok(Self::with_resolver(config, resolver))
    }

    /// Create an orchestrator with a custom resolver
    pub fn with_resolver(config: CheckConfig, resolver: Arc<dyn DnsResolver>) -> Self {
        let classifier = Arc::new(StatusClassifier::new(resolver, &config));
        let (revisions, _) = watch::channel(0);

        Self {
            config,
            classifier,
            grid: Arc::new(RwLock::new(Grid::new())),
            revisions: Arc::new(revisions),
            active: Mutex::new(None),
            next_run_id: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    /// Start a new run, superseding any active one.
    ///
    /// Input problems are reported here, before any lookup is issued. Must be
    /// called from within a Tokio runtime.
    pub fn start<B, T>(&self, base_names: B, tlds: T) -> Result<RunHandle>
    where
        B: IntoIterator,
        B::Item: AsRef<str>,
        T: IntoIterator,
        T::Item: AsRef<str>,
    {
        let submission = Submission::prepare(base_names, tlds, self.config.max_combinations)?;
        if submission.has_rejections() {
            tracing::warn!(
                base_names = ?submission.rejected_base_names,
                tlds = ?submission.rejected_tlds,
                "Skipping invalid input entries"
            );
        }

        // held until the new run is installed so concurrent starts cannot
        // leave a superseded driver running
        let mut active = self.active.lock();
        if let Some(previous) = active.take() {
            previous.cancel();
        }

        let run_id = self.next_run_id.fetch_add(1, Ordering::SeqCst) + 1;
        let combinations = submission.combinations();
        {
            let mut grid = self.grid.write();
            grid.reset(run_id, &submission.base_names, &submission.tlds);
            self.revisions.send_replace(grid.revision());
        }

        let batcher = UpdateBatcher::new(run_id, Arc::clone(&self.grid), Arc::clone(&self.revisions));
        let context = Arc::new(RunContext::new(run_id, combinations.len(), batcher));
        let (report_tx, report_rx) = oneshot::channel();

        tracing::info!(
            run_id,
            combinations = combinations.len(),
            queries = combinations.len() * self.config.queries_per_domain(),
            "Starting domain checks"
        );

        let driver = tokio::spawn(drive(
            Arc::clone(&context),
            Arc::clone(&self.classifier),
            Arc::clone(&self.grid),
            combinations,
            self.config.max_concurrency,
            self.config.flush_interval,
            report_tx,
        ));

        *active = Some(ActiveRun {
            context: Arc::clone(&context),
            driver,
        });

        Ok(RunHandle {
            context,
            submission,
            report: report_rx,
        })
    }

    /// Cancel the active run and empty the grid
    pub fn clear(&self) {
        let mut active = self.active.lock();
        if let Some(run) = active.take() {
            run.cancel();
        }
        let mut grid = self.grid.write();
        grid.clear();
        self.revisions.send_replace(grid.revision());
    }

    fn cancel_active(&self) {
        if let Some(run) = self.active.lock().take() {
            run.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.active
            .lock()
            .as_ref()
            .is_some_and(|run| run.context.progress().running)
    }

    pub fn progress(&self) -> Option<ProgressSnapshot> {
        self.active.lock().as_ref().map(|run| run.context.progress())
    }

    /// Current rows; unchanged rows keep their `Arc` across flushes
    pub fn snapshot(&self) -> Vec<Arc<GridRow>> {
        self.grid.read().snapshot()
    }

    /// Receive the grid revision every time a flush mutates the grid
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revisions.subscribe()
    }

    /// Running or final summary line
    pub fn summary(&self) -> String {
        let rows = self.snapshot();
        view::summarize(&rows, self.progress().as_ref())
    }
}

impl Drop for CheckOrchestrator {
    fn drop(&mut self) {
        self.cancel_active();
    }
}

/// Caller's view of one run
pub struct RunHandle {
    context: Arc<RunContext>,
    submission: Submission,
    report: oneshot::Receiver<RunReport>,
}

impl RunHandle {
    pub fn run_id(&self) -> u64 {
        self.context.id()
    }

    pub fn total_checks(&self) -> usize {
        self.context.total_checks()
    }

    /// What was accepted and what was skipped
    pub fn submission(&self) -> &Submission {
        &self.submission
    }

    pub fn progress(&self) -> ProgressSnapshot {
        self.context.progress()
    }

    /// Wait for terminal completion; `None` if the run was cancelled
    pub async fn wait(self) -> Option<RunReport> {
        self.report.await.ok()
    }
}

async fn drive(
    context: Arc<RunContext>,
    classifier: Arc<StatusClassifier>,
    grid: Arc<RwLock<Grid>>,
    combinations: Vec<Combination>,
    max_concurrency: usize,
    flush_interval: Duration,
    report: oneshot::Sender<RunReport>,
) {
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut tasks = JoinSet::new();
    let mut in_flight = HashMap::with_capacity(combinations.len());

    for combination in combinations {
        let classifier = Arc::clone(&classifier);
        let semaphore = Arc::clone(&semaphore);
        let domain = combination.full_domain();
        let handle = tasks.spawn(async move { check_one(&classifier, &semaphore, &domain).await });
        in_flight.insert(handle.id(), combination);
    }

    let mut ticker = tokio::time::interval(flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            joined = tasks.join_next_with_id() => match joined {
                Some(joined) => {
                    if settle_joined(&context, &mut in_flight, joined) {
                        break;
                    }
                }
                None => break,
            },
            _ = ticker.tick() => {
                context.batcher().flush();
            }
        }
    }

    if context.is_cancelled() {
        return;
    }

    let elapsed = context.mark_finished();
    context.batcher().flush();
    let counts = grid.read().counts();

    tracing::info!(
        run_id = context.id(),
        available = counts.available,
        taken = counts.taken,
        invalid = counts.invalid,
        elapsed_ms = %elapsed.as_millis(),
        "Domain checks finished"
    );

    let _ = report.send(RunReport {
        run_id: context.id(),
        total_checks: context.total_checks(),
        counts,
        started_at: context.started_at(),
        elapsed,
    });
}

/// Settle one joined task. A task that failed to join still moves its cell
/// out of `Checking`. Returns true on the transition to complete.
fn settle_joined(
    context: &RunContext,
    in_flight: &mut HashMap<task::Id, Combination>,
    joined: std::result::Result<(task::Id, CheckOutcome), JoinError>,
) -> bool {
    let (id, outcome) = match joined {
        Ok(done) => done,
        Err(e) => {
            tracing::warn!(run_id = context.id(), error = %e, "Classification task did not finish");
            (e.id(), CheckOutcome::invalid(CHECK_FAILED_REASON))
        }
    };

    match in_flight.remove(&id) {
        Some(combination) => context.settle(&combination, outcome),
        None => context.record_completion(),
    }
}

/// Classify one domain under the concurrency limit; never panics outward
async fn check_one(classifier: &StatusClassifier, semaphore: &Semaphore, domain: &str) -> CheckOutcome {
    let Ok(_permit) = semaphore.acquire().await else {
        return CheckOutcome::invalid(CHECK_FAILED_REASON);
    };

    match AssertUnwindSafe(classifier.classify(domain)).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(_) => {
            tracing::warn!(domain = %domain, "Classification panicked");
            CheckOutcome::invalid(CHECK_FAILED_REASON)
        }
    }
}
