//! Traffic generation strategies.
//!
//! Both strategies loop a [`Measure`] until the shared [`RunWindow`] has
//! expired. The continuous strategy runs on the calling task; the concurrent
//! strategy fans out to a fixed pool of tokio tasks and fans back in over a
//! bounded channel once every worker has been joined.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::error::{BenchError, Result};
use crate::executor::{Measure, RequestFailure};
use crate::model::{epoch_nanos, Failure, RunOutcome, Sample};

/// Start instant and length of one run, shared read-only by all workers
#[derive(Debug, Clone, Copy)]
pub struct RunWindow {
    started: Instant,
    started_at: i64,
    duration: Duration,
}

impl RunWindow {
    /// Open a window starting now
    pub fn start(duration: Duration) -> Self {
        Self {
            started: Instant::now(),
            started_at: epoch_nanos(),
            duration,
        }
    }

    /// Start time in nanoseconds since the epoch
    pub fn started_at(&self) -> i64 {
        self.started_at
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn is_expired(&self) -> bool {
        self.elapsed() > self.duration
    }
}

/// Issue requests back to back until the window expires
pub async fn run_continuous<M: Measure>(measure: &M, window: RunWindow) -> RunOutcome {
    let mut outcome = RunOutcome::default();
    while !window.is_expired() {
        let result = measure.measure().await;
        if !record(&mut outcome, result) {
            // Failures can resolve without ever suspending
            tokio::task::yield_now().await;
        }
    }
    outcome
}

/// Store one attempt; returns false for a failure
fn record(outcome: &mut RunOutcome, result: std::result::Result<Sample, RequestFailure>) -> bool {
    match result {
        Ok(sample) => {
            outcome.samples.push(sample);
            true
        }
        Err(failure) => {
            debug!(kind = %failure.kind(), error = %failure, "Request failed");
            outcome.record_failure(Failure {
                at: epoch_nanos(),
                kind: failure.kind(),
                message: failure.to_string(),
            });
            false
        }
    }
}

/// Result batch handed from a worker to the collector
#[derive(Debug)]
struct WorkerReport {
    worker_id: usize,
    outcome: RunOutcome,
    finished_after: Duration,
}

/// Run `workers` independent continuous loops over the same window and merge them
pub async fn run_concurrent<M: Measure>(
    measure: Arc<M>,
    window: RunWindow,
    workers: usize,
) -> Result<RunOutcome> {
    let workers = workers.max(1);
    info!(workers = workers, duration = ?window.duration(), "Starting concurrent workers");

    // One report per worker, so sends never wait on the collector
    let (tx, mut rx) = mpsc::channel::<WorkerReport>(workers);
    let mut handles = Vec::with_capacity(workers);

    for worker_id in 0..workers {
        let measure = Arc::clone(&measure);
        let tx = tx.clone();
        handles.push(tokio::spawn(async move {
            let outcome = run_continuous(measure.as_ref(), window).await;
            let report = WorkerReport {
                worker_id,
                outcome,
                finished_after: window.elapsed(),
            };
            if tx.send(report).await.is_err() {
                error!(worker_id = worker_id, "Collector dropped before worker finished");
            }
        }));
    }
    drop(tx);

    // Every worker must be joined before any result is read
    let mut join_error = None;
    for (worker_id, handle) in handles.into_iter().enumerate() {
        if let Err(e) = handle.await {
            error!(worker_id = worker_id, error = %e, "Worker did not complete");
            join_error.get_or_insert(BenchError::Worker(format!(
                "worker {} did not complete: {}",
                worker_id, e
            )));
        }
    }
    if let Some(err) = join_error {
        return Err(err);
    }

    let mut merged = RunOutcome::default();
    while let Some(report) = rx.recv().await {
        debug!(
            worker_id = report.worker_id,
            samples = report.outcome.samples.len(),
            failures = report.outcome.failed_requests(),
            finished_after = ?report.finished_after,
            "Worker finished"
        );
        merged.merge(report.outcome);
    }

    Ok(merged)
}
