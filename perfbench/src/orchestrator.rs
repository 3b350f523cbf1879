use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use crate::error::Result;
use crate::executor::RequestExecutor;
use crate::model::{BenchmarkResult, Failure, RpsBasis, RunOutcome, Sample};
use crate::report::Reporter;
use crate::runner::{run_concurrent, run_continuous, RunWindow};
use crate::stats::{DurationSeries, DurationStats};
use crate::store::ResultStore;
use crate::suite::{ExecutionMode, TestSpec};

/// Summary plus raw data of one completed run
#[derive(Debug, Clone)]
pub struct BenchmarkRun {
    pub result: BenchmarkResult,
    pub samples: Vec<Sample>,
    /// Retained failure records; the result carries the full count
    pub failures: Vec<Failure>,
}

/// Outcome of one test within a suite
#[derive(Debug)]
pub struct SuiteEntry {
    pub test_unique_name: String,
    pub result: Result<BenchmarkResult>,
}

/// Picks a runner per test, aggregates, and hands results to storage and reporting
#[derive(Debug, Clone)]
pub struct Orchestrator {
    store: ResultStore,
    reporter: Reporter,
    rps_basis: RpsBasis,
}

impl Orchestrator {
    pub fn new(store: ResultStore, reporter: Reporter, rps_basis: RpsBasis) -> Self {
        Self {
            store,
            reporter,
            rps_basis,
        }
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Run one test and build its result without persisting anything
    #[instrument(skip(self, spec), fields(test = %spec.test_unique_name))]
    pub async fn run(&self, spec: &TestSpec) -> Result<BenchmarkRun> {
        spec.validate()?;

        let mode = spec.execution_mode();
        if !spec.has_known_mode() {
            warn!(mode = %spec.test_mode, "Test mode not recognised, defaulting to continuous");
        }

        let executor = RequestExecutor::new(spec)?;
        info!(
            mode = mode.name(),
            url = %spec.request_url,
            method = %spec.request_type,
            duration_secs = spec.test_duration,
            "Starting benchmark"
        );

        let window = RunWindow::start(spec.duration());
        let outcome = match mode {
            ExecutionMode::Continuous => run_continuous(&executor, window).await,
            ExecutionMode::Concurrent { workers } => {
                run_concurrent(Arc::new(executor), window, workers).await?
            }
        };
        let measured = window.elapsed();

        info!(
            total_requests = outcome.total_requests(),
            failed_requests = outcome.failed_requests(),
            elapsed = ?measured,
            "Benchmark finished"
        );

        let data_folder = self.store.test_dir(&spec.test_unique_name)?;
        let result = assemble_result(
            spec,
            mode,
            &outcome,
            window.started_at(),
            measured,
            self.rps_basis,
            &data_folder,
        )?;

        Ok(BenchmarkRun {
            result,
            samples: outcome.samples,
            failures: outcome.failures,
        })
    }

    /// Run, persist and report one test
    pub async fn run_and_store(&self, spec: &TestSpec) -> Result<BenchmarkResult> {
        let run = self.run(spec).await?;
        let dir = self.store.save(&run.result, &run.samples, &run.failures)?;

        if let Err(e) = self.reporter.generate(&spec.test_unique_name, &dir).await {
            warn!(test = %spec.test_unique_name, error = %e, "Report generation failed");
        }
        Ok(run.result)
    }

    /// Run every test in order; a failing test is logged and the suite continues
    pub async fn run_suite(&self, tests: &[TestSpec]) -> Vec<SuiteEntry> {
        let mut entries = Vec::with_capacity(tests.len());
        for spec in tests {
            let result = self.run_and_store(spec).await;
            match &result {
                Ok(result) => info!(
                    test = %result.test_unique_name,
                    successful = result.successful_requests,
                    failed = result.failed_requests,
                    rps = result.requests_per_second,
                    "Test complete"
                ),
                Err(e) => error!(test = %spec.test_unique_name, error = %e, "Test failed"),
            }
            entries.push(SuiteEntry {
                test_unique_name: spec.test_unique_name.clone(),
                result,
            });
        }
        entries
    }
}

/// Build the final artifact from a finished run
pub fn assemble_result(
    spec: &TestSpec,
    mode: ExecutionMode,
    outcome: &RunOutcome,
    started_at: i64,
    measured: Duration,
    rps_basis: RpsBasis,
    data_folder: &Path,
) -> Result<BenchmarkResult> {
    let query_duration_stats = DurationStats::from_samples(&outcome.samples, DurationSeries::Query)?;
    let request_duration_stats =
        DurationStats::from_samples(&outcome.samples, DurationSeries::Request)?;

    let total_requests = outcome.total_requests();
    let denominator = match rps_basis {
        RpsBasis::Configured => spec.test_duration as f64,
        RpsBasis::Measured => measured.as_secs_f64(),
    };
    let requests_per_second = if denominator > 0.0 {
        total_requests as f64 / denominator
    } else {
        0.0
    };

    let concurrent_requests = match mode {
        ExecutionMode::Continuous => 1,
        ExecutionMode::Concurrent { workers } => workers as u32,
    };

    Ok(BenchmarkResult {
        test_start_time: started_at,
        test_unique_name: spec.test_unique_name.clone(),
        test_display_name: spec.test_display_name.clone(),
        test_description: spec.test_description.clone(),
        data_folder: data_folder.display().to_string(),
        test_mode: mode.name().to_string(),
        request_url: spec.request_url.clone(),
        request_type: spec.request_type.clone(),
        concurrent_requests,
        sleep_between_requests: spec.sleep_between_requests,
        test_duration: spec.test_duration,
        measured_duration_ns: i64::try_from(measured.as_nanos()).unwrap_or(i64::MAX),
        total_requests,
        successful_requests: outcome.samples.len() as u64,
        failed_requests: outcome.failed_requests(),
        requests_per_second,
        rps_basis,
        failure_breakdown: outcome.failure_breakdown(),
        query_duration_stats,
        request_duration_stats,
    })
}
