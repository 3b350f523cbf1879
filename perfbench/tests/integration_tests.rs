//! Integration tests for perfbench
//!
//! These tests drive real HTTP traffic against an in-process mock origin:
//! - Continuous runs and server-reported duration extraction
//! - Failure recording for malformed bodies and refused connections
//! - Concurrent worker scaling
//! - Persisting results to the result store

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

use perfbench::model::FailureKind;
use perfbench::report::Reporter;
use perfbench::store::{DATA_FILE, FAILURES_FILE, RESULT_FILE};
use perfbench::{
    run_concurrent, run_continuous, BenchError, Orchestrator, RequestExecutor, ResultStore,
    RpsBasis, RunWindow, TestSpec,
};

/// Start a mock origin on a free port
async fn start_origin(body: &str, delay: Duration) -> SocketAddr {
    let origin = perfbench::origin::MockOrigin::bind("127.0.0.1:0".parse().unwrap(), body, delay)
        .await
        .unwrap();
    let addr = origin.local_addr().unwrap();
    tokio::spawn(origin.run());
    addr
}

/// Helper function to get a port nothing listens on
async fn get_closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

fn orchestrator(tmp: &TempDir) -> Orchestrator {
    Orchestrator::new(
        ResultStore::new(tmp.path().join("data")),
        Reporter::disabled(),
        RpsBasis::Configured,
    )
}

#[cfg(test)]
mod continuous_tests {
    use super::*;

    #[tokio::test]
    async fn test_continuous_run_against_origin() {
        let addr = start_origin(r#"{"QueryDuration": 42}"#, Duration::from_millis(10)).await;
        let tmp = TempDir::new().unwrap();
        let mut spec = TestSpec::new("continuous_origin", &format!("http://{}/query", addr), 1);
        spec.test_mode = "continuous".to_string();

        let run = orchestrator(&tmp).run(&spec).await.unwrap();
        let result = &run.result;

        // 10ms per request over a 1s window, one request may overrun the window
        assert!(result.successful_requests >= 50, "too few requests: {}", result.successful_requests);
        assert!(result.successful_requests <= 101, "too many requests: {}", result.successful_requests);
        assert_eq!(result.failed_requests, 0);
        assert_eq!(result.total_requests, run.samples.len() as u64);
        assert_eq!(result.requests_per_second, result.total_requests as f64);
        assert_eq!(result.concurrent_requests, 1);

        assert!(run.samples.iter().all(|s| s.query_duration == 42));
        assert_eq!(result.query_duration_stats.min, 42);
        assert_eq!(result.query_duration_stats.p99, 42);
        assert_eq!(result.query_duration_stats.stddev, 0);

        for sample in &run.samples {
            assert!(sample.request_duration >= 10_000_000);
            assert!(
                sample.request_duration < 50_000_000,
                "slow request: {}ns",
                sample.request_duration
            );
            assert!(sample.end_timestamp >= sample.start_timestamp);
        }
        assert!(result.request_duration_stats.p50 < 30_000_000);
        // Sequential requests never overlap
        for pair in run.samples.windows(2) {
            assert!(pair[1].start_timestamp >= pair[0].end_timestamp);
        }
    }

    #[tokio::test]
    async fn test_continious_spelling_runs_continuously() {
        let addr = start_origin(r#"{"QueryDuration": 7}"#, Duration::ZERO).await;
        let tmp = TempDir::new().unwrap();
        let mut spec = TestSpec::new("typo_mode", &format!("http://{}/", addr), 1);
        spec.test_mode = "continious".to_string();

        let run = orchestrator(&tmp).run(&spec).await.unwrap();
        assert_eq!(run.result.test_mode, "continuous");
        assert!(run.result.successful_requests > 0);
    }
}

#[cfg(test)]
mod failure_tests {
    use super::*;

    #[tokio::test]
    async fn test_non_numeric_duration_is_recorded() {
        let addr = start_origin(r#"{"QueryDuration": "not-a-number"}"#, Duration::ZERO).await;
        let spec = TestSpec::new("bad_body", &format!("http://{}/", addr), 1);
        let executor = RequestExecutor::new(&spec).unwrap();

        let outcome = run_continuous(&executor, RunWindow::start(Duration::from_millis(300))).await;
        assert!(outcome.samples.is_empty());
        assert!(!outcome.failures.is_empty());
        assert!(outcome
            .failures
            .iter()
            .all(|f| f.kind == FailureKind::FieldExtraction));
    }

    #[tokio::test]
    async fn test_run_without_successes_is_an_error() {
        let addr = start_origin(r#"{"QueryDuration": "not-a-number"}"#, Duration::ZERO).await;
        let tmp = TempDir::new().unwrap();
        let spec = TestSpec::new("bad_body", &format!("http://{}/", addr), 1);

        let err = orchestrator(&tmp).run(&spec).await.unwrap_err();
        assert!(matches!(err, BenchError::EmptyResultSet { .. }));
    }

    #[tokio::test]
    async fn test_refused_connection_is_network_failure() {
        let port = get_closed_port().await;
        let spec = TestSpec::new("refused", &format!("http://127.0.0.1:{}/", port), 1);
        let executor = RequestExecutor::new(&spec).unwrap();

        let outcome = run_continuous(&executor, RunWindow::start(Duration::from_millis(200))).await;
        assert!(outcome.samples.is_empty());
        assert!(!outcome.failures.is_empty());
        assert!(outcome.failures.iter().all(|f| f.kind == FailureKind::Network));
    }
}

#[cfg(test)]
mod concurrency_tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_more_workers_more_requests() {
        let addr = start_origin(r#"{"QueryDuration": 1}"#, Duration::from_millis(20)).await;
        let spec = TestSpec::new("scaling", &format!("http://{}/", addr), 1);
        let executor = Arc::new(RequestExecutor::new(&spec).unwrap());

        let single = run_concurrent(
            Arc::clone(&executor),
            RunWindow::start(Duration::from_millis(600)),
            1,
        )
        .await
        .unwrap();
        let pooled = run_concurrent(executor, RunWindow::start(Duration::from_millis(600)), 4)
            .await
            .unwrap();

        assert!(single.failures.is_empty());
        assert!(pooled.failures.is_empty());
        assert!(
            pooled.samples.len() > 2 * single.samples.len(),
            "4 workers: {}, 1 worker: {}",
            pooled.samples.len(),
            single.samples.len()
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mode_reports_worker_count() {
        let addr = start_origin(r#"{"QueryDuration": 5}"#, Duration::from_millis(5)).await;
        let tmp = TempDir::new().unwrap();
        let mut spec = TestSpec::new("pooled", &format!("http://{}/", addr), 1);
        spec.test_mode = "concurrent".to_string();
        spec.concurrent_requests = 3;

        let run = orchestrator(&tmp).run(&spec).await.unwrap();
        assert_eq!(run.result.test_mode, "concurrent");
        assert_eq!(run.result.concurrent_requests, 3);
        assert!(run.result.successful_requests > 0);
    }
}

#[cfg(test)]
mod storage_tests {
    use super::*;

    #[tokio::test]
    async fn test_run_and_store_writes_artifacts() {
        let addr = start_origin(r#"{"QueryDuration": 42}"#, Duration::from_millis(5)).await;
        let tmp = TempDir::new().unwrap();
        let orchestrator = orchestrator(&tmp);
        let spec = TestSpec::new("stored", &format!("http://{}/", addr), 1);

        let result = orchestrator.run_and_store(&spec).await.unwrap();
        let dir = tmp.path().join("data").join("stored");
        assert!(dir.join(RESULT_FILE).is_file());
        assert!(dir.join(DATA_FILE).is_file());
        assert!(dir.join(FAILURES_FILE).is_file());

        let csv = std::fs::read_to_string(dir.join(DATA_FILE)).unwrap();
        assert_eq!(csv.lines().count() as u64, result.successful_requests);
        assert!(csv.lines().all(|line| line.split(',').count() == 4));

        let loaded = orchestrator.store().load("stored").unwrap().unwrap();
        assert_eq!(loaded, result);
        assert_eq!(orchestrator.store().list().unwrap()[0].name, "stored");
    }
}
