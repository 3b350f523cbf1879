use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, instrument};

use crate::config::ReportConfig;
use crate::error::{BenchError, Result};
use crate::model::BenchmarkResult;
use crate::stats::DurationStats;

/// Runs the external report and comparison generators
#[derive(Debug, Clone, Default)]
pub struct Reporter {
    command: Option<Vec<String>>,
    compare_command: Option<Vec<String>>,
    working_dir: Option<PathBuf>,
}

impl Reporter {
    pub fn new(config: &ReportConfig) -> Self {
        Self {
            command: config.command.clone(),
            compare_command: config.compare_command.clone(),
            working_dir: config.working_dir.as_ref().map(PathBuf::from),
        }
    }

    /// Reporter that never runs anything
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.command.is_some()
    }

    /// Render the report of one stored test; `false` when no generator is configured
    #[instrument(skip(self, data_dir))]
    pub async fn generate(&self, test_name: &str, data_dir: &Path) -> Result<bool> {
        let Some(command) = &self.command else {
            debug!("No report command configured");
            return Ok(false);
        };
        self.invoke(command, &[test_name], data_dir).await?;
        info!(test = %test_name, "Report generated");
        Ok(true)
    }

    /// Render a comparison of two stored tests; `false` when no generator is configured
    #[instrument(skip(self, data_root))]
    pub async fn compare(&self, first: &str, second: &str, data_root: &Path) -> Result<bool> {
        let Some(command) = &self.compare_command else {
            return Ok(false);
        };
        self.invoke(command, &[first, second], data_root).await?;
        Ok(true)
    }

    async fn invoke(&self, command: &[String], args: &[&str], data_dir: &Path) -> Result<()> {
        let (program, leading) = command
            .split_first()
            .ok_or_else(|| BenchError::Report("Report command is empty".to_string()))?;

        let mut cmd = Command::new(program);
        cmd.args(leading).args(args).env("PERFBENCH_DATA_DIR", data_dir);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let output = cmd
            .output()
            .await
            .map_err(|e| BenchError::Report(format!("Failed to run {}: {}", program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BenchError::Report(format!(
                "{} exited with {}: {}",
                program,
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

/// Baseline and candidate value of one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Delta {
    pub baseline: f64,
    pub candidate: f64,
    pub change: f64,
    /// Relative change; absent when the baseline is zero
    pub change_percent: Option<f64>,
}

impl Delta {
    pub fn new(baseline: f64, candidate: f64) -> Self {
        let change = candidate - baseline;
        Self {
            baseline,
            candidate,
            change,
            change_percent: (baseline != 0.0).then(|| change / baseline * 100.0),
        }
    }
}

/// Deltas of the headline values of one duration series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesComparison {
    pub mean: Delta,
    pub p50: Delta,
    pub p95: Delta,
    pub p99: Delta,
}

impl SeriesComparison {
    fn between(baseline: &DurationStats, candidate: &DurationStats) -> Self {
        Self {
            mean: Delta::new(baseline.mean as f64, candidate.mean as f64),
            p50: Delta::new(baseline.p50 as f64, candidate.p50 as f64),
            p95: Delta::new(baseline.p95 as f64, candidate.p95 as f64),
            p99: Delta::new(baseline.p99 as f64, candidate.p99 as f64),
        }
    }
}

/// Side-by-side comparison of two stored runs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub baseline: String,
    pub candidate: String,
    pub requests_per_second: Delta,
    pub success_rate: Delta,
    pub query_duration: SeriesComparison,
    pub request_duration: SeriesComparison,
}

impl Comparison {
    pub fn between(baseline: &BenchmarkResult, candidate: &BenchmarkResult) -> Self {
        Self {
            baseline: baseline.test_unique_name.clone(),
            candidate: candidate.test_unique_name.clone(),
            requests_per_second: Delta::new(
                baseline.requests_per_second,
                candidate.requests_per_second,
            ),
            success_rate: Delta::new(baseline.success_rate(), candidate.success_rate()),
            query_duration: SeriesComparison::between(
                &baseline.query_duration_stats,
                &candidate.query_duration_stats,
            ),
            request_duration: SeriesComparison::between(
                &baseline.request_duration_stats,
                &candidate.request_duration_stats,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta() {
        let delta = Delta::new(200.0, 150.0);
        assert_eq!(delta.change, -50.0);
        assert_eq!(delta.change_percent, Some(-25.0));

        let from_zero = Delta::new(0.0, 10.0);
        assert_eq!(from_zero.change_percent, None);
    }

    #[tokio::test]
    async fn test_disabled_reporter_does_nothing() {
        let reporter = Reporter::disabled();
        assert!(!reporter.is_enabled());
        assert!(!reporter.generate("t", Path::new(".")).await.unwrap());
        assert!(!reporter.compare("a", "b", Path::new(".")).await.unwrap());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_generate_passes_test_name_and_data_dir() {
        let tmp = tempfile::TempDir::new().unwrap();
        let reporter = Reporter::new(&ReportConfig {
            command: Some(vec![
                "sh".to_string(),
                "-c".to_string(),
                "echo \"$0\" > \"$PERFBENCH_DATA_DIR/report.html\"".to_string(),
            ]),
            compare_command: None,
            working_dir: None,
        });

        assert!(reporter.generate("lookup", tmp.path()).await.unwrap());
        let written = std::fs::read_to_string(tmp.path().join("report.html")).unwrap();
        assert_eq!(written.trim(), "lookup");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_command_is_report_error() {
        let reporter = Reporter::new(&ReportConfig {
            command: Some(vec!["sh".to_string(), "-c".to_string(), "exit 3".to_string()]),
            ..ReportConfig::default()
        });
        let err = reporter.generate("t", Path::new(".")).await.unwrap_err();
        assert!(matches!(err, BenchError::Report(_)));
    }

    #[tokio::test]
    async fn test_missing_program_is_report_error() {
        let reporter = Reporter::new(&ReportConfig {
            command: Some(vec!["perfbench-no-such-program".to_string()]),
            ..ReportConfig::default()
        });
        let err = reporter.generate("t", Path::new(".")).await.unwrap_err();
        assert!(matches!(err, BenchError::Report(_)));
    }
}
