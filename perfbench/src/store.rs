//! On-disk storage of benchmark results.
//!
//! Each test owns `<root>/<unique name>/` holding `benchmark.json`, a
//! headerless `data.csv` (start, end, query duration, request duration per
//! row), `failures.csv`, and optionally a `report.html` written by the
//! external reporting tool.

use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{BenchError, Result};
use crate::model::{BenchmarkResult, Failure, Sample};
use crate::suite::is_valid_test_name;

pub const RESULT_FILE: &str = "benchmark.json";
pub const DATA_FILE: &str = "data.csv";
pub const FAILURES_FILE: &str = "failures.csv";
pub const REPORT_FILE: &str = "report.html";

/// Stored run as listed by the results API
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredRun {
    pub name: String,
    pub has_report: bool,
}

/// Directory-backed result store
#[derive(Debug, Clone)]
pub struct ResultStore {
    root: PathBuf,
}

impl ResultStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of one test; rejects names that would escape the root
    pub fn test_dir(&self, name: &str) -> Result<PathBuf> {
        if !is_valid_test_name(name) {
            return Err(BenchError::Storage(format!("Invalid test name: {:?}", name)));
        }
        Ok(self.root.join(name))
    }

    pub fn report_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.test_dir(name)?.join(REPORT_FILE))
    }

    /// Persist the summary, raw samples and failures of one run
    pub fn save(
        &self,
        result: &BenchmarkResult,
        samples: &[Sample],
        failures: &[Failure],
    ) -> Result<PathBuf> {
        let dir = self.test_dir(&result.test_unique_name)?;
        fs::create_dir_all(&dir)?;

        self.save_result(result)?;
        self.save_samples(&result.test_unique_name, samples)?;
        self.save_failures(&result.test_unique_name, failures)?;

        info!(
            test = %result.test_unique_name,
            dir = %dir.display(),
            samples = samples.len(),
            failures = failures.len(),
            "Saved benchmark data"
        );
        Ok(dir)
    }

    pub fn save_result(&self, result: &BenchmarkResult) -> Result<()> {
        let path = self.test_dir(&result.test_unique_name)?.join(RESULT_FILE);
        let json = serde_json::to_string_pretty(result)?;
        fs::write(&path, json)?;
        debug!(path = %path.display(), "Wrote benchmark summary");
        Ok(())
    }

    pub fn save_samples(&self, name: &str, samples: &[Sample]) -> Result<()> {
        if samples.is_empty() {
            return Err(BenchError::Storage(format!("No raw data to save for {}", name)));
        }

        let path = self.test_dir(name)?.join(DATA_FILE);
        let mut writer = BufWriter::new(File::create(&path)?);
        for sample in samples {
            writeln!(
                writer,
                "{},{},{},{}",
                sample.start_timestamp,
                sample.end_timestamp,
                sample.query_duration,
                sample.request_duration
            )?;
        }
        writer.flush()?;
        debug!(path = %path.display(), rows = samples.len(), "Wrote raw samples");
        Ok(())
    }

    pub fn save_failures(&self, name: &str, failures: &[Failure]) -> Result<()> {
        let path = self.test_dir(name)?.join(FAILURES_FILE);
        let mut writer = BufWriter::new(File::create(&path)?);
        for failure in failures {
            writeln!(
                writer,
                "{},{},{}",
                failure.at,
                failure.kind,
                csv_field(&failure.message)
            )?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Read a stored summary; `None` when the test has never been stored
    pub fn load(&self, name: &str) -> Result<Option<BenchmarkResult>> {
        let path = self.test_dir(name)?.join(RESULT_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let result = serde_json::from_str(&content)?;
        Ok(Some(result))
    }

    /// Raw sample CSV of a stored test
    pub fn load_samples_csv(&self, name: &str) -> Result<Option<String>> {
        let path = self.test_dir(name)?.join(DATA_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    /// Stored runs sorted by name; a missing root lists nothing
    pub fn list(&self) -> Result<Vec<StoredRun>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut runs = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if !path.join(RESULT_FILE).is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            runs.push(StoredRun {
                has_report: path.join(REPORT_FILE).is_file(),
                name,
            });
        }
        runs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(runs)
    }
}

/// Quote a CSV field when it holds a delimiter, quote or line break
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
