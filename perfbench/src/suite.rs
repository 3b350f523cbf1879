//! Test suite definitions loaded from YAML.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{BenchError, Result};
use crate::executor::parse_method;

/// Worker count used when a concurrent test does not set one
pub const DEFAULT_CONCURRENCY: u32 = 10;

/// Response field holding the server-reported duration
pub const DEFAULT_DURATION_FIELD: &str = "QueryDuration";

/// Per-request timeout used when a test does not set one
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// One benchmark definition as written in the tests file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestSpec {
    /// Identifier, also the storage directory name
    pub test_unique_name: String,
    #[serde(default)]
    pub test_display_name: String,
    #[serde(default)]
    pub test_description: String,
    #[serde(rename = "RequestURL")]
    pub request_url: String,
    /// HTTP method
    #[serde(default = "default_request_type")]
    pub request_type: String,
    /// `continuous` or `concurrent`; anything else runs continuously
    #[serde(default)]
    pub test_mode: String,
    #[serde(default)]
    pub concurrent_requests: u32,
    /// Accepted for compatibility, not used by the runners
    #[serde(default)]
    pub sleep_between_requests: f64,
    /// Test window in seconds
    pub test_duration: u64,
    #[serde(default = "default_duration_field")]
    pub duration_field: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_request_type() -> String {
    "GET".to_string()
}

fn default_duration_field() -> String {
    DEFAULT_DURATION_FIELD.to_string()
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

/// Traffic generation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Back-to-back requests from a single task
    Continuous,
    /// Fixed pool of independent workers
    Concurrent { workers: usize },
}

impl ExecutionMode {
    pub fn name(&self) -> &'static str {
        match self {
            ExecutionMode::Continuous => "continuous",
            ExecutionMode::Concurrent { .. } => "concurrent",
        }
    }
}

impl TestSpec {
    /// Minimal spec with defaults for every optional field
    pub fn new(unique_name: &str, request_url: &str, test_duration: u64) -> Self {
        Self {
            test_unique_name: unique_name.to_string(),
            test_display_name: unique_name.to_string(),
            test_description: String::new(),
            request_url: request_url.to_string(),
            request_type: default_request_type(),
            test_mode: String::new(),
            concurrent_requests: 0,
            sleep_between_requests: 0.0,
            test_duration,
            duration_field: default_duration_field(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }

    /// Resolve the configured mode, falling back to continuous
    pub fn execution_mode(&self) -> ExecutionMode {
        match self.test_mode.trim().to_ascii_lowercase().as_str() {
            "concurrent" => ExecutionMode::Concurrent {
                workers: self.worker_count(),
            },
            _ => ExecutionMode::Continuous,
        }
    }

    /// True when the mode string is one of the known spellings
    pub fn has_known_mode(&self) -> bool {
        matches!(
            self.test_mode.trim().to_ascii_lowercase().as_str(),
            "continuous" | "continious" | "concurrent"
        )
    }

    pub fn worker_count(&self) -> usize {
        if self.concurrent_requests == 0 {
            DEFAULT_CONCURRENCY as usize
        } else {
            self.concurrent_requests as usize
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.test_duration)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Validate the definition before running it
    pub fn validate(&self) -> Result<()> {
        if !is_valid_test_name(&self.test_unique_name) {
            return Err(BenchError::Config(format!(
                "Invalid test unique name: {:?}",
                self.test_unique_name
            )));
        }

        if self.request_url.trim().is_empty() {
            return Err(BenchError::Config(format!(
                "Test {} has no request URL",
                self.test_unique_name
            )));
        }

        let url = reqwest::Url::parse(&self.request_url).map_err(|e| {
            BenchError::Config(format!(
                "Test {} has an invalid request URL {:?}: {}",
                self.test_unique_name, self.request_url, e
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(BenchError::Config(format!(
                "Test {} must use an http or https URL, got {}",
                self.test_unique_name,
                url.scheme()
            )));
        }

        parse_method(&self.request_type).map_err(|e| {
            BenchError::Config(format!("Test {}: {}", self.test_unique_name, e))
        })?;

        if self.test_duration == 0 {
            return Err(BenchError::Config(format!(
                "Test {} must run for at least one second",
                self.test_unique_name
            )));
        }

        if self.request_timeout_ms == 0 {
            return Err(BenchError::Config(format!(
                "Test {} has a zero request timeout",
                self.test_unique_name
            )));
        }

        if self.duration_field.is_empty() {
            return Err(BenchError::Config(format!(
                "Test {} has an empty duration field",
                self.test_unique_name
            )));
        }

        Ok(())
    }
}

/// A test name must be usable as a single directory component
pub fn is_valid_test_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.contains("..")
}

/// Parse a YAML sequence of test definitions
pub fn parse_tests(yaml: &str) -> Result<Vec<TestSpec>> {
    let tests: Vec<TestSpec> = serde_yaml::from_str(yaml)?;
    Ok(tests)
}

/// Load test definitions from a YAML file
pub fn load_tests(path: impl AsRef<Path>) -> Result<Vec<TestSpec>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        BenchError::Config(format!("Failed to read tests file {}: {}", path.display(), e))
    })?;
    let tests = parse_tests(&content)?;
    info!(path = %path.display(), count = tests.len(), "Loaded test definitions");
    Ok(tests)
}
