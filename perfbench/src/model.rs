use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::stats::DurationStats;

/// Current wall-clock time as nanoseconds since the Unix epoch
pub fn epoch_nanos() -> i64 {
    // Saturates past the year 2262
    Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

/// Timing data of one successful request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Dispatch time (ns since epoch)
    pub start_timestamp: i64,
    /// Completion time (ns since epoch)
    pub end_timestamp: i64,
    /// Duration reported by the server in the response body (ns)
    pub query_duration: i64,
    /// Round trip observed by the client (ns)
    pub request_duration: i64,
}

/// Classification of a failed request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The request could not be built (bad method or URL)
    Construction,
    /// Connection, timeout, or body transfer failure
    Network,
    /// Body is not a JSON object
    Decode,
    /// Duration field missing or not a number
    FieldExtraction,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Construction => "construction",
            FailureKind::Network => "network",
            FailureKind::Decode => "decode",
            FailureKind::FieldExtraction => "field_extraction",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed request attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Time the failure was observed (ns since epoch)
    pub at: i64,
    pub kind: FailureKind,
    pub message: String,
}

/// Failure records kept per run; every failure is still counted
pub const MAX_RETAINED_FAILURES: usize = 1_000;

/// Raw output of a runner: successful samples and failed attempts
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub samples: Vec<Sample>,
    /// First failures of the run, at most [`MAX_RETAINED_FAILURES`]
    pub failures: Vec<Failure>,
    pub(crate) failure_counts: BTreeMap<FailureKind, u64>,
}

impl RunOutcome {
    /// Count a failure, keeping its record while under the cap
    pub fn record_failure(&mut self, failure: Failure) {
        *self.failure_counts.entry(failure.kind).or_insert(0) += 1;
        if self.failures.len() < MAX_RETAINED_FAILURES {
            self.failures.push(failure);
        }
    }

    pub fn failed_requests(&self) -> u64 {
        self.failure_counts.values().sum()
    }

    pub fn total_requests(&self) -> u64 {
        self.samples.len() as u64 + self.failed_requests()
    }

    /// Append another outcome; order across outcomes is not meaningful
    pub fn merge(&mut self, other: RunOutcome) {
        self.samples.extend(other.samples);
        for (kind, count) in other.failure_counts {
            *self.failure_counts.entry(kind).or_insert(0) += count;
        }
        let room = MAX_RETAINED_FAILURES.saturating_sub(self.failures.len());
        self.failures.extend(other.failures.into_iter().take(room));
    }

    pub fn failure_breakdown(&self) -> BTreeMap<FailureKind, u64> {
        self.failure_counts.clone()
    }
}

/// Denominator used for requests-per-second
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RpsBasis {
    /// Configured test duration in seconds
    #[default]
    Configured,
    /// Measured wall-clock span of the run
    Measured,
}

/// Final artifact of one benchmark run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub test_start_time: i64,
    pub test_unique_name: String,
    pub test_display_name: String,
    pub test_description: String,
    pub data_folder: String,
    pub test_mode: String,
    pub request_url: String,
    pub request_type: String,
    pub concurrent_requests: u32,
    pub sleep_between_requests: f64,
    pub test_duration: u64,
    pub measured_duration_ns: i64,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub requests_per_second: f64,
    pub rps_basis: RpsBasis,
    #[serde(default)]
    pub failure_breakdown: BTreeMap<FailureKind, u64>,
    pub query_duration_stats: DurationStats,
    pub request_duration_stats: DurationStats,
}

impl BenchmarkResult {
    /// Fraction of requests that produced a sample
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.successful_requests as f64 / self.total_requests as f64
    }
}
