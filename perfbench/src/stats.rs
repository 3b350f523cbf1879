//! Summary statistics over duration samples.
//!
//! All values are signed nanoseconds. Mean, standard deviation and
//! percentiles are truncated toward zero, never rounded.

use serde::{Deserialize, Serialize};

use crate::error::{BenchError, Result};
use crate::model::Sample;

/// Summary of one duration series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationStats {
    pub min: i64,
    pub max: i64,
    #[serde(rename = "avg")]
    pub mean: i64,
    /// Population standard deviation
    #[serde(rename = "std")]
    pub stddev: i64,
    pub p25: i64,
    pub p50: i64,
    pub p75: i64,
    pub p90: i64,
    pub p95: i64,
    pub p99: i64,
}

/// Which duration of a sample to aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationSeries {
    /// Server-reported duration
    Query,
    /// Client-observed round trip
    Request,
}

impl DurationSeries {
    pub fn name(&self) -> &'static str {
        match self {
            DurationSeries::Query => "query_duration",
            DurationSeries::Request => "request_duration",
        }
    }

    fn extract(&self, sample: &Sample) -> i64 {
        match self {
            DurationSeries::Query => sample.query_duration,
            DurationSeries::Request => sample.request_duration,
        }
    }
}

impl DurationStats {
    /// Aggregate one series of the given samples
    pub fn from_samples(samples: &[Sample], series: DurationSeries) -> Result<Self> {
        let values = samples.iter().map(|s| series.extract(s)).collect();
        aggregate(values).map_err(|_| BenchError::EmptyResultSet {
            series: series.name(),
        })
    }
}

/// Compute summary statistics, consuming and sorting `values`
pub fn aggregate(mut values: Vec<i64>) -> Result<DurationStats> {
    if values.is_empty() {
        return Err(BenchError::EmptyResultSet { series: "durations" });
    }
    values.sort_unstable();

    let n = values.len();
    let sum: i128 = values.iter().map(|&v| v as i128).sum();
    let mean_exact = sum as f64 / n as f64;
    let variance = values
        .iter()
        .map(|&v| {
            let delta = v as f64 - mean_exact;
            delta * delta
        })
        .sum::<f64>()
        / n as f64;

    Ok(DurationStats {
        min: values[0],
        max: values[n - 1],
        // i128 division truncates toward zero
        mean: (sum / n as i128) as i64,
        stddev: variance.sqrt() as i64,
        p25: quantile(&values, 0.25),
        p50: quantile(&values, 0.50),
        p75: quantile(&values, 0.75),
        p90: quantile(&values, 0.90),
        p95: quantile(&values, 0.95),
        p99: quantile(&values, 0.99),
    })
}

/// Type 7 quantile estimate of ascending, non-empty `sorted`
pub fn quantile(sorted: &[i64], p: f64) -> i64 {
    debug_assert!(!sorted.is_empty());
    let h = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower_idx = h.floor() as usize;
    let upper_idx = h.ceil() as usize;
    let lower = sorted[lower_idx];
    let upper = sorted[upper_idx];
    if lower == upper {
        return lower;
    }

    let fraction = h - lower_idx as f64;
    let estimate = lower as f64 + (upper as f64 - lower as f64) * fraction;
    // Float error must not escape the bracketing samples
    (estimate.trunc() as i64).clamp(lower, upper)
}
