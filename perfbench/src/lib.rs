//! perfbench library
//!
//! Load-testing engine for HTTP APIs: drives continuous or concurrent
//! traffic against an endpoint, records client round trips next to the
//! duration the server reports in its JSON body, and aggregates both into
//! percentile summaries.

pub mod api;
pub mod config;
pub mod error;
pub mod executor;
pub mod model;
pub mod orchestrator;
pub mod origin;
pub mod report;
pub mod runner;
pub mod stats;
pub mod store;
pub mod suite;

// Re-export commonly used types
pub use config::Settings;
pub use error::{BenchError, Result};
pub use executor::{Measure, RequestExecutor, RequestFailure};
pub use model::{BenchmarkResult, Failure, FailureKind, RpsBasis, RunOutcome, Sample};
pub use orchestrator::{BenchmarkRun, Orchestrator};
pub use runner::{run_concurrent, run_continuous, RunWindow};
pub use stats::{aggregate, DurationStats};
pub use store::ResultStore;
pub use suite::{ExecutionMode, TestSpec};
