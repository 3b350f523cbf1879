use thiserror::Error;

/// Errors that can occur while running or storing a benchmark
#[derive(Error, Debug)]
pub enum BenchError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Statistics requested over a series with no samples
    #[error("No samples to aggregate for {series}")]
    EmptyResultSet { series: &'static str },

    /// A load worker did not complete
    #[error("Worker error: {0}")]
    Worker(String),

    /// Report generation error
    #[error("Report error: {0}")]
    Report(String),

    /// Result storage error
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type alias using BenchError
pub type Result<T> = std::result::Result<T, BenchError>;

impl From<serde_json::Error> for BenchError {
    fn from(err: serde_json::Error) -> Self {
        BenchError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for BenchError {
    fn from(err: serde_yaml::Error) -> Self {
        BenchError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for BenchError {
    fn from(err: config::ConfigError) -> Self {
        BenchError::Config(err.to_string())
    }
}
