use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::Result as BenchResult;
use crate::model::RpsBasis;

/// Application settings for the benchmark runner and results API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// YAML file holding the test definitions
    pub tests_file: String,
    /// Root directory for per-test result folders
    pub data_folder: String,
    /// Directory holding pre-rendered comparison reports
    pub comparison_folder: String,
    /// Denominator for requests per second
    pub rps_basis: RpsBasis,
    /// Serve stored results once the suite has finished
    pub serve: bool,
    /// Results API configuration
    pub api: ApiConfig,
    /// External report generator
    pub report: ReportConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Results API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Listen address, e.g. 0.0.0.0:8081
    pub listen_addr: String,
}

/// External reporting tool configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Program and leading arguments; the test name is appended
    pub command: Option<Vec<String>>,
    /// Program and leading arguments; both test names are appended
    pub compare_command: Option<Vec<String>>,
    /// Working directory for both commands
    pub working_dir: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, text)
    pub format: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tests_file: "tests.yaml".to_string(),
            data_folder: "data".to_string(),
            comparison_folder: "data/comparisons".to_string(),
            rps_basis: RpsBasis::Configured,
            serve: true,
            api: ApiConfig::default(),
            report: ReportConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8081".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: Some("text".to_string()),
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.as_deref() == Some("json")
    }
}

impl Settings {
    /// Load settings from an optional file plus `PERFBENCH_*` environment variables
    pub fn from_file(path: &str) -> BenchResult<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("PERFBENCH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Get the results API listen address
    pub fn listen_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.api.listen_addr.parse()
    }

    pub fn data_folder(&self) -> PathBuf {
        PathBuf::from(&self.data_folder)
    }

    pub fn comparison_folder(&self) -> PathBuf {
        PathBuf::from(&self.comparison_folder)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.tests_file.trim().is_empty() {
            return Err("Tests file path cannot be empty".to_string());
        }

        if self.data_folder.trim().is_empty() {
            return Err("Data folder cannot be empty".to_string());
        }

        if self.serve {
            self.listen_addr()
                .map_err(|e| format!("Invalid API listen address {}: {}", self.api.listen_addr, e))?;
        }

        for (name, command) in [
            ("report.command", &self.report.command),
            ("report.compare_command", &self.report.compare_command),
        ] {
            if let Some(command) = command {
                if command.first().map_or(true, |program| program.trim().is_empty()) {
                    return Err(format!("{} must name a program", name));
                }
            }
        }

        Ok(())
    }
}
