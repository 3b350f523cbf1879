use anyhow::{Context, Result};
use tracing::{error, info, warn};

use perfbench::api::{start_results_api, ApiState};
use perfbench::config::{LoggingConfig, Settings};
use perfbench::report::Reporter;
use perfbench::store::ResultStore;
use perfbench::suite::load_tests;
use perfbench::Orchestrator;

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("perfbench={}", logging.level).into());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true);

    if logging.is_json() {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let loaded = Settings::from_file("config/perfbench");
    let settings = loaded.as_ref().cloned().unwrap_or_default();
    init_tracing(&settings.logging);

    info!("Starting perfbench v{}", env!("CARGO_PKG_VERSION"));
    match &loaded {
        Ok(_) => info!("Configuration loaded"),
        Err(e) => warn!("Failed to load config file: {}, using defaults", e),
    }

    settings
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    let tests = load_tests(&settings.tests_file)
        .with_context(|| format!("Failed to load tests from {}", settings.tests_file))?;

    let store = ResultStore::new(settings.data_folder());
    let reporter = Reporter::new(&settings.report);
    if !reporter.is_enabled() {
        info!("No report command configured, skipping HTML reports");
    }

    let orchestrator = Orchestrator::new(store.clone(), reporter.clone(), settings.rps_basis);
    let entries = orchestrator.run_suite(&tests).await;

    let failed: Vec<&str> = entries
        .iter()
        .filter(|entry| entry.result.is_err())
        .map(|entry| entry.test_unique_name.as_str())
        .collect();
    info!(
        tests = entries.len(),
        failed = failed.len(),
        "Benchmark suite finished"
    );

    if settings.serve {
        info!(
            "Results available at http://{}/benchmarks",
            settings.api.listen_addr
        );
        let state = ApiState::new(store, settings.comparison_folder()).with_reporter(reporter);
        start_results_api(&settings.api.listen_addr, state).await?;
    } else if !failed.is_empty() {
        error!(tests = ?failed, "Some benchmarks failed");
        anyhow::bail!("{} of {} benchmarks failed", failed.len(), entries.len());
    }

    Ok(())
}
