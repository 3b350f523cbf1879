//! Read-only HTTP front end over stored benchmark results.

use anyhow::{Context, Result};
use axum::{
    extract::{Form, Path, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, instrument, warn};

use crate::report::{Comparison, Reporter};
use crate::store::{ResultStore, StoredRun};
use crate::suite::is_valid_test_name;

/// Results API state
#[derive(Debug, Clone)]
pub struct ApiState {
    /// Store the results are read from
    pub store: ResultStore,
    /// Directory holding pre-rendered comparison reports
    pub comparison_folder: Arc<PathBuf>,
    /// Renders missing comparison reports on demand
    pub reporter: Reporter,
}

impl ApiState {
    pub fn new(store: ResultStore, comparison_folder: impl Into<PathBuf>) -> Self {
        Self {
            store,
            comparison_folder: Arc::new(comparison_folder.into()),
            reporter: Reporter::disabled(),
        }
    }

    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    fn comparison_path(&self, first: &str, second: &str) -> PathBuf {
        self.comparison_folder
            .join(format!("{}_vs_{}_comparison_report.html", first, second))
    }
}

fn read_html(path: &std::path::Path) -> Result<Response, StatusCode> {
    let report = std::fs::read_to_string(path).map_err(|e| {
        error!(path = %path.display(), error = %e, "Failed to read comparison report");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Html(report).into_response())
}

/// Health check endpoint
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "perfbench-results",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// List stored benchmarks
#[instrument(skip(state))]
async fn handle_list_benchmarks(
    State(state): State<ApiState>,
) -> Result<Json<Vec<StoredRun>>, StatusCode> {
    state.store.list().map(Json).map_err(|e| {
        error!(error = %e, "Failed to list stored benchmarks");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Rendered report when available, stored summary otherwise
#[instrument(skip(state))]
async fn handle_show_benchmark(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Response, StatusCode> {
    if !is_valid_test_name(&id) {
        return Err(StatusCode::BAD_REQUEST);
    }

    let report_path = state.store.report_path(&id).map_err(|_| StatusCode::BAD_REQUEST)?;
    if report_path.is_file() {
        let report = std::fs::read_to_string(&report_path).map_err(|e| {
            error!(path = %report_path.display(), error = %e, "Failed to read report");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
        return Ok(Html(report).into_response());
    }

    match state.store.load(&id) {
        Ok(Some(result)) => Ok(Json(result).into_response()),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!(test = %id, error = %e, "Failed to load benchmark");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Raw samples of a stored benchmark
#[instrument(skip(state))]
async fn handle_benchmark_data(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Response, StatusCode> {
    if !is_valid_test_name(&id) {
        return Err(StatusCode::BAD_REQUEST);
    }

    match state.store.load_samples_csv(&id) {
        Ok(Some(csv)) => Ok(([(CONTENT_TYPE, "text/csv")], csv).into_response()),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!(test = %id, error = %e, "Failed to read raw samples");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Runs selectable for a comparison
#[instrument(skip(state))]
async fn handle_compare_choices(
    State(state): State<ApiState>,
) -> Result<Json<Vec<String>>, StatusCode> {
    let runs = state.store.list().map_err(|e| {
        error!(error = %e, "Failed to list stored benchmarks");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(runs.into_iter().map(|run| run.name).collect()))
}

/// Comparison picked from the selection form
#[derive(Debug, Deserialize)]
struct CompareSelection {
    folder1: String,
    folder2: String,
}

/// Redirect a submitted selection to its comparison
#[instrument]
async fn handle_compare_select(
    Form(selection): Form<CompareSelection>,
) -> Result<Redirect, StatusCode> {
    if !is_valid_test_name(&selection.folder1) || !is_valid_test_name(&selection.folder2) {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(Redirect::to(&format!(
        "/compare/{}/{}",
        selection.folder1, selection.folder2
    )))
}

/// Pre-rendered comparison when available, computed comparison otherwise
#[instrument(skip(state))]
async fn handle_compare(
    State(state): State<ApiState>,
    Path((first, second)): Path<(String, String)>,
) -> Result<Response, StatusCode> {
    if !is_valid_test_name(&first) || !is_valid_test_name(&second) {
        return Err(StatusCode::BAD_REQUEST);
    }

    for (a, b) in [(&first, &second), (&second, &first)] {
        let path = state.comparison_path(a, b);
        if path.is_file() {
            return read_html(&path);
        }
    }

    match state.reporter.compare(&first, &second, state.store.root()).await {
        Ok(true) => {
            let path = state.comparison_path(&first, &second);
            if path.is_file() {
                return read_html(&path);
            }
            warn!(path = %path.display(), "Comparison command produced no report");
        }
        Ok(false) => {}
        Err(e) => warn!(error = %e, "Comparison report generation failed"),
    }

    let load = |name: &str| match state.store.load(name) {
        Ok(Some(result)) => Ok(result),
        Ok(None) => {
            warn!(test = %name, "Comparison requested for unknown benchmark");
            Err(StatusCode::NOT_FOUND)
        }
        Err(e) => {
            error!(test = %name, error = %e, "Failed to load benchmark");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    };
    let baseline = load(&first)?;
    let candidate = load(&second)?;

    Ok(Json(Comparison::between(&baseline, &candidate)).into_response())
}

/// Create results API router
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/benchmarks", get(handle_list_benchmarks))
        .route("/benchmarks/:id", get(handle_show_benchmark))
        .route("/benchmarks/:id/data.csv", get(handle_benchmark_data))
        .route(
            "/compare",
            get(handle_compare_choices).post(handle_compare_select),
        )
        .route("/compare/:first/:second", get(handle_compare))
        .with_state(state)
}

/// Start the results API server
#[instrument(skip(state))]
pub async fn start_results_api(listen_addr: &str, state: ApiState) -> Result<()> {
    let app = create_router(state);

    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", listen_addr))?;

    info!(addr = %listen_addr, "Results API listening");

    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "Results API server failed");
        return Err(e.into());
    }

    Ok(())
}
