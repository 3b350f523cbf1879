use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use serde_json::{Map, Value};
use std::future::Future;
use std::time::Instant;
use thiserror::Error;

use crate::error::{BenchError, Result};
use crate::model::{epoch_nanos, FailureKind, Sample};
use crate::suite::TestSpec;

/// Why a single request produced no sample
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestFailure {
    /// Method or URL could not be turned into a request
    #[error("Failed to build request: {0}")]
    Construction(String),

    /// Connection, timeout, or transfer failure
    #[error("Network error: {0}")]
    Network(String),

    /// Body is not a JSON object
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Duration field missing or not a number
    #[error("Failed to extract duration: {0}")]
    FieldExtraction(String),
}

impl RequestFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            RequestFailure::Construction(_) => FailureKind::Construction,
            RequestFailure::Network(_) => FailureKind::Network,
            RequestFailure::Decode(_) => FailureKind::Decode,
            RequestFailure::FieldExtraction(_) => FailureKind::FieldExtraction,
        }
    }
}

/// One measurement attempt, the unit of work of every runner
pub trait Measure: Send + Sync + 'static {
    fn measure(&self) -> impl Future<Output = std::result::Result<Sample, RequestFailure>> + Send;
}

/// Issues one timed HTTP request per call
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    client: Client,
    method: String,
    url: String,
    duration_field: String,
}

impl RequestExecutor {
    /// Build an executor with its own client bounded by the test's request timeout
    pub fn new(spec: &TestSpec) -> Result<Self> {
        let client = Client::builder()
            .timeout(spec.request_timeout())
            .build()
            .map_err(|e| BenchError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(client, spec))
    }

    pub fn with_client(client: Client, spec: &TestSpec) -> Self {
        Self {
            client,
            method: spec.request_type.clone(),
            url: spec.request_url.clone(),
            duration_field: spec.duration_field.clone(),
        }
    }

    /// Send the request, wait for the full body and extract the duration field
    pub async fn execute(&self) -> std::result::Result<Sample, RequestFailure> {
        let method = parse_method(&self.method)?;
        let request = self
            .client
            .request(method, self.url.as_str())
            .header(CONTENT_TYPE, "application/json")
            .build()
            .map_err(|e| RequestFailure::Construction(e.to_string()))?;

        let start_timestamp = epoch_nanos();
        let started = Instant::now();

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| RequestFailure::Network(describe_network_error(&e)))?;
        let body = response
            .bytes()
            .await
            .map_err(|e| RequestFailure::Network(describe_network_error(&e)))?;

        let elapsed = started.elapsed();
        let query_duration = extract_duration(&body, &self.duration_field)?;

        Ok(Sample {
            start_timestamp,
            end_timestamp: epoch_nanos(),
            query_duration,
            request_duration: i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX),
        })
    }
}

impl Measure for RequestExecutor {
    fn measure(&self) -> impl Future<Output = std::result::Result<Sample, RequestFailure>> + Send {
        self.execute()
    }
}

pub(crate) fn parse_method(method: &str) -> std::result::Result<Method, RequestFailure> {
    let method = method.trim();
    if method.is_empty() {
        return Ok(Method::GET);
    }
    Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|e| RequestFailure::Construction(format!("invalid method {:?}: {}", method, e)))
}

fn describe_network_error(err: &reqwest::Error) -> String {
    let reason = if err.is_timeout() {
        "Timeout"
    } else if err.is_connect() {
        "Connection refused or host unreachable"
    } else if err.is_body() || err.is_decode() {
        "Failed to read response body"
    } else {
        "Request failed"
    };
    format!("{}: {}", reason, err)
}

/// Read `field` from a JSON object body as integer nanoseconds
pub fn extract_duration(body: &[u8], field: &str) -> std::result::Result<i64, RequestFailure> {
    let object: Map<String, Value> =
        serde_json::from_slice(body).map_err(|e| RequestFailure::Decode(e.to_string()))?;

    match object.get(field) {
        None | Some(Value::Null) => Err(RequestFailure::FieldExtraction(format!(
            "field {} missing from response",
            field
        ))),
        Some(Value::Number(number)) => match number.as_i64() {
            Some(value) => Ok(value),
            // Fractional or out-of-range values truncate like a float cast
            None => number.as_f64().map(|value| value as i64).ok_or_else(|| {
                RequestFailure::FieldExtraction(format!("field {} is not representable", field))
            }),
        },
        Some(other) => Err(RequestFailure::FieldExtraction(format!(
            "field {} is not a number: {}",
            field, other
        ))),
    }
}
