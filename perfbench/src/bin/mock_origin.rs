use anyhow::{Context, Result};
use perfbench::origin::MockOrigin;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "perfbench=info".into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .init();

    let addr: SocketAddr = std::env::var("MOCK_ORIGIN_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
        .parse()
        .context("Invalid MOCK_ORIGIN_ADDR")?;

    let delay = match std::env::var("MOCK_ORIGIN_DELAY_MS") {
        Ok(ms) => Duration::from_millis(ms.parse().context("Invalid MOCK_ORIGIN_DELAY_MS")?),
        Err(_) => Duration::ZERO,
    };

    let body = std::env::var("MOCK_ORIGIN_BODY")
        .unwrap_or_else(|_| MockOrigin::query_duration_body(delay));

    info!("Starting mock origin for perfbench trials");
    MockOrigin::bind(addr, body, delay).await?.run().await
}
