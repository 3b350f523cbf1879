use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

/// Minimal HTTP origin answering every request with a fixed JSON body
pub struct MockOrigin {
    listener: TcpListener,
    body: Arc<String>,
    delay: Duration,
}

impl MockOrigin {
    /// Bind the origin; use port 0 to pick a free port
    pub async fn bind(listen_addr: SocketAddr, body: impl Into<String>, delay: Duration) -> Result<Self> {
        let listener = TcpListener::bind(listen_addr).await?;
        Ok(Self {
            listener,
            body: Arc::new(body.into()),
            delay,
        })
    }

    /// Body reporting `duration` as the server-side query duration
    pub fn query_duration_body(duration: Duration) -> String {
        format!(r#"{{"QueryDuration": {}}}"#, duration.as_nanos())
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the task is dropped
    pub async fn run(self) -> Result<()> {
        info!(
            listen_addr = %self.local_addr()?,
            delay = ?self.delay,
            "Mock origin started"
        );

        loop {
            match self.listener.accept().await {
                Ok((stream, client_addr)) => {
                    let body = Arc::clone(&self.body);
                    let delay = self.delay;
                    tokio::spawn(async move {
                        if let Err(e) = handle_http_request(stream, client_addr, &body, delay).await {
                            error!(
                                client_addr = %client_addr,
                                error = %e,
                                "Origin: Failed to handle request"
                            );
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "Origin: Failed to accept connection");
                }
            }
        }
    }
}

/// Answer a single HTTP request after the configured delay
async fn handle_http_request(
    mut stream: TcpStream,
    client_addr: SocketAddr,
    body: &str,
    delay: Duration,
) -> Result<()> {
    let mut buffer = vec![0u8; 4096];
    let mut filled = 0;

    // Read until the end of the request head
    loop {
        let bytes_read = stream.read(&mut buffer[filled..]).await?;
        if bytes_read == 0 {
            if filled == 0 {
                debug!(client_addr = %client_addr, "Origin: Connection closed by client");
                return Ok(());
            }
            break;
        }
        filled += bytes_read;
        if buffer[..filled].windows(4).any(|w| w == b"\r\n\r\n") || filled == buffer.len() {
            break;
        }
    }

    if let Some(first_line) = String::from_utf8_lossy(&buffer[..filled]).lines().next() {
        debug!(client_addr = %client_addr, request_line = %first_line, "Origin: HTTP request line");
    }

    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let response = format!(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         Server: MockOrigin/1.0\r\n\
         \r\n\
         {}",
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;

    if let Err(e) = stream.shutdown().await {
        warn!(client_addr = %client_addr, error = %e, "Origin: Failed to shutdown connection");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_duration_body() {
        assert_eq!(
            MockOrigin::query_duration_body(Duration::from_millis(3)),
            r#"{"QueryDuration": 3000000}"#
        );
    }

    #[tokio::test]
    async fn test_serves_configured_body() {
        let origin = MockOrigin::bind(
            "127.0.0.1:0".parse().unwrap(),
            r#"{"QueryDuration": 42}"#,
            Duration::ZERO,
        )
        .await
        .unwrap();
        let addr = origin.local_addr().unwrap();
        tokio::spawn(origin.run());

        let body: serde_json::Value = reqwest::get(format!("http://{}/anything", addr))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["QueryDuration"], 42);
    }
}
