//! Startup wait for the cluster health endpoint.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

pub const HEALTH_PATH: &str = "/minio/health/live";
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    #[error("MinIO connection timeout after {}s: {last_error}", timeout.as_secs())]
    Timeout {
        timeout: Duration,
        last_error: String,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Polls `{endpoint}/minio/health/live` until it answers with a success status
/// or `timeout` elapses.
pub async fn wait_for_server(
    endpoint: &str,
    timeout: Duration,
    interval: Duration,
) -> Result<(), HealthError> {
    let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
    let url = format!("{}{}", endpoint.trim_end_matches('/'), HEALTH_PATH);
    let started = Instant::now();
    let mut last_error = String::from("no health check attempted");

    info!(%url, timeout_secs = timeout.as_secs(), "Waiting for MinIO server");
    while started.elapsed() < timeout {
        match client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!(%url, elapsed_ms = started.elapsed().as_millis() as u64, "MinIO server is ready");
                return Ok(());
            }
            Ok(resp) => {
                debug!(%url, status = %resp.status(), "Health check returned non-success");
                last_error = format!("HTTP {}", resp.status());
            }
            Err(e) => {
                debug!(%url, error = %e, "Health check failed");
                last_error = e.to_string();
            }
        }
        tokio::time::sleep(interval).await;
    }

    warn!(%url, %last_error, "MinIO server did not become ready");
    Err(HealthError::Timeout {
        timeout,
        last_error,
    })
}
