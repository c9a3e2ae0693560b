use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{broadcast, Semaphore};
use uuid::Uuid;

use super::LiveStatusFetch;

const THEMEPARKS_BASE_URL: &str = "https://api.themeparks.wiki/v1";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("http error: status {0}")]
    Http(u16),
    #[error("request timed out")]
    Timeout,
}

/// Diagnostics record for a single request against the status API.
#[derive(Debug, Clone, Serialize)]
pub struct FetchLog {
    /// Unique request id
    pub id: String,
    /// Timestamp when the request was made
    pub timestamp: String,
    /// Entity id the request was for
    pub entity_id: String,
    /// Duration of the request in milliseconds
    pub duration_ms: u64,
    /// HTTP status code (0 if the request never got a response)
    pub status: u16,
    /// Response size in bytes
    pub response_size: Option<usize>,
    /// Error message if the request failed
    pub error: Option<String>,
}

/// Sender for fetch diagnostics
pub type FetchLogSender = broadcast::Sender<FetchLog>;

/// HTTP client for the themeparks.wiki live-status endpoint.
///
/// Stateless beyond connection pooling and rate limiting; safe to share and
/// call concurrently for different entity ids.
pub struct ThemeParksClient {
    client: Client,
    /// Semaphore to limit concurrent requests
    rate_limiter: Arc<Semaphore>,
    /// Sender for request diagnostics
    diagnostics_tx: FetchLogSender,
}

impl ThemeParksClient {
    pub fn new(
        max_concurrent_requests: usize,
        diagnostics_tx: FetchLogSender,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            rate_limiter: Arc::new(Semaphore::new(max_concurrent_requests)),
            diagnostics_tx,
        })
    }

    /// Send a diagnostics log entry
    fn log_request(&self, log: FetchLog) {
        // Ignore send errors - they just mean no one is listening
        let _ = self.diagnostics_tx.send(log);
    }

    async fn get_live(&self, entity_id: &str, timeout: Duration) -> Result<String, FetchError> {
        // Acquire permit before making the request (limits concurrency)
        let _permit = self
            .rate_limiter
            .acquire()
            .await
            .expect("Semaphore closed unexpectedly");

        let start = Instant::now();
        let request_id = Uuid::new_v4().to_string();

        let url = format!(
            "{}/entity/{}/live",
            THEMEPARKS_BASE_URL,
            urlencoding::encode(entity_id)
        );

        let response = match self.client.get(&url).timeout(timeout).send().await {
            Ok(resp) => resp,
            Err(e) => {
                let err = if e.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::Network(e.to_string())
                };
                self.log_request(FetchLog {
                    id: request_id,
                    timestamp: Utc::now().to_rfc3339(),
                    entity_id: entity_id.to_string(),
                    duration_ms: start.elapsed().as_millis() as u64,
                    status: 0,
                    response_size: None,
                    error: Some(err.to_string()),
                });
                return Err(err);
            }
        };

        let status = response.status().as_u16();

        if !response.status().is_success() {
            self.log_request(FetchLog {
                id: request_id,
                timestamp: Utc::now().to_rfc3339(),
                entity_id: entity_id.to_string(),
                duration_ms: start.elapsed().as_millis() as u64,
                status,
                response_size: None,
                error: Some(format!("HTTP error: {}", status)),
            });
            return Err(FetchError::Http(status));
        }

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => {
                self.log_request(FetchLog {
                    id: request_id,
                    timestamp: Utc::now().to_rfc3339(),
                    entity_id: entity_id.to_string(),
                    duration_ms: start.elapsed().as_millis() as u64,
                    status,
                    response_size: None,
                    error: Some(format!("failed to read body: {}", e)),
                });
                return Err(FetchError::Network(e.to_string()));
            }
        };

        self.log_request(FetchLog {
            id: request_id,
            timestamp: Utc::now().to_rfc3339(),
            entity_id: entity_id.to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
            status,
            response_size: Some(body.len()),
            error: None,
        });

        Ok(body)
    }
}

impl LiveStatusFetch for ThemeParksClient {
    async fn fetch_live(&self, entity_id: &str, timeout: Duration) -> Result<String, FetchError> {
        self.get_live(entity_id, timeout).await
    }
}
