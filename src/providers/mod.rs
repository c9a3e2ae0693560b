pub mod themeparks;

use std::future::Future;
use std::time::Duration;

use themeparks::FetchError;

/// Seam between the sync engine and the live-status HTTP client so tests can
/// substitute a scripted fetcher. One call performs exactly one request and
/// never retries.
pub trait LiveStatusFetch: Send + Sync + 'static {
    /// Fetch the raw live-status payload for a park or attraction entity.
    /// The timeout applies to this single request.
    fn fetch_live(
        &self,
        entity_id: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<String, FetchError>> + Send;
}
