//! The seam between the engine and a concrete data source.

use std::future::Future;
use std::sync::Arc;

use opsboard_types::Dataset;

use crate::error::FetchError;

/// Something that can produce a fresh [`Dataset`] on demand.
///
/// Implementations perform exactly one outbound request per call; retries,
/// caching and de-duplication are the engine's job. Rate limiting must be
/// reported as [`FetchError::QuotaExceeded`] so backoff can grow.
pub trait Fetcher: Send + Sync + 'static {
    /// Fetch the current dataset.
    fn fetch(&self) -> impl Future<Output = Result<Dataset, FetchError>> + Send;

    /// Human-readable description of the source (e.g. "sheets: <id>").
    fn description(&self) -> &str;
}

impl<F: Fetcher> Fetcher for Arc<F> {
    fn fetch(&self) -> impl Future<Output = Result<Dataset, FetchError>> + Send {
        (**self).fetch()
    }

    fn description(&self) -> &str {
        (**self).description()
    }
}
