//! Spreadsheet values API adapter.
//!
//! Reads one A1 range through a `GET .../values/{range}` endpoint returning
//! `{ "values": [[...]] }`. Each call is exactly one request; caching,
//! single-flight and backoff live in the engine.
//!
//! ## Example
//!
//! ```rust,no_run
//! use opsboard_adapters::sheets::SheetsSource;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = SheetsSource::builder()
//!         .spreadsheet("1BxiMVs0XRA5nFMdKvBdBZjgmUUqptlbs74OgvE2upms")
//!         .range("Tickets!A1:H")
//!         .api_key("AIza...")
//!         .build()?;
//!
//!     let dataset = source.fetch_values().await?;
//!     println!("{} records", dataset.len());
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::time::Duration;

use opsboard_sync::{FetchError, Fetcher};
use opsboard_types::Dataset;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Url};
use tracing::debug;

use crate::payload::{classify_status, decode_body, parse_retry_after};
use crate::AdapterError;

/// Default values API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Debug, Clone)]
enum Auth {
    None,
    ApiKey(String),
    Bearer(String),
}

/// Fetches a spreadsheet range over HTTP.
#[derive(Debug, Clone)]
pub struct SheetsSource {
    client: Client,
    url: String,
    auth: Auth,
    description: String,
}

impl SheetsSource {
    /// Create a new builder for configuring the source.
    pub fn builder() -> SheetsSourceBuilder {
        SheetsSourceBuilder::default()
    }

    /// The resolved request URL (without credentials).
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Perform one GET and decode the body.
    pub async fn fetch_values(&self) -> Result<Dataset, AdapterError> {
        let mut request = self.client.get(&self.url);
        request = match &self.auth {
            Auth::None => request,
            Auth::ApiKey(key) => request.query(&[("key", key)]),
            Auth::Bearer(token) => request.bearer_auth(token),
        };

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "Values API returned an error status");
            return Err(classify_status(status.as_u16(), &body, retry_after));
        }

        let body = response.text().await?;
        decode_body(&body)
    }
}

impl Fetcher for SheetsSource {
    fn fetch(&self) -> impl Future<Output = Result<Dataset, FetchError>> + Send {
        async move { self.fetch_values().await.map_err(FetchError::from) }
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Builder for [`SheetsSource`].
#[derive(Debug, Default)]
pub struct SheetsSourceBuilder {
    url: Option<String>,
    endpoint: Option<String>,
    spreadsheet: Option<String>,
    range: Option<String>,
    api_key: Option<String>,
    bearer_token: Option<String>,
    timeout: Option<Duration>,
}

impl SheetsSourceBuilder {
    /// Use a complete request URL, bypassing endpoint/spreadsheet/range.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the API endpoint (default: [`DEFAULT_ENDPOINT`]).
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the spreadsheet id.
    pub fn spreadsheet(mut self, id: impl Into<String>) -> Self {
        self.spreadsheet = Some(id.into());
        self
    }

    /// Set the A1 range to read (e.g. `"Tickets!A1:H"`).
    pub fn range(mut self, range: impl Into<String>) -> Self {
        self.range = Some(range.into());
        self
    }

    /// Authenticate with an API key query parameter.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Authenticate with an OAuth bearer token. Takes precedence over an API key.
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Set the client-side request timeout (default: 8 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the source.
    pub fn build(self) -> Result<SheetsSource, AdapterError> {
        let (url, description) = match (self.url, self.spreadsheet, self.range) {
            (Some(url), _, _) => {
                let description = format!("sheets: {}", url);
                (url, description)
            }
            (None, Some(id), Some(range)) => {
                let endpoint = self
                    .endpoint
                    .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
                let url = values_url(&endpoint, &id, &range)?;
                (url, format!("sheets: {} {}", id, range))
            }
            (None, Some(_), None) => {
                return Err(AdapterError::Config("spreadsheet id given without a range".into()))
            }
            (None, None, _) => {
                return Err(AdapterError::Config(
                    "either a URL or a spreadsheet id and range is required".into(),
                ))
            }
        };

        let auth = match (self.bearer_token, self.api_key) {
            (Some(token), _) => Auth::Bearer(token),
            (None, Some(key)) => Auth::ApiKey(key),
            (None, None) => Auth::None,
        };

        let client = Client::builder()
            .timeout(self.timeout.unwrap_or(Duration::from_secs(8)))
            .build()?;

        Ok(SheetsSource {
            client,
            url,
            auth,
            description,
        })
    }
}

/// `{endpoint}/{id}/values/{range}`, with the range encoded as one path segment.
fn values_url(endpoint: &str, id: &str, range: &str) -> Result<String, AdapterError> {
    let mut url = Url::parse(endpoint)
        .map_err(|e| AdapterError::Config(format!("invalid endpoint {}: {}", endpoint, e)))?;
    url.path_segments_mut()
        .map_err(|_| AdapterError::Config(format!("endpoint {} cannot take a path", endpoint)))?
        .pop_if_empty()
        .push(id)
        .push("values")
        .push(range);
    Ok(url.into())
}
