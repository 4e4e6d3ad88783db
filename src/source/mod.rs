//! The board's data source, chosen from configuration.
//!
//! The engine is generic over one [`Fetcher`] type, so the two supported
//! backends are wrapped in a single enum rather than boxed.

use std::future::Future;

use anyhow::{bail, Result};
use opsboard_adapters::{JsonFileSource, SheetsSource};
use opsboard_sync::{FetchError, Fetcher};
use opsboard_types::Dataset;

use crate::config::SourceConfig;

/// A configured data source.
#[derive(Debug, Clone)]
pub enum Source {
    /// Spreadsheet values API over HTTP.
    Sheets(SheetsSource),
    /// Local JSON file holding a values payload.
    File(JsonFileSource),
}

impl Source {
    /// Build the source described by `config`.
    ///
    /// A file path wins over HTTP settings so a local export can be
    /// inspected without editing the config.
    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        if let Some(ref path) = config.file {
            return Ok(Source::File(JsonFileSource::new(path)));
        }

        if config.url.is_none() && config.spreadsheet.is_none() {
            bail!("No data source configured: set source.url, source.spreadsheet or source.file (or pass --url / --file)");
        }

        let mut builder = SheetsSource::builder();
        if let Some(ref url) = config.url {
            builder = builder.url(url);
        }
        if let Some(ref endpoint) = config.endpoint {
            builder = builder.endpoint(endpoint);
        }
        if let Some(ref id) = config.spreadsheet {
            builder = builder.spreadsheet(id);
        }
        if let Some(ref range) = config.range {
            builder = builder.range(range);
        }
        if let Some(ref key) = config.api_key {
            builder = builder.api_key(key);
        }
        if let Some(ref token) = config.bearer_token {
            builder = builder.bearer_token(token);
        }
        Ok(Source::Sheets(builder.build()?))
    }
}

impl Fetcher for Source {
    fn fetch(&self) -> impl Future<Output = Result<Dataset, FetchError>> + Send {
        async move {
            match self {
                Source::Sheets(source) => source.fetch().await,
                Source::File(source) => source.fetch().await,
            }
        }
    }

    fn description(&self) -> &str {
        match self {
            Source::Sheets(source) => source.description(),
            Source::File(source) => source.description(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn file_wins_over_url() {
        let config = SourceConfig {
            url: Some("http://example.test/values".into()),
            file: Some(PathBuf::from("board.json")),
            ..SourceConfig::default()
        };
        let source = Source::from_config(&config).unwrap();
        assert!(matches!(source, Source::File(_)));
        assert_eq!(source.description(), "file: board.json");
    }

    #[test]
    fn spreadsheet_builds_sheets_source() {
        let config = SourceConfig {
            spreadsheet: Some("abc".into()),
            range: Some("Tickets!A1:H".into()),
            api_key: Some("key".into()),
            ..SourceConfig::default()
        };
        let source = Source::from_config(&config).unwrap();
        assert!(matches!(source, Source::Sheets(_)));
        assert_eq!(source.description(), "sheets: abc Tickets!A1:H");
    }

    #[test]
    fn nothing_configured_is_an_error() {
        assert!(Source::from_config(&SourceConfig::default()).is_err());
    }

    #[test]
    fn incomplete_spreadsheet_is_an_error() {
        let config = SourceConfig {
            spreadsheet: Some("abc".into()),
            ..SourceConfig::default()
        };
        assert!(Source::from_config(&config).is_err());
    }
}
