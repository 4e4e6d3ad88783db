//! File-based data source.
//!
//! Reads a JSON file holding a values payload (`{ "values": [[...]] }`).
//! Useful for demos, offline work and for pointing the dashboard at an
//! export produced by another tool.

use std::future::Future;
use std::path::{Path, PathBuf};

use opsboard_sync::{FetchError, Fetcher};
use opsboard_types::Dataset;

use crate::payload::decode_body;
use crate::AdapterError;

/// A data source that reads a values payload from a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
    description: String,
}

impl JsonFileSource {
    /// Create a new file source for the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self { path, description }
    }

    /// Returns the path being read.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and decode the file.
    pub async fn read(&self) -> Result<Dataset, AdapterError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| AdapterError::Io {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;
        decode_body(&content)
    }
}

impl Fetcher for JsonFileSource {
    fn fetch(&self) -> impl Future<Output = Result<Dataset, FetchError>> + Send {
        async move { self.read().await.map_err(FetchError::from) }
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample_json() -> &'static str {
        r#"{
            "values": [
                ["id", "status", "updated_at"],
                ["R-1", "awaiting_reply", "2024-05-01T08:00:00Z"],
                ["R-2", "sent", "2024-05-01T09:00:00Z"]
            ]
        }"#
    }

    #[tokio::test]
    async fn reads_values_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(sample_json().as_bytes()).unwrap();

        let source = JsonFileSource::new(file.path());
        let dataset = source.fetch().await.unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.records[0].get("status"), "awaiting_reply");
        assert!(source.description().starts_with("file: "));
    }

    #[tokio::test]
    async fn missing_file_is_a_connection_failure() {
        let source = JsonFileSource::new("/nonexistent/opsboard/board.json");
        assert!(matches!(
            source.fetch().await,
            Err(FetchError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn invalid_json_is_a_parse_failure() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"not json").unwrap();

        let source = JsonFileSource::new(file.path());
        assert!(matches!(source.fetch().await, Err(FetchError::Parse(_))));
    }

    #[tokio::test]
    async fn picks_up_rewrites() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(sample_json().as_bytes()).unwrap();
        let source = JsonFileSource::new(file.path());
        assert_eq!(source.fetch().await.unwrap().len(), 2);

        std::fs::write(file.path(), r#"{"values": [["id", "status", "updated_at"]]}"#).unwrap();
        assert!(source.fetch().await.unwrap().is_empty());
    }
}
