//! HTTP download capability used by the media resolver.

use std::path::Path;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::error::FetchError;

/// Outcome of a completed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFile {
    /// Bytes written to the destination.
    pub size: u64,
    pub content_type: Option<String>,
}

/// Downloads remote media.
///
/// Implementations classify failures as transient or permanent; they do not
/// retry or enforce deadlines themselves.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// Stream the body of `url` into `dest`, truncating any existing file.
    async fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<FetchedFile, FetchError>;

    /// Cheap existence check.
    async fn probe(&self, url: &str) -> Result<(), FetchError>;
}

/// [`HttpFetcher`] backed by `reqwest`.
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new(user_agent: &str) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        let agent = HeaderValue::from_str(user_agent)
            .map_err(|e| FetchError::Permanent(format!("Invalid user agent: {}", e)))?;
        headers.insert(USER_AGENT, agent);

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| FetchError::Permanent(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self { client })
    }
}

fn request_error(e: reqwest::Error) -> FetchError {
    if e.is_builder() {
        FetchError::Permanent(format!("Invalid request: {}", e))
    } else {
        FetchError::Transient(format!("HTTP request failed: {}", e))
    }
}

fn io_error(dest: &Path, e: std::io::Error) -> FetchError {
    FetchError::Permanent(format!("Cannot write {}: {}", dest.display(), e))
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<FetchedFile, FetchError> {
        debug!("GET {}", url);

        let response = self.client.get(url).send().await.map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| io_error(dest, e))?;
        let mut stream = response.bytes_stream();
        let mut size = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(request_error)?;
            file.write_all(&chunk).await.map_err(|e| io_error(dest, e))?;
            size += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| io_error(dest, e))?;

        Ok(FetchedFile { size, content_type })
    }

    async fn probe(&self, url: &str) -> Result<(), FetchError> {
        debug!("HEAD {}", url);

        let response = self.client.head(url).send().await.map_err(request_error)?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(FetchError::from_status(status.as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_user_agent() {
        assert!(ReqwestFetcher::new("bad\nagent").is_err());
        assert!(ReqwestFetcher::new("uploader/1.0").is_ok());
    }
}
