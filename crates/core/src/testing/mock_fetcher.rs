//! Mock HTTP fetcher for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::media::{FetchError, FetchedFile, HttpFetcher};

/// Mock implementation of the HttpFetcher trait.
///
/// Responses are configured per URL:
/// - queued responses (`push_body`, `push_error`) are consumed first, in order
/// - then a persistent error (`set_error`)
/// - then a persistent body (`set_body`)
/// - anything else answers `HTTP 404`
///
/// The destination file is written only when a body is returned.
///
/// # Example
///
/// ```rust,ignore
/// let fetcher = MockFetcher::new();
/// fetcher.push_body(url, Vec::new()).await;        // empty first attempt
/// fetcher.push_body(url, b"video".to_vec()).await; // then the real body
///
/// // ... resolve ...
/// assert_eq!(fetcher.fetch_count(url).await, 2);
/// ```
pub struct MockFetcher {
    bodies: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    queued: Arc<RwLock<HashMap<String, VecDeque<Result<Vec<u8>, FetchError>>>>>,
    errors: Arc<RwLock<HashMap<String, FetchError>>>,
    probe_errors: Arc<RwLock<HashMap<String, FetchError>>>,
    /// Download attempts per URL. Probes are not counted.
    fetches: Arc<RwLock<HashMap<String, usize>>>,
}

impl std::fmt::Debug for MockFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockFetcher")
            .field("bodies", &"<bodies>")
            .field("queued", &"<queued>")
            .field("errors", &"<errors>")
            .finish()
    }
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            bodies: Arc::new(RwLock::new(HashMap::new())),
            queued: Arc::new(RwLock::new(HashMap::new())),
            errors: Arc::new(RwLock::new(HashMap::new())),
            probe_errors: Arc::new(RwLock::new(HashMap::new())),
            fetches: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Body returned for every download of `url`.
    pub async fn set_body(&self, url: &str, body: Vec<u8>) {
        self.bodies.write().await.insert(url.to_string(), body);
    }

    /// Queue a one-shot body for `url`.
    pub async fn push_body(&self, url: &str, body: Vec<u8>) {
        self.queued
            .write()
            .await
            .entry(url.to_string())
            .or_default()
            .push_back(Ok(body));
    }

    /// Every download of `url` fails with `error`.
    pub async fn set_error(&self, url: &str, error: FetchError) {
        self.errors.write().await.insert(url.to_string(), error);
    }

    /// Queue a one-shot failure for `url`.
    pub async fn push_error(&self, url: &str, error: FetchError) {
        self.queued
            .write()
            .await
            .entry(url.to_string())
            .or_default()
            .push_back(Err(error));
    }

    /// Make `probe(url)` fail even when a body is configured.
    pub async fn set_probe_error(&self, url: &str, error: FetchError) {
        self.probe_errors.write().await.insert(url.to_string(), error);
    }

    /// Number of download attempts made for `url`.
    pub async fn fetch_count(&self, url: &str) -> usize {
        self.fetches.read().await.get(url).copied().unwrap_or(0)
    }

    /// Download attempts across every URL.
    pub async fn total_fetches(&self) -> usize {
        self.fetches.read().await.values().sum()
    }

    async fn next_response(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if let Some(queued) = self
            .queued
            .write()
            .await
            .get_mut(url)
            .and_then(VecDeque::pop_front)
        {
            return queued;
        }
        if let Some(error) = self.errors.read().await.get(url) {
            return Err(error.clone());
        }
        self.bodies
            .read()
            .await
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Permanent("HTTP 404".to_string()))
    }
}

fn content_type(body: &[u8]) -> Option<String> {
    let head = String::from_utf8_lossy(&body[..body.len().min(64)]).to_ascii_lowercase();
    if head.trim_start().starts_with("<html") || head.trim_start().starts_with("<!doctype html") {
        Some("text/html; charset=utf-8".to_string())
    } else {
        None
    }
}

#[async_trait]
impl HttpFetcher for MockFetcher {
    async fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<FetchedFile, FetchError> {
        *self.fetches.write().await.entry(url.to_string()).or_insert(0) += 1;

        let body = self.next_response(url).await?;
        tokio::fs::write(dest, &body)
            .await
            .map_err(|e| FetchError::Permanent(format!("Cannot write {}: {}", dest.display(), e)))?;

        Ok(FetchedFile {
            size: body.len() as u64,
            content_type: content_type(&body),
        })
    }

    async fn probe(&self, url: &str) -> Result<(), FetchError> {
        if let Some(error) = self.probe_errors.read().await.get(url) {
            return Err(error.clone());
        }
        let configured = self.bodies.read().await.contains_key(url)
            || self
                .queued
                .read()
                .await
                .get(url)
                .is_some_and(|q| q.iter().any(Result::is_ok));
        if configured {
            Ok(())
        } else {
            Err(FetchError::Permanent("HTTP 404".to_string()))
        }
    }
}
