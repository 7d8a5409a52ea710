//! Mock ads platform for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::platform::{
    AdParams, AdSetParams, AdsPlatform, CampaignParams, CreativeParams, PlatformError,
    ResourceHandle, ResourceKind,
};
use crate::retry::OperationClass;

/// A recorded platform call for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformCall {
    CreateCampaign {
        account_id: String,
        params: CampaignParams,
    },
    CreateAdSet {
        account_id: String,
        params: AdSetParams,
    },
    CreateCreative {
        account_id: String,
        params: CreativeParams,
    },
    CreateAd {
        account_id: String,
        params: AdParams,
    },
    CreateImage {
        account_id: String,
        file: PathBuf,
    },
    CreateVideo {
        account_id: String,
        file: PathBuf,
    },
    Delete {
        kind: ResourceKind,
        id: String,
    },
}

impl PlatformCall {
    /// Retry class the call belongs to.
    pub fn class(&self) -> OperationClass {
        match self {
            PlatformCall::CreateCampaign { .. } => OperationClass::CreateCampaign,
            PlatformCall::CreateAdSet { .. } => OperationClass::CreateAdSet,
            PlatformCall::CreateCreative { .. } => OperationClass::CreateCreative,
            PlatformCall::CreateAd { .. } => OperationClass::CreateAd,
            PlatformCall::CreateImage { .. } => OperationClass::UploadImage,
            PlatformCall::CreateVideo { .. } => OperationClass::UploadVideo,
            PlatformCall::Delete { .. } => OperationClass::Delete,
        }
    }
}

/// Mock implementation of the AdsPlatform trait.
///
/// Provides controllable behavior for testing:
/// - Deterministic ids (`campaign-1`, `adset-1`, `creative-1`, `ad-1`,
///   `hash-1`, `video-1`), counted per kind over successful calls
/// - Every call recorded, successful or not
/// - One-shot and persistent failures per operation class
/// - Persistent delete failures per resource id
///
/// # Example
///
/// ```rust,ignore
/// let platform = Arc::new(MockAdsPlatform::new());
/// platform
///     .fail_next(OperationClass::CreateAdSet, PlatformError::permanent("Invalid"))
///     .await;
///
/// // ... run a saga ...
/// assert_eq!(platform.deleted().await.len(), 1);
/// ```
pub struct MockAdsPlatform {
    calls: Arc<RwLock<Vec<PlatformCall>>>,
    counters: Arc<RwLock<HashMap<&'static str, u32>>>,
    next_failures: Arc<RwLock<HashMap<OperationClass, VecDeque<PlatformError>>>>,
    persistent_failures: Arc<RwLock<HashMap<OperationClass, PlatformError>>>,
    delete_failures: Arc<RwLock<HashMap<String, PlatformError>>>,
    /// Created resources in creation order.
    created: Arc<RwLock<Vec<ResourceHandle>>>,
    /// Successfully deleted resources in deletion order.
    deleted: Arc<RwLock<Vec<ResourceHandle>>>,
    delay: Arc<RwLock<Duration>>,
}

impl std::fmt::Debug for MockAdsPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockAdsPlatform")
            .field("calls", &"<calls>")
            .field("next_failures", &"<next_failures>")
            .field("persistent_failures", &"<persistent_failures>")
            .field("delete_failures", &"<delete_failures>")
            .finish()
    }
}

impl Default for MockAdsPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAdsPlatform {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            counters: Arc::new(RwLock::new(HashMap::new())),
            next_failures: Arc::new(RwLock::new(HashMap::new())),
            persistent_failures: Arc::new(RwLock::new(HashMap::new())),
            delete_failures: Arc::new(RwLock::new(HashMap::new())),
            created: Arc::new(RwLock::new(Vec::new())),
            deleted: Arc::new(RwLock::new(Vec::new())),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    // =========================================================================
    // Failure injection
    // =========================================================================

    /// Fail the next call of `class` with `error`. Queued failures are
    /// consumed in order.
    pub async fn fail_next(&self, class: OperationClass, error: PlatformError) {
        self.next_failures
            .write()
            .await
            .entry(class)
            .or_default()
            .push_back(error);
    }

    /// Fail every call of `class` with `error`.
    pub async fn fail_always(&self, class: OperationClass, error: PlatformError) {
        self.persistent_failures.write().await.insert(class, error);
    }

    /// Fail every delete of resource `id`.
    pub async fn fail_delete(&self, id: &str, error: PlatformError) {
        self.delete_failures.write().await.insert(id.to_string(), error);
    }

    /// Delay every call by `delay`.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    // =========================================================================
    // Assertions
    // =========================================================================

    pub async fn calls(&self) -> Vec<PlatformCall> {
        self.calls.read().await.clone()
    }

    /// Number of calls made in `class`, failed ones included.
    pub async fn count(&self, class: OperationClass) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.class() == class)
            .count()
    }

    pub async fn campaigns(&self) -> Vec<CampaignParams> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|c| match c {
                PlatformCall::CreateCampaign { params, .. } => Some(params.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn ad_sets(&self) -> Vec<AdSetParams> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|c| match c {
                PlatformCall::CreateAdSet { params, .. } => Some(params.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn creatives(&self) -> Vec<CreativeParams> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|c| match c {
                PlatformCall::CreateCreative { params, .. } => Some(params.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn ads(&self) -> Vec<AdParams> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|c| match c {
                PlatformCall::CreateAd { params, .. } => Some(params.clone()),
                _ => None,
            })
            .collect()
    }

    /// Successfully deleted resources, in deletion order.
    pub async fn deleted(&self) -> Vec<ResourceHandle> {
        self.deleted.read().await.clone()
    }

    /// Hierarchy resources created and not deleted, in creation order.
    pub async fn live_resources(&self) -> Vec<ResourceHandle> {
        let deleted = self.deleted.read().await;
        self.created
            .read()
            .await
            .iter()
            .filter(|h| !deleted.contains(h))
            .cloned()
            .collect()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Record the call, apply the delay and return any injected failure.
    async fn begin(&self, call: PlatformCall) -> Result<(), PlatformError> {
        let class = call.class();
        let delete_id = match &call {
            PlatformCall::Delete { id, .. } => Some(id.clone()),
            _ => None,
        };
        self.calls.write().await.push(call);

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self
            .next_failures
            .write()
            .await
            .get_mut(&class)
            .and_then(VecDeque::pop_front)
        {
            return Err(error);
        }
        if let Some(error) = self.persistent_failures.read().await.get(&class) {
            return Err(error.clone());
        }
        if let Some(id) = delete_id {
            if let Some(error) = self.delete_failures.read().await.get(&id) {
                return Err(error.clone());
            }
        }
        Ok(())
    }

    async fn next_id(&self, prefix: &'static str) -> String {
        let mut counters = self.counters.write().await;
        let n = counters.entry(prefix).or_insert(0);
        *n += 1;
        format!("{}-{}", prefix, n)
    }

    async fn create(&self, kind: ResourceKind, prefix: &'static str) -> String {
        let id = self.next_id(prefix).await;
        self.created
            .write()
            .await
            .push(ResourceHandle::new(kind, id.clone()));
        id
    }
}

fn require_file(file: &Path) -> Result<(), PlatformError> {
    if file.is_file() {
        Ok(())
    } else {
        Err(PlatformError::Io(format!("{} does not exist", file.display())))
    }
}

#[async_trait]
impl AdsPlatform for MockAdsPlatform {
    async fn create_campaign(
        &self,
        account_id: &str,
        params: &CampaignParams,
    ) -> Result<String, PlatformError> {
        self.begin(PlatformCall::CreateCampaign {
            account_id: account_id.to_string(),
            params: params.clone(),
        })
        .await?;
        Ok(self.create(ResourceKind::Campaign, "campaign").await)
    }

    async fn create_ad_set(
        &self,
        account_id: &str,
        params: &AdSetParams,
    ) -> Result<String, PlatformError> {
        self.begin(PlatformCall::CreateAdSet {
            account_id: account_id.to_string(),
            params: params.clone(),
        })
        .await?;
        Ok(self.create(ResourceKind::AdSet, "adset").await)
    }

    async fn create_creative(
        &self,
        account_id: &str,
        params: &CreativeParams,
    ) -> Result<String, PlatformError> {
        self.begin(PlatformCall::CreateCreative {
            account_id: account_id.to_string(),
            params: params.clone(),
        })
        .await?;
        Ok(self.create(ResourceKind::Creative, "creative").await)
    }

    async fn create_ad(
        &self,
        account_id: &str,
        params: &AdParams,
    ) -> Result<String, PlatformError> {
        self.begin(PlatformCall::CreateAd {
            account_id: account_id.to_string(),
            params: params.clone(),
        })
        .await?;
        Ok(self.create(ResourceKind::Ad, "ad").await)
    }

    async fn create_image(&self, account_id: &str, file: &Path) -> Result<String, PlatformError> {
        self.begin(PlatformCall::CreateImage {
            account_id: account_id.to_string(),
            file: file.to_path_buf(),
        })
        .await?;
        require_file(file)?;
        Ok(self.next_id("hash").await)
    }

    async fn create_video(&self, account_id: &str, file: &Path) -> Result<String, PlatformError> {
        self.begin(PlatformCall::CreateVideo {
            account_id: account_id.to_string(),
            file: file.to_path_buf(),
        })
        .await?;
        require_file(file)?;
        Ok(self.next_id("video").await)
    }

    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<(), PlatformError> {
        self.begin(PlatformCall::Delete {
            kind,
            id: id.to_string(),
        })
        .await?;
        self.deleted
            .write()
            .await
            .push(ResourceHandle::new(kind, id));
        Ok(())
    }
}
