//! Resource creation saga.
//!
//! One saga per [`UploadTask`]:
//! - campaign, then one ad set per targeting group, strictly in order
//! - each media item is resolved, uploaded and turned into a creative plus
//!   one ad per ad set; item failures are recorded and skipped
//! - any fatal error after the first remote resource triggers compensation

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::compensation::{compensate, CompensationResult};
use super::config::CreationDefaults;
use super::creative::{build_ad, build_creative, UploadedMedia};
use super::error::{ItemError, SagaError};
use super::state::{SagaState, SagaStateMachine};
use crate::campaign::{
    landing_url, normalize_countries, resolve_budget, TargetingConfig, UploadResult, UploadTask,
    ValidationError,
};
use crate::media::{MediaFetchError, MediaItem, MediaKind, MediaLocation, MediaResolver};
use crate::metrics;
use crate::platform::{
    AdSetParams, AdsPlatform, CampaignParams, ImageRef, ResourceHandle, ResourceKind,
};
use crate::retry::{OperationClass, RetryExecutor};
use crate::scheduler::TaskRunner;
use crate::thumbnail::ThumbnailExtractor;

/// A media item that was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub index: usize,
    pub reference: String,
    pub stage: &'static str,
    pub message: String,
}

/// Everything a saga did, for logging and result reporting.
#[derive(Debug, Clone, Serialize)]
pub struct SagaReport {
    pub row_id: u32,
    pub final_state: SagaState,
    pub history: Vec<SagaState>,
    pub campaign_id: Option<String>,
    pub ad_ids: Vec<String>,
    pub item_errors: Vec<ItemFailure>,
    /// Error that ended the saga, if it failed.
    pub error: Option<String>,
    pub compensation: Option<CompensationResult>,
}

impl SagaReport {
    pub fn is_success(&self) -> bool {
        self.final_state == SagaState::Completed
    }

    pub fn to_result(&self) -> UploadResult {
        match (&self.campaign_id, self.is_success()) {
            (Some(campaign_id), true) => {
                UploadResult::success(self.row_id, campaign_id.clone(), self.ad_ids.clone())
            }
            _ => UploadResult::failed(
                self.row_id,
                self.error
                    .clone()
                    .unwrap_or_else(|| format!("Saga ended in {}", self.final_state)),
            ),
        }
    }
}

/// Mutable state owned by one saga.
struct Progress {
    machine: SagaStateMachine,
    handles: Vec<ResourceHandle>,
    campaign_id: Option<String>,
    ad_ids: Vec<String>,
    item_errors: Vec<ItemFailure>,
}

impl Progress {
    fn new() -> Self {
        Self {
            machine: SagaStateMachine::new(),
            handles: Vec::new(),
            campaign_id: None,
            ad_ids: Vec::new(),
            item_errors: Vec::new(),
        }
    }

    fn advance(&mut self, next: SagaState) {
        if let Err(e) = self.machine.transition(next) {
            error!("{}", e);
        }
    }
}

/// Resources created by one successful item.
struct ItemOutcome {
    handles: Vec<ResourceHandle>,
    ad_ids: Vec<String>,
}

/// Runs sagas. Shared by every worker; holds no per-task state.
pub struct SagaRunner {
    platforms: HashMap<String, Arc<dyn AdsPlatform>>,
    retry: RetryExecutor,
    resolver: Arc<MediaResolver>,
    thumbnails: Arc<ThumbnailExtractor>,
    defaults: CreationDefaults,
    targeting: TargetingConfig,
}

impl SagaRunner {
    pub fn new(
        retry: RetryExecutor,
        resolver: Arc<MediaResolver>,
        thumbnails: Arc<ThumbnailExtractor>,
        defaults: CreationDefaults,
        targeting: TargetingConfig,
    ) -> Self {
        Self {
            platforms: HashMap::new(),
            retry,
            resolver,
            thumbnails,
            defaults,
            targeting,
        }
    }

    /// Register the client used for tasks with this platform key.
    pub fn with_platform(mut self, key: &str, client: Arc<dyn AdsPlatform>) -> Self {
        self.platforms.insert(key.trim().to_lowercase(), client);
        self
    }

    pub fn platform_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.platforms.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    fn platform(&self, key: &str) -> Option<Arc<dyn AdsPlatform>> {
        self.platforms.get(&key.trim().to_lowercase()).cloned()
    }

    /// Run one saga to a terminal state.
    pub async fn run_saga(&self, task: &UploadTask) -> SagaReport {
        let span = info_span!("saga", row = task.row_id, campaign = %task.campaign_name);
        self.run_in_span(task).instrument(span).await
    }

    async fn run_in_span(&self, task: &UploadTask) -> SagaReport {
        let started = Instant::now();
        let mut progress = Progress::new();

        let (outcome, compensation) = match self.platform(&task.platform) {
            None => (Err(SagaError::UnknownPlatform(task.platform.clone())), None),
            Some(platform) => {
                let outcome = self.forward(platform.as_ref(), task, &mut progress).await;
                let compensation = match &outcome {
                    Err(_) if !progress.handles.is_empty() => {
                        progress.advance(SagaState::Compensating);
                        info!(
                            "Compensating {} created resource(s)",
                            progress.handles.len()
                        );
                        let result =
                            compensate(platform.as_ref(), &self.retry, &progress.handles).await;
                        progress.advance(SagaState::Compensated);
                        Some(result)
                    }
                    _ => None,
                };
                (outcome, compensation)
            }
        };

        let error = match outcome {
            Ok(()) => None,
            Err(e) => {
                progress.advance(SagaState::Failed);
                Some(e.to_string())
            }
        };

        let status = if error.is_none() { "success" } else { "failed" };
        metrics::SAGA_OUTCOMES.with_label_values(&[status]).inc();
        metrics::SAGA_DURATION
            .with_label_values(&[status])
            .observe(started.elapsed().as_secs_f64());

        match &error {
            None => info!(
                ads = progress.ad_ids.len(),
                skipped_items = progress.item_errors.len(),
                "Saga completed"
            ),
            Some(e) => error!(error = %e, "Saga failed"),
        }

        SagaReport {
            row_id: task.row_id,
            final_state: progress.machine.state(),
            history: progress.machine.into_history(),
            campaign_id: progress.campaign_id,
            ad_ids: progress.ad_ids,
            item_errors: progress.item_errors,
            error,
            compensation,
        }
    }

    /// Forward steps. Every created resource is recorded in `progress`
    /// before the next step starts.
    async fn forward(
        &self,
        platform: &dyn AdsPlatform,
        task: &UploadTask,
        progress: &mut Progress,
    ) -> Result<(), SagaError> {
        task.spec.validate()?;

        let codes = normalize_countries(&task.spec.country);
        if codes.is_empty() {
            return Err(ValidationError::missing("country").into());
        }
        let (beneficiary, payor) = self.regulated_parties(task, &codes)?;
        let daily_budget = resolve_budget(
            task.spec.budget.as_deref(),
            self.defaults.ad_set.daily_budget,
        );

        let campaign = CampaignParams {
            name: task.campaign_name.clone(),
            objective: self.defaults.campaign.objective.clone(),
            buying_type: self.defaults.campaign.buying_type.clone(),
            status: self.defaults.campaign.status.clone(),
            special_ad_categories: task.spec.special_categories.clone(),
        };
        let campaign_id = self
            .retry
            .execute(OperationClass::CreateCampaign, |_| {
                platform.create_campaign(&task.account_id, &campaign)
            })
            .await
            .map_err(|e| SagaError::remote(ResourceKind::Campaign, e))?;
        debug!(campaign_id = %campaign_id, "Created campaign");
        progress
            .handles
            .push(ResourceHandle::new(ResourceKind::Campaign, &campaign_id));
        progress.campaign_id = Some(campaign_id.clone());
        progress.advance(SagaState::CampaignCreated);

        let groups = self.targeting.ad_set_groups(&codes);
        let mut ad_set_ids = Vec::with_capacity(groups.len());
        for group in &groups {
            let name = if groups.len() == 1 {
                task.campaign_name.clone()
            } else {
                format!("{}_{}", task.campaign_name, group.join("-"))
            };
            let ad_set = AdSetParams {
                name,
                campaign_id: campaign_id.clone(),
                daily_budget,
                billing_event: self.defaults.ad_set.billing_event.clone(),
                bid_strategy: self.defaults.ad_set.bid_strategy.clone(),
                optimization_goal: self.defaults.ad_set.optimization_goal.clone(),
                custom_event_type: self.defaults.ad_set.custom_event_type.clone(),
                pixel_id: task.pixel_id.clone(),
                targeting: self.targeting.build(group, task.spec.device_targeting),
                status: self.defaults.ad_set.status.clone(),
                beneficiary: beneficiary.clone(),
                payor: payor.clone(),
            };
            let ad_set_id = self
                .retry
                .execute(OperationClass::CreateAdSet, |_| {
                    platform.create_ad_set(&task.account_id, &ad_set)
                })
                .await
                .map_err(|e| SagaError::remote(ResourceKind::AdSet, e))?;
            debug!(ad_set_id = %ad_set_id, countries = ?group, "Created ad set");
            progress
                .handles
                .push(ResourceHandle::new(ResourceKind::AdSet, &ad_set_id));
            ad_set_ids.push(ad_set_id);
        }
        progress.advance(SagaState::AdsetCreated);
        progress.advance(SagaState::ItemsProcessing);

        for (index, reference) in task.spec.media.iter().enumerate() {
            let span = info_span!("item", index);
            let outcome = self
                .process_item(platform, task, index, reference, &ad_set_ids)
                .instrument(span)
                .await;
            match outcome {
                Ok(created) => {
                    progress.handles.extend(created.handles);
                    progress.ad_ids.extend(created.ad_ids);
                }
                Err(e) => {
                    warn!(index, reference = %reference, error = %e, "Skipping media item");
                    metrics::ITEM_FAILURES.with_label_values(&[e.stage()]).inc();
                    progress.item_errors.push(ItemFailure {
                        index,
                        reference: reference.clone(),
                        stage: e.stage(),
                        message: e.to_string(),
                    });
                }
            }
        }

        if progress.ad_ids.is_empty() {
            let reason = match progress.item_errors.last() {
                Some(last) => format!("no ads created; last error: {}", last.message),
                None => "no ads created".to_string(),
            };
            return Err(SagaError::aborted(reason));
        }

        progress.advance(SagaState::Completed);
        Ok(())
    }

    /// Beneficiary and payor, required only for regulated targeting.
    fn regulated_parties(
        &self,
        task: &UploadTask,
        codes: &[String],
    ) -> Result<(Option<String>, Option<String>), ValidationError> {
        if !self.targeting.is_regulated(codes) {
            return Ok((None, None));
        }
        let pick = |row: &Option<String>, fallback: &Option<String>| {
            row.as_ref()
                .or(fallback.as_ref())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let beneficiary = pick(&task.spec.beneficiary, &self.defaults.ad_set.beneficiary)
            .ok_or_else(|| ValidationError::missing("beneficiary"))?;
        let payor = pick(&task.spec.payor, &self.defaults.ad_set.payor)
            .ok_or_else(|| ValidationError::missing("payor"))?;
        Ok((Some(beneficiary), Some(payor)))
    }

    async fn process_item(
        &self,
        platform: &dyn AdsPlatform,
        task: &UploadTask,
        index: usize,
        reference: &str,
        ad_set_ids: &[String],
    ) -> Result<ItemOutcome, ItemError> {
        let item = self.resolver.resolve(reference, task.spec.media_type).await?;
        let uploaded = self.upload_media(platform, task, &item).await;
        item.release().await;
        let uploaded = uploaded?;

        let base = task
            .spec
            .landing_page
            .as_deref()
            .unwrap_or(&self.defaults.landing_page_prefix);
        let link = landing_url(base, &task.spec.landing_query, index);

        let creative = build_creative(task, &self.defaults.ad, index, uploaded, &link);
        let creative_id = self
            .retry
            .execute(OperationClass::CreateCreative, |_| {
                platform.create_creative(&task.account_id, &creative)
            })
            .await
            .map_err(ItemError::Creative)?;
        debug!(creative_id = %creative_id, "Created creative");

        let mut handles = vec![ResourceHandle::new(ResourceKind::Creative, &creative_id)];
        let mut ad_ids = Vec::with_capacity(ad_set_ids.len());
        for ad_set_id in ad_set_ids {
            let ad = build_ad(task, &self.defaults.ad, index, ad_set_id, &creative_id);
            let created = self
                .retry
                .execute(OperationClass::CreateAd, |_| {
                    platform.create_ad(&task.account_id, &ad)
                })
                .await;
            match created {
                Ok(ad_id) => {
                    debug!(ad_id = %ad_id, "Created ad");
                    handles.push(ResourceHandle::new(ResourceKind::Ad, &ad_id));
                    ad_ids.push(ad_id);
                }
                Err(e) => {
                    let cleanup = compensate(platform, &self.retry, &handles).await;
                    if !cleanup.success {
                        warn!("Item cleanup left {} resource(s)", cleanup.errors.len());
                    }
                    return Err(ItemError::Ad(e));
                }
            }
        }

        Ok(ItemOutcome { handles, ad_ids })
    }

    async fn upload_media(
        &self,
        platform: &dyn AdsPlatform,
        task: &UploadTask,
        item: &MediaItem,
    ) -> Result<UploadedMedia, ItemError> {
        match (item.kind, &item.location) {
            (MediaKind::Image, MediaLocation::Url(url)) => {
                Ok(UploadedMedia::Image(ImageRef::Url(url.clone())))
            }
            (MediaKind::Image, MediaLocation::File(artifact)) => {
                let hash = self.upload_image(platform, task, artifact.path()).await?;
                Ok(UploadedMedia::Image(ImageRef::Hash(hash)))
            }
            (MediaKind::Video, MediaLocation::File(artifact)) => {
                let path = artifact.path();
                let video_id = self
                    .retry
                    .execute(OperationClass::UploadVideo, |_| {
                        platform.create_video(&task.account_id, path)
                    })
                    .await
                    .map_err(ItemError::Upload)?;
                debug!(video_id = %video_id, "Uploaded video");
                let thumbnail = self.upload_thumbnail(platform, task, path).await;
                Ok(UploadedMedia::Video {
                    video_id,
                    thumbnail,
                })
            }
            (MediaKind::Video, MediaLocation::Url(_)) => Err(ItemError::Media(
                MediaFetchError::invalid(&item.raw, "video must be uploaded from a file"),
            )),
        }
    }

    async fn upload_image(
        &self,
        platform: &dyn AdsPlatform,
        task: &UploadTask,
        path: &Path,
    ) -> Result<String, ItemError> {
        self.retry
            .execute(OperationClass::UploadImage, |_| {
                platform.create_image(&task.account_id, path)
            })
            .await
            .map_err(ItemError::Upload)
    }

    /// Extract and upload a poster frame. Failures leave the creative
    /// without a thumbnail.
    async fn upload_thumbnail(
        &self,
        platform: &dyn AdsPlatform,
        task: &UploadTask,
        video: &Path,
    ) -> Option<ImageRef> {
        let artifact = self.thumbnails.extract(video).await?;
        let uploaded = self.upload_image(platform, task, artifact.path()).await;
        artifact.release().await;
        match uploaded {
            Ok(hash) => Some(ImageRef::Hash(hash)),
            Err(e) => {
                warn!("Thumbnail upload failed, continuing without: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl TaskRunner for SagaRunner {
    async fn run(&self, task: UploadTask) -> UploadResult {
        self.run_saga(&task).await.to_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PlatformError;
    use crate::testing::{fixtures, MockAdsPlatform, MockFetcher, PlatformCall};

    struct Harness {
        platform: Arc<MockAdsPlatform>,
        fetcher: Arc<MockFetcher>,
        runner: SagaRunner,
        _temp: tempfile::TempDir,
    }

    fn harness() -> Harness {
        let temp = tempfile::tempdir().unwrap();
        let platform = Arc::new(MockAdsPlatform::new());
        let fetcher = Arc::new(MockFetcher::new());
        let runner = fixtures::saga_runner(platform.clone(), fetcher.clone(), temp.path());
        Harness {
            platform,
            fetcher,
            runner,
            _temp: temp,
        }
    }

    #[tokio::test]
    async fn test_single_image_success() {
        let h = harness();
        h.fetcher
            .set_body("https://cdn.test/a.jpg", fixtures::JPEG_BYTES.to_vec())
            .await;
        let task = fixtures::task(2, vec!["https://cdn.test/a.jpg"]);

        let report = h.runner.run_saga(&task).await;

        assert!(report.is_success(), "{:?}", report.error);
        assert_eq!(report.ad_ids.len(), 1);
        assert_eq!(
            report.history,
            vec![
                SagaState::Pending,
                SagaState::CampaignCreated,
                SagaState::AdsetCreated,
                SagaState::ItemsProcessing,
                SagaState::Completed,
            ]
        );
        let result = report.to_result();
        assert_eq!(result.detail, report.campaign_id.clone().unwrap());
        assert!(h.platform.deleted().await.is_empty());
    }

    #[tokio::test]
    async fn test_validation_failure_makes_no_calls() {
        let h = harness();
        let mut task = fixtures::task(3, vec!["https://cdn.test/a.jpg"]);
        task.spec.title.clear();

        let report = h.runner.run_saga(&task).await;

        assert_eq!(report.final_state, SagaState::Failed);
        assert_eq!(report.error.as_deref(), Some("Missing required field: title"));
        assert!(h.platform.calls().await.is_empty());
        assert!(report.compensation.is_none());
    }

    #[tokio::test]
    async fn test_regulated_targeting_requires_parties() {
        let h = harness();
        let mut task = fixtures::task(2, vec!["https://cdn.test/a.jpg"]);
        task.spec.country = "Germany".to_string();

        let report = h.runner.run_saga(&task).await;
        assert_eq!(report.error.as_deref(), Some("Missing required field: beneficiary"));
        assert!(h.platform.calls().await.is_empty());

        h.fetcher
            .set_body("https://cdn.test/a.jpg", fixtures::JPEG_BYTES.to_vec())
            .await;
        task.spec = task.spec.with_regulated_fields("Acme", "Acme Ltd");
        let report = h.runner.run_saga(&task).await;
        assert!(report.is_success());
        let ad_sets = h.platform.ad_sets().await;
        assert_eq!(ad_sets[0].beneficiary.as_deref(), Some("Acme"));
        assert_eq!(ad_sets[0].payor.as_deref(), Some("Acme Ltd"));
    }

    #[tokio::test]
    async fn test_ad_set_failure_deletes_campaign() {
        let h = harness();
        h.platform
            .fail_next(
                OperationClass::CreateAdSet,
                PlatformError::permanent("Invalid parameter"),
            )
            .await;
        let task = fixtures::task(2, vec!["https://cdn.test/a.jpg"]);

        let report = h.runner.run_saga(&task).await;

        assert_eq!(report.final_state, SagaState::Failed);
        assert!(report.history.contains(&SagaState::Compensated));
        assert!(report.error.unwrap().contains("Invalid parameter"));
        let deleted = h.platform.deleted().await;
        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0].kind, ResourceKind::Campaign);
    }

    #[tokio::test]
    async fn test_failed_ad_removes_item_creative() {
        let h = harness();
        h.fetcher
            .set_body("https://cdn.test/a.jpg", fixtures::JPEG_BYTES.to_vec())
            .await;
        h.fetcher
            .set_body("https://cdn.test/b.jpg", fixtures::JPEG_BYTES.to_vec())
            .await;
        h.platform
            .fail_next(OperationClass::CreateAd, PlatformError::permanent("Ad rejected"))
            .await;
        let task = fixtures::task(2, vec!["https://cdn.test/a.jpg", "https://cdn.test/b.jpg"]);

        let report = h.runner.run_saga(&task).await;

        assert!(report.is_success());
        assert_eq!(report.ad_ids.len(), 1);
        assert_eq!(report.item_errors.len(), 1);
        assert_eq!(report.item_errors[0].stage, "ad");
        let deleted = h.platform.deleted().await;
        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0].kind, ResourceKind::Creative);
    }

    #[tokio::test]
    async fn test_video_gets_thumbnail() {
        let h = harness();
        h.fetcher
            .set_body("https://cdn.test/clip.mp4", b"not really a video".to_vec())
            .await;
        let task = fixtures::task(2, vec!["https://cdn.test/clip.mp4"]);

        let report = h.runner.run_saga(&task).await;

        assert!(report.is_success(), "{:?}", report.error);
        let calls = h.platform.calls().await;
        assert!(calls.iter().any(|c| matches!(c, PlatformCall::CreateVideo { .. })));
        assert!(calls.iter().any(|c| matches!(c, PlatformCall::CreateImage { .. })));
        let creative = &h.platform.creatives().await[0];
        let spec = creative.object_story_spec();
        assert!(spec["video_data"]["image_hash"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_platform() {
        let h = harness();
        let mut task = fixtures::task(2, vec!["https://cdn.test/a.jpg"]);
        task.platform = "tiktok".to_string();

        let report = h.runner.run_saga(&task).await;
        assert_eq!(report.final_state, SagaState::Failed);
        assert!(report.error.unwrap().contains("tiktok"));
    }
}
