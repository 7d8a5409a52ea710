//! Graph API implementation of [`AdsPlatform`].

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::types::{AdParams, AdSetParams, CampaignParams, CreativeParams, ResourceKind};
use super::{AdsPlatform, PlatformError};

/// Connection settings for one Graph API access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphApiConfig {
    pub access_token: String,

    /// API version path segment, e.g. `v22.0`.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Base URL (default: https://graph.facebook.com).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Client-level ceiling; per-attempt deadlines come from the retry policy.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_api_version() -> String {
    "v22.0".to_string()
}

fn default_request_timeout() -> u64 {
    900
}

impl GraphApiConfig {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            api_version: default_api_version(),
            base_url: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Graph API client bound to one access token.
pub struct GraphApiClient {
    client: Client,
    base_url: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GraphErrorEnvelope {
    error: GraphErrorBody,
}

#[derive(Debug, Deserialize)]
struct GraphErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    error_subcode: Option<i64>,
    #[serde(default)]
    is_transient: bool,
    #[serde(default)]
    error_user_msg: Option<String>,
}

impl GraphApiClient {
    pub fn new(config: GraphApiConfig) -> Result<Self, PlatformError> {
        if config.access_token.is_empty() {
            return Err(PlatformError::permanent("Graph API access token is required"));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| PlatformError::permanent(format!("HTTP client setup failed: {}", e)))?;

        let base = config
            .base_url
            .unwrap_or_else(|| "https://graph.facebook.com".to_string());
        let base_url = format!("{}/{}", base.trim_end_matches('/'), config.api_version);

        Ok(Self {
            client,
            base_url,
            access_token: config.access_token,
        })
    }

    fn account_url(&self, account_id: &str, edge: &str) -> String {
        format!(
            "{}/act_{}/{}",
            self.base_url,
            account_id.trim_start_matches("act_"),
            edge
        )
    }

    async fn post_form(
        &self,
        url: &str,
        mut form: Vec<(&'static str, String)>,
    ) -> Result<Value, PlatformError> {
        debug!("Graph POST {}", url);
        form.push(("access_token", self.access_token.clone()));

        let response = self
            .client
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(transport_error)?;

        read_response(response).await
    }

    async fn post_file(
        &self,
        url: &str,
        field: &'static str,
        file: &Path,
    ) -> Result<Value, PlatformError> {
        let bytes = tokio::fs::read(file)
            .await
            .map_err(|e| PlatformError::Io(format!("{}: {}", file.display(), e)))?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        debug!("Graph upload {} ({} bytes) to {}", file_name, bytes.len(), url);

        let form = Form::new()
            .text("access_token", self.access_token.clone())
            .part(field, Part::bytes(bytes).file_name(file_name));

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;

        read_response(response).await
    }
}

fn transport_error(e: reqwest::Error) -> PlatformError {
    if e.is_builder() {
        PlatformError::permanent(format!("Invalid request: {}", e))
    } else {
        PlatformError::transient(format!("HTTP request failed: {}", e))
    }
}

async fn read_response(response: Response) -> Result<Value, PlatformError> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;

    if !status.is_success() {
        return Err(api_error(status.as_u16(), &body));
    }

    serde_json::from_str(&body)
        .map_err(|e| PlatformError::permanent(format!("Failed to parse response: {}", e)))
}

/// Classify a non-success response body.
pub(crate) fn api_error(status: u16, body: &str) -> PlatformError {
    match serde_json::from_str::<GraphErrorEnvelope>(body) {
        Ok(envelope) => {
            let err = envelope.error;
            let message = match err.error_user_msg {
                Some(user_msg) if !user_msg.is_empty() => {
                    format!("{} ({})", err.message, user_msg)
                }
                _ => err.message,
            };
            PlatformError::from_api(status, err.code, err.error_subcode, err.is_transient, message)
        }
        Err(_) => PlatformError::from_api(status, None, None, false, format!("HTTP {}: {}", status, body)),
    }
}

fn id_field(value: &Value) -> Result<String, PlatformError> {
    value
        .get("id")
        .and_then(|id| id.as_str().map(str::to_string).or_else(|| id.as_u64().map(|n| n.to_string())))
        .ok_or_else(|| PlatformError::permanent(format!("Response has no id: {}", value)))
}

fn image_hash(value: &Value) -> Result<String, PlatformError> {
    value
        .get("images")
        .and_then(Value::as_object)
        .and_then(|images| images.values().next())
        .and_then(|image| image.get("hash"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| PlatformError::permanent(format!("Response has no image hash: {}", value)))
}

pub(crate) fn campaign_form(params: &CampaignParams) -> Vec<(&'static str, String)> {
    vec![
        ("name", params.name.clone()),
        ("objective", params.objective.clone()),
        ("buying_type", params.buying_type.clone()),
        ("status", params.status.clone()),
        (
            "special_ad_categories",
            Value::from(params.special_ad_categories.clone()).to_string(),
        ),
    ]
}

pub(crate) fn ad_set_form(params: &AdSetParams) -> Vec<(&'static str, String)> {
    let mut form = vec![
        ("name", params.name.clone()),
        ("campaign_id", params.campaign_id.clone()),
        ("daily_budget", params.daily_budget.to_string()),
        ("billing_event", params.billing_event.clone()),
        ("bid_strategy", params.bid_strategy.clone()),
        ("optimization_goal", params.optimization_goal.clone()),
        ("targeting", params.targeting.to_json().to_string()),
        ("status", params.status.clone()),
    ];
    if let Some(promoted) = params.promoted_object() {
        form.push(("promoted_object", promoted.to_string()));
    }
    if let Some(beneficiary) = &params.beneficiary {
        form.push(("dsa_beneficiary", beneficiary.clone()));
    }
    if let Some(payor) = &params.payor {
        form.push(("dsa_payor", payor.clone()));
    }
    form
}

pub(crate) fn creative_form(params: &CreativeParams) -> Vec<(&'static str, String)> {
    let mut form = vec![
        ("name", params.name.clone()),
        ("object_story_spec", params.object_story_spec().to_string()),
    ];
    if params.uses_page_actor_override() {
        form.push(("use_page_actor_override", "true".to_string()));
    }
    form
}

pub(crate) fn ad_form(params: &AdParams) -> Vec<(&'static str, String)> {
    vec![
        ("name", params.name.clone()),
        ("adset_id", params.ad_set_id.clone()),
        (
            "creative",
            serde_json::json!({ "creative_id": params.creative_id }).to_string(),
        ),
        ("status", params.status.clone()),
    ]
}

#[async_trait]
impl AdsPlatform for GraphApiClient {
    async fn create_campaign(
        &self,
        account_id: &str,
        params: &CampaignParams,
    ) -> Result<String, PlatformError> {
        let url = self.account_url(account_id, "campaigns");
        let response = self.post_form(&url, campaign_form(params)).await?;
        id_field(&response)
    }

    async fn create_ad_set(
        &self,
        account_id: &str,
        params: &AdSetParams,
    ) -> Result<String, PlatformError> {
        let url = self.account_url(account_id, "adsets");
        let response = self.post_form(&url, ad_set_form(params)).await?;
        id_field(&response)
    }

    async fn create_creative(
        &self,
        account_id: &str,
        params: &CreativeParams,
    ) -> Result<String, PlatformError> {
        let url = self.account_url(account_id, "adcreatives");
        let response = self.post_form(&url, creative_form(params)).await?;
        id_field(&response)
    }

    async fn create_ad(
        &self,
        account_id: &str,
        params: &AdParams,
    ) -> Result<String, PlatformError> {
        let url = self.account_url(account_id, "ads");
        let response = self.post_form(&url, ad_form(params)).await?;
        id_field(&response)
    }

    async fn create_image(&self, account_id: &str, file: &Path) -> Result<String, PlatformError> {
        let url = self.account_url(account_id, "adimages");
        let response = self.post_file(&url, "filename", file).await?;
        image_hash(&response)
    }

    async fn create_video(&self, account_id: &str, file: &Path) -> Result<String, PlatformError> {
        let url = self.account_url(account_id, "advideos");
        let response = self.post_file(&url, "source", file).await?;
        id_field(&response)
    }

    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<(), PlatformError> {
        let url = format!("{}/{}", self.base_url, id);
        debug!("Graph DELETE {} {}", kind, id);

        let response = self
            .client
            .delete(&url)
            .query(&[("access_token", &self.access_token)])
            .send()
            .await
            .map_err(transport_error)?;

        read_response(response).await.map(|_| ())
    }
}
