//! Campaign specs, upload tasks and results.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::media::MediaKind;

/// Device targeting override.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceTargeting {
    #[default]
    All,
    AndroidOnly,
    IosOnly,
}

impl DeviceTargeting {
    /// Parse a row value; anything unrecognized targets all devices.
    pub fn parse(value: &str) -> Self {
        let normalized = value.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "android_only" | "android" => DeviceTargeting::AndroidOnly,
            "ios_only" | "ios" | "iphone" => DeviceTargeting::IosOnly,
            _ => DeviceTargeting::All,
        }
    }
}

/// A required spec field that is missing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Missing required field: {field}")]
pub struct ValidationError {
    pub field: &'static str,
}

impl ValidationError {
    pub fn missing(field: &'static str) -> Self {
        Self { field }
    }
}

/// What one input row asks to be created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignSpec {
    pub topic: String,
    /// Country name or code, comma-separated list, or "worldwide".
    pub country: String,
    pub title: String,
    pub body: String,
    pub landing_query: String,
    /// Raw media references, in input order.
    pub media: Vec<String>,
    #[serde(default)]
    pub media_type: Option<MediaKind>,
    /// Budget in major currency units, as written in the row.
    #[serde(default)]
    pub budget: Option<String>,
    #[serde(default)]
    pub device_targeting: DeviceTargeting,
    #[serde(default)]
    pub special_categories: Vec<String>,
    #[serde(default)]
    pub beneficiary: Option<String>,
    #[serde(default)]
    pub payor: Option<String>,
    /// Alternate social identity shown on creatives.
    #[serde(default)]
    pub social_identity_id: Option<String>,
    #[serde(default)]
    pub hash_id: Option<String>,
    /// Overrides the configured landing page prefix.
    #[serde(default)]
    pub landing_page: Option<String>,
}

impl CampaignSpec {
    pub fn new(
        topic: impl Into<String>,
        country: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        landing_query: impl Into<String>,
        media: Vec<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            country: country.into(),
            title: title.into(),
            body: body.into(),
            landing_query: landing_query.into(),
            media,
            media_type: None,
            budget: None,
            device_targeting: DeviceTargeting::All,
            special_categories: Vec::new(),
            beneficiary: None,
            payor: None,
            social_identity_id: None,
            hash_id: None,
            landing_page: None,
        }
    }

    pub fn with_budget(mut self, budget: impl Into<String>) -> Self {
        self.budget = Some(budget.into());
        self
    }

    pub fn with_device_targeting(mut self, targeting: DeviceTargeting) -> Self {
        self.device_targeting = targeting;
        self
    }

    pub fn with_regulated_fields(
        mut self,
        beneficiary: impl Into<String>,
        payor: impl Into<String>,
    ) -> Self {
        self.beneficiary = Some(beneficiary.into());
        self.payor = Some(payor.into());
        self
    }

    pub fn with_media_type(mut self, kind: MediaKind) -> Self {
        self.media_type = Some(kind);
        self
    }

    /// Check the fields every campaign needs.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("topic", &self.topic),
            ("country", &self.country),
            ("title", &self.title),
            ("body", &self.body),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::missing(name));
            }
        }
        if self.media.iter().all(|m| m.trim().is_empty()) {
            return Err(ValidationError::missing("media"));
        }
        Ok(())
    }
}

/// One unit of work for the scheduler. Built by the planner, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadTask {
    pub row_id: u32,
    pub spec: CampaignSpec,
    /// Key of the configured platform client.
    pub platform: String,
    pub account_id: String,
    pub page_id: String,
    pub pixel_id: Option<String>,
    /// Platform-level default for the alternate social identity.
    pub social_identity_id: Option<String>,
    /// Deterministic name shared by the campaign hierarchy.
    pub campaign_name: String,
}

/// Terminal status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Success,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Success => "SUCCESS",
            TaskStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one task. Exactly one per task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    pub row_id: u32,
    pub status: TaskStatus,
    /// Campaign id on success, error summary on failure.
    pub detail: String,
    #[serde(default)]
    pub campaign_id: Option<String>,
    #[serde(default)]
    pub ad_ids: Vec<String>,
}

impl UploadResult {
    pub fn success(row_id: u32, campaign_id: impl Into<String>, ad_ids: Vec<String>) -> Self {
        let campaign_id = campaign_id.into();
        Self {
            row_id,
            status: TaskStatus::Success,
            detail: campaign_id.clone(),
            campaign_id: Some(campaign_id),
            ad_ids,
        }
    }

    pub fn failed(row_id: u32, detail: impl Into<String>) -> Self {
        Self {
            row_id,
            status: TaskStatus::Failed,
            detail: detail.into(),
            campaign_id: None,
            ad_ids: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Success
    }
}
