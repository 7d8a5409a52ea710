//! Retry policies keyed by operation class.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Class of remote operation a retry policy applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationClass {
    CreateCampaign,
    CreateAdSet,
    CreateCreative,
    CreateAd,
    UploadImage,
    UploadVideo,
    FetchImage,
    FetchVideo,
    ProbeMedia,
    Delete,
}

impl OperationClass {
    /// Every operation class, in table order.
    pub const ALL: [OperationClass; 10] = [
        OperationClass::CreateCampaign,
        OperationClass::CreateAdSet,
        OperationClass::CreateCreative,
        OperationClass::CreateAd,
        OperationClass::UploadImage,
        OperationClass::UploadVideo,
        OperationClass::FetchImage,
        OperationClass::FetchVideo,
        OperationClass::ProbeMedia,
        OperationClass::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationClass::CreateCampaign => "create_campaign",
            OperationClass::CreateAdSet => "create_ad_set",
            OperationClass::CreateCreative => "create_creative",
            OperationClass::CreateAd => "create_ad",
            OperationClass::UploadImage => "upload_image",
            OperationClass::UploadVideo => "upload_video",
            OperationClass::FetchImage => "fetch_image",
            OperationClass::FetchVideo => "fetch_video",
            OperationClass::ProbeMedia => "probe_media",
            OperationClass::Delete => "delete",
        }
    }

    /// Whether this class downloads media bytes.
    pub fn is_fetch(&self) -> bool {
        matches!(self, OperationClass::FetchImage | OperationClass::FetchVideo)
    }
}

impl fmt::Display for OperationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounded-attempt policy with linearly growing per-attempt timeout.
///
/// Attempt `n` (1-based) runs with a timeout of
/// `base_timeout_ms + (n - 1) * timeout_step_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of calls to the wrapped operation.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Timeout of the first attempt in milliseconds.
    #[serde(default = "default_base_timeout_ms")]
    pub base_timeout_ms: u64,

    /// Timeout added for every further attempt in milliseconds.
    #[serde(default = "default_timeout_step_ms")]
    pub timeout_step_ms: u64,

    /// Pause between attempts in milliseconds.
    #[serde(default = "default_pause_ms")]
    pub pause_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_timeout_ms() -> u64 {
    60_000
}

fn default_timeout_step_ms() -> u64 {
    30_000
}

fn default_pause_ms() -> u64 {
    2_000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_timeout_ms: default_base_timeout_ms(),
            timeout_step_ms: default_timeout_step_ms(),
            pause_ms: default_pause_ms(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_timeout: Duration, timeout_step: Duration) -> Self {
        Self {
            max_attempts,
            base_timeout_ms: base_timeout.as_millis() as u64,
            timeout_step_ms: timeout_step.as_millis() as u64,
            pause_ms: default_pause_ms(),
        }
    }

    /// Set the pause between attempts.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause_ms = pause.as_millis() as u64;
        self
    }

    /// Number of attempts actually made; a zero budget still runs once.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Timeout for the given 1-based attempt number.
    pub fn timeout_for(&self, attempt: u32) -> Duration {
        let growth = self
            .timeout_step_ms
            .saturating_mul(u64::from(attempt.saturating_sub(1)));
        Duration::from_millis(self.base_timeout_ms.saturating_add(growth))
    }

    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }
}

/// Static retry policy table, one entry per [`OperationClass`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicyTable {
    #[serde(default = "default_create_policy")]
    pub create_campaign: RetryPolicy,

    #[serde(default = "default_create_policy")]
    pub create_ad_set: RetryPolicy,

    #[serde(default = "default_create_policy")]
    pub create_creative: RetryPolicy,

    #[serde(default = "default_create_policy")]
    pub create_ad: RetryPolicy,

    #[serde(default = "default_upload_image_policy")]
    pub upload_image: RetryPolicy,

    #[serde(default = "default_upload_video_policy")]
    pub upload_video: RetryPolicy,

    #[serde(default = "default_fetch_image_policy")]
    pub fetch_image: RetryPolicy,

    #[serde(default = "default_fetch_video_policy")]
    pub fetch_video: RetryPolicy,

    #[serde(default = "default_probe_policy")]
    pub probe_media: RetryPolicy,

    #[serde(default = "default_delete_policy")]
    pub delete: RetryPolicy,
}

fn policy(max_attempts: u32, base_ms: u64, step_ms: u64, pause_ms: u64) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_timeout_ms: base_ms,
        timeout_step_ms: step_ms,
        pause_ms,
    }
}

fn default_create_policy() -> RetryPolicy {
    policy(3, 60_000, 30_000, 2_000)
}

fn default_upload_image_policy() -> RetryPolicy {
    policy(3, 60_000, 30_000, 2_000)
}

fn default_upload_video_policy() -> RetryPolicy {
    policy(3, 300_000, 120_000, 3_000)
}

fn default_fetch_image_policy() -> RetryPolicy {
    policy(3, 30_000, 15_000, 1_000)
}

fn default_fetch_video_policy() -> RetryPolicy {
    policy(3, 60_000, 30_000, 3_000)
}

fn default_probe_policy() -> RetryPolicy {
    policy(2, 10_000, 5_000, 500)
}

fn default_delete_policy() -> RetryPolicy {
    policy(2, 30_000, 15_000, 1_000)
}

impl Default for RetryPolicyTable {
    fn default() -> Self {
        Self {
            create_campaign: default_create_policy(),
            create_ad_set: default_create_policy(),
            create_creative: default_create_policy(),
            create_ad: default_create_policy(),
            upload_image: default_upload_image_policy(),
            upload_video: default_upload_video_policy(),
            fetch_image: default_fetch_image_policy(),
            fetch_video: default_fetch_video_policy(),
            probe_media: default_probe_policy(),
            delete: default_delete_policy(),
        }
    }
}

impl RetryPolicyTable {
    pub fn get(&self, class: OperationClass) -> &RetryPolicy {
        match class {
            OperationClass::CreateCampaign => &self.create_campaign,
            OperationClass::CreateAdSet => &self.create_ad_set,
            OperationClass::CreateCreative => &self.create_creative,
            OperationClass::CreateAd => &self.create_ad,
            OperationClass::UploadImage => &self.upload_image,
            OperationClass::UploadVideo => &self.upload_video,
            OperationClass::FetchImage => &self.fetch_image,
            OperationClass::FetchVideo => &self.fetch_video,
            OperationClass::ProbeMedia => &self.probe_media,
            OperationClass::Delete => &self.delete,
        }
    }

    pub fn get_mut(&mut self, class: OperationClass) -> &mut RetryPolicy {
        match class {
            OperationClass::CreateCampaign => &mut self.create_campaign,
            OperationClass::CreateAdSet => &mut self.create_ad_set,
            OperationClass::CreateCreative => &mut self.create_creative,
            OperationClass::CreateAd => &mut self.create_ad,
            OperationClass::UploadImage => &mut self.upload_image,
            OperationClass::UploadVideo => &mut self.upload_video,
            OperationClass::FetchImage => &mut self.fetch_image,
            OperationClass::FetchVideo => &mut self.fetch_video,
            OperationClass::ProbeMedia => &mut self.probe_media,
            OperationClass::Delete => &mut self.delete,
        }
    }

    /// Same policy for every class. Mostly useful in tests.
    pub fn uniform(policy: RetryPolicy) -> Self {
        Self {
            create_campaign: policy.clone(),
            create_ad_set: policy.clone(),
            create_creative: policy.clone(),
            create_ad: policy.clone(),
            upload_image: policy.clone(),
            upload_video: policy.clone(),
            fetch_image: policy.clone(),
            fetch_video: policy.clone(),
            probe_media: policy.clone(),
            delete: policy,
        }
    }
}
