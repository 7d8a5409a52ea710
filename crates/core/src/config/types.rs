use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::PathBuf;

use crate::campaign::{PlannerConfig, PlatformTarget, TargetingConfig};
use crate::media::MediaConfig;
use crate::platform::GraphApiConfig;
use crate::report::TwilioConfig;
use crate::retry::RetryPolicyTable;
use crate::saga::CreationDefaults;
use crate::scheduler::DEFAULT_POOL_SIZE;
use crate::thumbnail::ThumbnailConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub retry: RetryPolicyTable,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub thumbnail: ThumbnailConfig,
    #[serde(default)]
    pub targeting: TargetingConfig,
    #[serde(default)]
    pub defaults: CreationDefaults,
    #[serde(default)]
    pub planner: PlannerConfig,
    /// Ad accounts keyed by the value of the row's `Platform` column.
    #[serde(default)]
    pub platforms: BTreeMap<String, PlatformConfig>,
    #[serde(default)]
    pub notifier: Option<NotifierConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("uploader.db")
}

/// Worker pool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// Sagas running at once (default: 3)
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
        }
    }
}

fn default_pool_size() -> usize {
    DEFAULT_POOL_SIZE
}

/// One ad account on the Graph API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlatformConfig {
    pub access_token: String,
    /// Ad account id, with or without the `act_` prefix
    pub ad_account_id: String,
    pub page_id: String,
    #[serde(default)]
    pub pixel_id: Option<String>,
    /// Default alternate social identity for creatives
    #[serde(default)]
    pub instagram_actor_id: Option<String>,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_api_version() -> String {
    "v22.0".to_string()
}

fn default_request_timeout() -> u64 {
    900
}

impl PlatformConfig {
    pub fn graph_config(&self) -> GraphApiConfig {
        GraphApiConfig {
            access_token: self.access_token.clone(),
            api_version: self.api_version.clone(),
            base_url: self.base_url.clone(),
            request_timeout_secs: self.request_timeout_secs,
        }
    }

    /// Account identifiers handed to the planner.
    pub fn target(&self, key: &str) -> PlatformTarget {
        PlatformTarget {
            key: key.to_string(),
            account_id: self.ad_account_id.trim_start_matches("act_").to_string(),
            page_id: self.page_id.clone(),
            pixel_id: self.pixel_id.clone().filter(|p| !p.trim().is_empty()),
            social_identity_id: self
                .instagram_actor_id
                .clone()
                .filter(|id| !id.trim().is_empty()),
        }
    }
}

/// Where batch summaries go
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotifierConfig {
    /// SMS through Twilio
    Twilio(TwilioConfig),
    /// Log only
    Log,
}

impl Config {
    /// Planner targets for every configured platform.
    pub fn platform_targets(&self) -> Vec<PlatformTarget> {
        self.platforms
            .iter()
            .map(|(key, platform)| platform.target(key))
            .collect()
    }
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub scheduler: SchedulerConfig,
    pub retry: RetryPolicyTable,
    pub media: MediaConfig,
    pub thumbnail: ThumbnailConfig,
    pub targeting: TargetingConfig,
    pub defaults: CreationDefaults,
    pub planner: PlannerConfig,
    pub platforms: BTreeMap<String, SanitizedPlatformConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifier: Option<SanitizedNotifierConfig>,
}

/// Platform config with the access token hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedPlatformConfig {
    pub ad_account_id: String,
    pub page_id: String,
    pub pixel_id: Option<String>,
    pub instagram_actor_id: Option<String>,
    pub api_version: String,
    pub access_token_configured: bool,
}

/// Notifier config with credentials hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedNotifierConfig {
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_number: Option<String>,
    pub credentials_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            scheduler: config.scheduler.clone(),
            retry: config.retry.clone(),
            media: config.media.clone(),
            thumbnail: config.thumbnail.clone(),
            targeting: config.targeting.clone(),
            defaults: config.defaults.clone(),
            planner: config.planner.clone(),
            platforms: config
                .platforms
                .iter()
                .map(|(key, p)| {
                    (
                        key.clone(),
                        SanitizedPlatformConfig {
                            ad_account_id: p.ad_account_id.clone(),
                            page_id: p.page_id.clone(),
                            pixel_id: p.pixel_id.clone(),
                            instagram_actor_id: p.instagram_actor_id.clone(),
                            api_version: p.api_version.clone(),
                            access_token_configured: !p.access_token.is_empty(),
                        },
                    )
                })
                .collect(),
            notifier: config.notifier.as_ref().map(|n| match n {
                NotifierConfig::Twilio(t) => SanitizedNotifierConfig {
                    kind: "twilio".to_string(),
                    to_number: Some(t.to_number.clone()),
                    credentials_configured: !t.account_sid.is_empty()
                        && !t.auth_token.is_empty(),
                },
                NotifierConfig::Log => SanitizedNotifierConfig {
                    kind: "log".to_string(),
                    to_number: None,
                    credentials_configured: false,
                },
            }),
        }
    }
}
