//! Default parameters for created resources.

use serde::{Deserialize, Serialize};

/// Defaults applied to every campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignDefaults {
    #[serde(default = "default_objective")]
    pub objective: String,

    #[serde(default = "default_buying_type")]
    pub buying_type: String,

    #[serde(default = "default_status")]
    pub status: String,
}

/// Defaults applied to every ad set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdSetDefaults {
    /// Daily budget in minor currency units when the row sets none.
    #[serde(default)]
    pub daily_budget: Option<u64>,

    #[serde(default = "default_billing_event")]
    pub billing_event: String,

    #[serde(default = "default_bid_strategy")]
    pub bid_strategy: String,

    #[serde(default = "default_optimization_goal")]
    pub optimization_goal: String,

    /// Conversion event on the promoted pixel.
    #[serde(default)]
    pub custom_event_type: Option<String>,

    #[serde(default = "default_status")]
    pub status: String,

    /// Fallback beneficiary for regulated targeting.
    #[serde(default)]
    pub beneficiary: Option<String>,

    /// Fallback payor for regulated targeting.
    #[serde(default)]
    pub payor: Option<String>,
}

/// Defaults applied to every ad and creative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdDefaults {
    #[serde(default = "default_status")]
    pub status: String,

    #[serde(default = "default_call_to_action")]
    pub call_to_action: String,
}

/// All creation defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreationDefaults {
    #[serde(default)]
    pub campaign: CampaignDefaults,

    #[serde(default)]
    pub ad_set: AdSetDefaults,

    #[serde(default)]
    pub ad: AdDefaults,

    /// Base landing URL; the encoded query is appended to it.
    #[serde(default)]
    pub landing_page_prefix: String,
}

fn default_objective() -> String {
    "OUTCOME_SALES".to_string()
}

fn default_buying_type() -> String {
    "AUCTION".to_string()
}

fn default_status() -> String {
    "ACTIVE".to_string()
}

fn default_billing_event() -> String {
    "IMPRESSIONS".to_string()
}

fn default_bid_strategy() -> String {
    "LOWEST_COST_WITHOUT_CAP".to_string()
}

fn default_optimization_goal() -> String {
    "OFFSITE_CONVERSIONS".to_string()
}

fn default_call_to_action() -> String {
    "LEARN_MORE".to_string()
}

impl Default for CampaignDefaults {
    fn default() -> Self {
        Self {
            objective: default_objective(),
            buying_type: default_buying_type(),
            status: default_status(),
        }
    }
}

impl Default for AdSetDefaults {
    fn default() -> Self {
        Self {
            daily_budget: None,
            billing_event: default_billing_event(),
            bid_strategy: default_bid_strategy(),
            optimization_goal: default_optimization_goal(),
            custom_event_type: None,
            status: default_status(),
            beneficiary: None,
            payor: None,
        }
    }
}

impl Default for AdDefaults {
    fn default() -> Self {
        Self {
            status: default_status(),
            call_to_action: default_call_to_action(),
        }
    }
}

impl CreationDefaults {
    pub fn with_landing_page_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.landing_page_prefix = prefix.into();
        self
    }
}
