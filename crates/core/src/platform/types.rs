//! Resource parameters exchanged with the ads platform.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Kind of remote resource in the campaign hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Campaign,
    AdSet,
    Creative,
    Ad,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Campaign => "campaign",
            ResourceKind::AdSet => "ad_set",
            ResourceKind::Creative => "creative",
            ResourceKind::Ad => "ad",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A remote resource created by a saga.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHandle {
    pub kind: ResourceKind,
    pub id: String,
}

impl ResourceHandle {
    pub fn new(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

/// Parameters for `create_campaign`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignParams {
    pub name: String,
    pub objective: String,
    pub buying_type: String,
    pub status: String,
    /// Uppercased category names; empty means none.
    pub special_ad_categories: Vec<String>,
}

/// Audience targeting for an ad set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Targeting {
    /// ISO country codes; empty means worldwide.
    pub countries: Vec<String>,
    pub device_platforms: Vec<String>,
    /// Empty means every OS.
    pub user_os: Vec<String>,
}

impl Targeting {
    /// Graph-API `targeting` object.
    pub fn to_json(&self) -> Value {
        let mut targeting = json!({ "device_platforms": self.device_platforms });
        if !self.countries.is_empty() {
            targeting["geo_locations"] = json!({ "countries": self.countries });
        }
        if !self.user_os.is_empty() {
            targeting["user_os"] = json!(self.user_os);
        }
        targeting
    }
}

/// Parameters for `create_ad_set`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdSetParams {
    pub name: String,
    pub campaign_id: String,
    /// Daily budget in minor currency units.
    pub daily_budget: u64,
    pub billing_event: String,
    pub bid_strategy: String,
    pub optimization_goal: String,
    pub custom_event_type: Option<String>,
    pub pixel_id: Option<String>,
    pub targeting: Targeting,
    pub status: String,
    pub beneficiary: Option<String>,
    pub payor: Option<String>,
}

impl AdSetParams {
    /// Graph-API `promoted_object`, present when a pixel is configured.
    pub fn promoted_object(&self) -> Option<Value> {
        self.pixel_id.as_ref().map(|pixel| {
            let mut object = json!({ "pixel_id": pixel });
            if let Some(event) = &self.custom_event_type {
                object["custom_event_type"] = json!(event);
            }
            object
        })
    }
}

/// Image shown by a creative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageRef {
    /// Hash of an image uploaded to the ad account library.
    Hash(String),
    /// Public URL the platform fetches itself.
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallToAction {
    pub kind: String,
    pub link: String,
}

impl CallToAction {
    fn to_json(&self) -> Value {
        json!({ "type": self.kind, "value": { "link": self.link } })
    }
}

/// Body of an image (link) creative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkData {
    pub message: String,
    pub link: String,
    pub headline: String,
    pub call_to_action: CallToAction,
    pub image: ImageRef,
}

/// Body of a video creative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoData {
    pub video_id: String,
    pub title: String,
    pub message: String,
    pub call_to_action: CallToAction,
    pub thumbnail: Option<ImageRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreativeContent {
    Link(LinkData),
    Video(VideoData),
}

/// Parameters for `create_creative`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreativeParams {
    pub name: String,
    pub page_id: String,
    /// Alternate social identity shown instead of the page.
    pub instagram_user_id: Option<String>,
    pub content: CreativeContent,
}

impl CreativeParams {
    /// Graph-API `object_story_spec` object.
    pub fn object_story_spec(&self) -> Value {
        let mut spec = json!({ "page_id": self.page_id });
        if let Some(actor) = &self.instagram_user_id {
            spec["instagram_user_id"] = json!(actor);
        }

        match &self.content {
            CreativeContent::Link(link) => {
                let mut data = json!({
                    "message": link.message,
                    "link": link.link,
                    "name": link.headline,
                    "call_to_action": link.call_to_action.to_json(),
                });
                match &link.image {
                    ImageRef::Hash(hash) => data["image_hash"] = json!(hash),
                    ImageRef::Url(url) => data["picture"] = json!(url),
                }
                spec["link_data"] = data;
            }
            CreativeContent::Video(video) => {
                let mut data = json!({
                    "video_id": video.video_id,
                    "title": video.title,
                    "message": video.message,
                    "call_to_action": video.call_to_action.to_json(),
                });
                match &video.thumbnail {
                    Some(ImageRef::Hash(hash)) => data["image_hash"] = json!(hash),
                    Some(ImageRef::Url(url)) => data["image_url"] = json!(url),
                    None => {}
                }
                spec["video_data"] = data;
            }
        }
        spec
    }

    pub fn uses_page_actor_override(&self) -> bool {
        self.instagram_user_id.is_some()
    }
}

/// Parameters for `create_ad`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdParams {
    pub name: String,
    pub ad_set_id: String,
    pub creative_id: String,
    pub status: String,
}
