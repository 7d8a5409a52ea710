//! Creative and ad parameter construction.

use super::config::AdDefaults;
use crate::campaign::UploadTask;
use crate::platform::{
    AdParams, CallToAction, CreativeContent, CreativeParams, ImageRef, LinkData, VideoData,
};

/// Media after it reached the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadedMedia {
    Image(ImageRef),
    Video {
        video_id: String,
        thumbnail: Option<ImageRef>,
    },
}

pub fn creative_name(campaign_name: &str, index: usize) -> String {
    format!("{} Creative {}", campaign_name, index + 1)
}

pub fn ad_name(campaign_name: &str, index: usize) -> String {
    format!("{} Ad {}", campaign_name, index + 1)
}

/// Row override first, then the platform default.
fn social_identity(task: &UploadTask) -> Option<String> {
    task.spec
        .social_identity_id
        .as_ref()
        .or(task.social_identity_id.as_ref())
        .filter(|id| !id.trim().is_empty())
        .cloned()
}

/// Creative parameters for the item at `index`.
pub fn build_creative(
    task: &UploadTask,
    defaults: &AdDefaults,
    index: usize,
    media: UploadedMedia,
    link: &str,
) -> CreativeParams {
    let call_to_action = CallToAction {
        kind: defaults.call_to_action.clone(),
        link: link.to_string(),
    };

    let content = match media {
        UploadedMedia::Image(image) => CreativeContent::Link(LinkData {
            message: task.spec.body.clone(),
            link: link.to_string(),
            headline: task.spec.title.clone(),
            call_to_action,
            image,
        }),
        UploadedMedia::Video {
            video_id,
            thumbnail,
        } => CreativeContent::Video(VideoData {
            video_id,
            title: task.spec.title.clone(),
            message: task.spec.body.clone(),
            call_to_action,
            thumbnail,
        }),
    };

    CreativeParams {
        name: creative_name(&task.campaign_name, index),
        page_id: task.page_id.clone(),
        instagram_user_id: social_identity(task),
        content,
    }
}

/// Ad parameters binding `creative_id` to `ad_set_id`.
pub fn build_ad(
    task: &UploadTask,
    defaults: &AdDefaults,
    index: usize,
    ad_set_id: &str,
    creative_id: &str,
) -> AdParams {
    AdParams {
        name: ad_name(&task.campaign_name, index),
        ad_set_id: ad_set_id.to_string(),
        creative_id: creative_id.to_string(),
        status: defaults.status.clone(),
    }
}
