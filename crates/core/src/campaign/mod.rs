//! Campaign data model and per-row rules.
//!
//! Rows become [`CampaignSpec`]s through the [`RowSchema`], the
//! [`TaskPlanner`] turns them into named [`UploadTask`]s, and the targeting
//! and landing helpers compute what the saga sends to the platform.

mod landing;
mod planner;
mod row;
mod spec;
mod targeting;

pub use landing::landing_url;
pub use planner::{
    campaign_name, today_display_date, version_letter, Plan, PlannerConfig, PlatformTarget,
    SkippedRow, TaskPlanner,
};
pub use row::{Field, FieldMap, RowSchema, SourceRow};
pub use spec::{
    CampaignSpec, DeviceTargeting, TaskStatus, UploadResult, UploadTask, ValidationError,
};
pub use targeting::{
    normalize_countries, normalize_country, parse_budget, parse_special_categories,
    resolve_budget, MultiCountryMode, TargetingConfig, FALLBACK_DAILY_BUDGET, WORLDWIDE,
};
