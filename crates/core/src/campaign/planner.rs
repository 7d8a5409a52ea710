//! Task planner: selects rows, assigns version letters and names tasks.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::row::{Field, RowSchema, SourceRow};
use super::spec::UploadTask;
use super::targeting::normalize_countries;

/// Row selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Value of the `Upload` column that selects a row (case-insensitive).
    #[serde(default = "default_upload_marker")]
    pub upload_marker: String,

    /// Platform key used when a row has no `Platform` column.
    #[serde(default)]
    pub default_platform: Option<String>,
}

fn default_upload_marker() -> String {
    "yes".to_string()
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            upload_marker: default_upload_marker(),
            default_platform: None,
        }
    }
}

/// Account identifiers of one configured platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformTarget {
    pub key: String,
    pub account_id: String,
    pub page_id: String,
    pub pixel_id: Option<String>,
    pub social_identity_id: Option<String>,
}

/// A row the planner did not turn into a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub row_id: u32,
    pub reason: String,
}

/// Planner output.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub tasks: Vec<UploadTask>,
    pub skipped: Vec<SkippedRow>,
}

/// Builds one [`UploadTask`] per selected row.
///
/// Version letters are assigned here, in row order, so tasks sharing a
/// `(topic, country)` key get distinct names however they are scheduled.
pub struct TaskPlanner {
    schema: RowSchema,
    config: PlannerConfig,
    platforms: Vec<PlatformTarget>,
}

impl TaskPlanner {
    pub fn new(schema: RowSchema, config: PlannerConfig, platforms: Vec<PlatformTarget>) -> Self {
        Self {
            schema,
            config,
            platforms,
        }
    }

    pub fn schema(&self) -> &RowSchema {
        &self.schema
    }

    /// Plan a batch. `display_date` is the `DD-MM` stamp used in names.
    pub fn plan(&self, rows: &[SourceRow], display_date: &str) -> Plan {
        let mut plan = Plan::default();
        let mut versions: HashMap<(String, String), u32> = HashMap::new();
        let display_date = display_date.replace('/', "-");

        for row in rows {
            let marker = self.schema.lookup(&row.fields, Field::Upload);
            if !marker.is_some_and(|m| m.eq_ignore_ascii_case(&self.config.upload_marker)) {
                debug!(row = row.row_id, "Skipping row not marked for upload");
                plan.skipped.push(SkippedRow {
                    row_id: row.row_id,
                    reason: "not marked for upload".to_string(),
                });
                continue;
            }

            let platform_key = self
                .schema
                .lookup(&row.fields, Field::Platform)
                .map(str::to_string)
                .or_else(|| self.config.default_platform.clone());
            let Some(platform) = platform_key.as_deref().and_then(|key| self.platform(key)) else {
                debug!(row = row.row_id, platform = ?platform_key, "Skipping row for unconfigured platform");
                plan.skipped.push(SkippedRow {
                    row_id: row.row_id,
                    reason: format!(
                        "platform '{}' is not configured",
                        platform_key.unwrap_or_default()
                    ),
                });
                continue;
            };

            let spec = self.schema.spec_from_row(&row.fields);
            let codes = normalize_countries(&spec.country);
            let country_label = codes.join("-");

            let counter = versions
                .entry((sanitize_topic(&spec.topic), country_label.clone()))
                .or_insert(0);
            let letter = version_letter(*counter);
            *counter += 1;

            let campaign_name = campaign_name(
                &spec.topic,
                &country_label,
                &letter,
                &display_date,
                spec.hash_id.as_deref(),
            );

            plan.tasks.push(UploadTask {
                row_id: row.row_id,
                platform: platform.key.clone(),
                account_id: platform.account_id.clone(),
                page_id: platform.page_id.clone(),
                pixel_id: platform.pixel_id.clone(),
                social_identity_id: platform.social_identity_id.clone(),
                campaign_name,
                spec,
            });
        }

        plan
    }

    fn platform(&self, key: &str) -> Option<&PlatformTarget> {
        self.platforms
            .iter()
            .find(|p| p.key.eq_ignore_ascii_case(key.trim()))
    }
}

/// Spreadsheet-column style letters: 0 → A, 25 → Z, 26 → AA.
pub fn version_letter(index: u32) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        letters.push((b'A' + rem) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Topic as it appears in a campaign name: trimmed, non-alphanumerics as `_`.
pub fn sanitize_topic(topic: &str) -> String {
    topic
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

/// `<topic>_<CC>_Agent_<letter>_<date>[_<hash_id>]`, topic sanitized.
pub fn campaign_name(
    topic: &str,
    country_label: &str,
    letter: &str,
    display_date: &str,
    hash_id: Option<&str>,
) -> String {
    let mut name = format!(
        "{}_{}_Agent_{}_{}",
        sanitize_topic(topic),
        country_label,
        letter,
        display_date
    );
    if let Some(hash) = hash_id.map(str::trim).filter(|h| !h.is_empty()) {
        name.push('_');
        name.push_str(hash);
    }
    name
}

/// Today's `DD-MM` stamp in local time.
pub fn today_display_date() -> String {
    chrono::Local::now().format("%d-%m").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::FieldMap;

    fn platform() -> PlatformTarget {
        PlatformTarget {
            key: "fb api".to_string(),
            account_id: "111".to_string(),
            page_id: "222".to_string(),
            pixel_id: Some("333".to_string()),
            social_identity_id: None,
        }
    }

    fn row(row_id: u32, topic: &str, country: &str, upload: &str, platform: &str) -> SourceRow {
        let mut fields = FieldMap::new();
        fields.insert("Topic".to_string(), topic.to_string());
        fields.insert("Country".to_string(), country.to_string());
        fields.insert("Title".to_string(), "T".to_string());
        fields.insert("Body".to_string(), "B".to_string());
        fields.insert("Media".to_string(), "https://a.test/1.jpg".to_string());
        fields.insert("Upload".to_string(), upload.to_string());
        fields.insert("Platform".to_string(), platform.to_string());
        SourceRow::new(row_id, fields)
    }

    fn planner() -> TaskPlanner {
        TaskPlanner::new(RowSchema::default(), PlannerConfig::default(), vec![platform()])
    }

    #[test]
    fn test_version_letters() {
        assert_eq!(version_letter(0), "A");
        assert_eq!(version_letter(25), "Z");
        assert_eq!(version_letter(26), "AA");
        assert_eq!(version_letter(27), "AB");
        assert_eq!(version_letter(701), "ZZ");
        assert_eq!(version_letter(702), "AAA");
    }

    #[test]
    fn test_campaign_name() {
        assert_eq!(
            campaign_name("Solar Panels!", "GB", "A", "05-03", None),
            "Solar_Panels__GB_Agent_A_05-03"
        );
        assert_eq!(
            campaign_name("Solar", "GB-IE", "B", "05-03", Some("x9")),
            "Solar_GB-IE_Agent_B_05-03_x9"
        );
    }

    #[test]
    fn test_letters_per_topic_and_country() {
        let rows = vec![
            row(2, "Solar", "GB", "yes", "fb api"),
            row(3, "Solar", "United Kingdom", "YES", "FB API"),
            row(4, "Solar", "DE", "yes", "fb api"),
            row(5, "Solar", "gb", "yes", "fb api"),
        ];
        let plan = planner().plan(&rows, "05/03");

        let names: Vec<&str> = plan.tasks.iter().map(|t| t.campaign_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Solar_GB_Agent_A_05-03",
                "Solar_GB_Agent_B_05-03",
                "Solar_DE_Agent_A_05-03",
                "Solar_GB_Agent_C_05-03",
            ]
        );
        assert_eq!(plan.tasks[0].account_id, "111");
        assert_eq!(plan.tasks[0].pixel_id.as_deref(), Some("333"));
    }

    #[test]
    fn test_topics_with_the_same_name_share_letters() {
        let rows = vec![
            row(2, "Solar Panels", "GB", "yes", "fb api"),
            row(3, "Solar-Panels", "GB", "yes", "fb api"),
            row(4, " Solar Panels ", "GB", "yes", "fb api"),
        ];
        let plan = planner().plan(&rows, "05/03");

        let names: Vec<&str> = plan.tasks.iter().map(|t| t.campaign_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Solar_Panels_GB_Agent_A_05-03",
                "Solar_Panels_GB_Agent_B_05-03",
                "Solar_Panels_GB_Agent_C_05-03",
            ]
        );
    }

    #[test]
    fn test_row_selection() {
        let rows = vec![
            row(2, "Solar", "GB", "no", "fb api"),
            row(3, "Solar", "GB", "yes", "tiktok"),
            row(4, "Solar", "GB", "yes", "fb api"),
        ];
        let plan = planner().plan(&rows, "01-01");

        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].row_id, 4);
        assert_eq!(plan.skipped.len(), 2);
        assert_eq!(plan.skipped[0].row_id, 2);
        assert!(plan.skipped[1].reason.contains("tiktok"));
    }

    #[test]
    fn test_default_platform_when_column_missing() {
        let mut r = row(2, "Solar", "GB", "yes", "");
        r.fields.remove("Platform");
        let planner = TaskPlanner::new(
            RowSchema::default(),
            PlannerConfig {
                default_platform: Some("fb api".to_string()),
                ..PlannerConfig::default()
            },
            vec![platform()],
        );
        assert_eq!(planner.plan(&[r], "01-01").tasks.len(), 1);
    }

    #[test]
    fn test_invalid_rows_still_become_tasks() {
        let mut r = row(2, "Solar", "GB", "yes", "fb api");
        r.fields.remove("Title");
        let plan = planner().plan(&[r], "01-01");
        assert_eq!(plan.tasks.len(), 1);
        assert!(plan.tasks[0].spec.validate().is_err());
    }
}
