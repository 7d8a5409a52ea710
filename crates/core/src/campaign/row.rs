//! Row schema: maps loosely named input columns onto campaign fields.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::spec::{CampaignSpec, DeviceTargeting};
use super::targeting::parse_special_categories;
use crate::media::MediaKind;

/// Column name to cell value.
pub type FieldMap = BTreeMap<String, String>;

/// One input row with its source identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRow {
    pub row_id: u32,
    pub fields: FieldMap,
}

impl SourceRow {
    pub fn new(row_id: u32, fields: FieldMap) -> Self {
        Self { row_id, fields }
    }
}

/// Logical fields read from a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Topic,
    Country,
    Title,
    Body,
    LandingQuery,
    Media,
    MediaType,
    Budget,
    DeviceTargeting,
    SpecialCategories,
    Beneficiary,
    Payor,
    SocialIdentity,
    HashId,
    LandingPage,
    Upload,
    Platform,
}

/// Ordered alias lists per field. Lookup is case-insensitive, first
/// non-empty alias wins; unknown columns are ignored.
#[derive(Debug, Clone)]
pub struct RowSchema {
    aliases: HashMap<Field, Vec<String>>,
    /// Columns starting with this prefix also hold media references.
    media_prefix: String,
}

impl Default for RowSchema {
    fn default() -> Self {
        let table: &[(Field, &[&str])] = &[
            (Field::Topic, &["Topic", "Campaign Topic", "Keyword Topic"]),
            (Field::Country, &["Country", "Country Code", "Target Country", "Geo"]),
            (Field::Title, &["Title", "Headline", "Ad Title"]),
            (Field::Body, &["Body", "Primary Text", "Ad Text", "Text", "Description"]),
            (Field::LandingQuery, &["Query", "Landing Query", "Search Query", "Keywords"]),
            (Field::Media, &["Media", "Media Path", "Media URL", "Media URLs"]),
            (Field::MediaType, &["Media Type"]),
            (Field::Budget, &["Budget", "Daily Budget"]),
            (Field::DeviceTargeting, &["Device Targeting", "Device"]),
            (Field::SpecialCategories, &["Special Ad Categories", "Special Categories"]),
            (Field::Beneficiary, &["Beneficiary"]),
            (Field::Payor, &["Payor", "Payer"]),
            (
                Field::SocialIdentity,
                &["Instagram Account", "Instagram Actor ID", "Social Identity"],
            ),
            (Field::HashId, &["Hash ID", "Hash"]),
            (Field::LandingPage, &["Landing Page", "Landing Page URL", "Base URL"]),
            (Field::Upload, &["Upload"]),
            (Field::Platform, &["Platform"]),
        ];

        let aliases = table
            .iter()
            .map(|(field, names)| (*field, names.iter().map(|n| n.to_string()).collect()))
            .collect();

        Self {
            aliases,
            media_prefix: "media".to_string(),
        }
    }
}

impl RowSchema {
    /// Replace the alias list of a field.
    pub fn with_aliases(mut self, field: Field, aliases: Vec<String>) -> Self {
        self.aliases.insert(field, aliases);
        self
    }

    /// Value of `field`, trimmed; `None` when absent or blank.
    pub fn lookup<'a>(&self, row: &'a FieldMap, field: Field) -> Option<&'a str> {
        let aliases = self.aliases.get(&field)?;
        aliases.iter().find_map(|alias| {
            row.get(alias.as_str())
                .or_else(|| {
                    row.iter()
                        .find(|(key, _)| key.trim().eq_ignore_ascii_case(alias))
                        .map(|(_, value)| value)
                })
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
        })
    }

    /// Media references: the first media alias present, else every column
    /// starting with the media prefix. Values split on whitespace and `|`.
    pub fn media_references(&self, row: &FieldMap) -> Vec<String> {
        let values: Vec<&str> = match self.lookup(row, Field::Media) {
            Some(value) => vec![value],
            None => row
                .iter()
                .filter(|(key, _)| key.trim().to_lowercase().starts_with(&self.media_prefix))
                .filter(|(key, _)| !self.is_alias(Field::MediaType, key))
                .map(|(_, value)| value.as_str())
                .collect(),
        };

        values
            .into_iter()
            .flat_map(|value| value.split(|c: char| c.is_whitespace() || c == '|'))
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn is_alias(&self, field: Field, key: &str) -> bool {
        self.aliases
            .get(&field)
            .is_some_and(|aliases| aliases.iter().any(|a| a.eq_ignore_ascii_case(key.trim())))
    }

    /// Build a campaign spec. Missing required fields are left empty and
    /// reported by [`CampaignSpec::validate`].
    pub fn spec_from_row(&self, row: &FieldMap) -> CampaignSpec {
        let text = |field| self.lookup(row, field).unwrap_or_default().to_string();
        let optional = |field| self.lookup(row, field).map(str::to_string);

        CampaignSpec {
            topic: text(Field::Topic),
            country: text(Field::Country),
            title: text(Field::Title),
            body: text(Field::Body),
            landing_query: text(Field::LandingQuery),
            media: self.media_references(row),
            media_type: self.lookup(row, Field::MediaType).and_then(MediaKind::from_hint),
            budget: optional(Field::Budget),
            device_targeting: self
                .lookup(row, Field::DeviceTargeting)
                .map(DeviceTargeting::parse)
                .unwrap_or_default(),
            special_categories: self
                .lookup(row, Field::SpecialCategories)
                .map(parse_special_categories)
                .unwrap_or_default(),
            beneficiary: optional(Field::Beneficiary),
            payor: optional(Field::Payor),
            social_identity_id: optional(Field::SocialIdentity),
            hash_id: optional(Field::HashId),
            landing_page: optional(Field::LandingPage),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_lookup_is_case_insensitive_in_alias_order() {
        let schema = RowSchema::default();
        let fields = row(&[("country", "GB"), ("Country Code", "US")]);
        assert_eq!(schema.lookup(&fields, Field::Country), Some("GB"));

        let fields = row(&[("COUNTRY CODE", " IE ")]);
        assert_eq!(schema.lookup(&fields, Field::Country), Some("IE"));
    }

    #[test]
    fn test_blank_values_fall_through() {
        let schema = RowSchema::default();
        let fields = row(&[("Title", "  "), ("Headline", "Fallback")]);
        assert_eq!(schema.lookup(&fields, Field::Title), Some("Fallback"));
        assert_eq!(schema.lookup(&fields, Field::Body), None);
    }

    #[test]
    fn test_media_split_on_whitespace_and_pipe() {
        let schema = RowSchema::default();
        let fields = row(&[("Media", "https://a.test/1.jpg | https://a.test/2.mp4\nlocal.png")]);
        assert_eq!(
            schema.media_references(&fields),
            vec!["https://a.test/1.jpg", "https://a.test/2.mp4", "local.png"]
        );
    }

    #[test]
    fn test_media_prefix_columns() {
        let schema = RowSchema::default();
        let fields = row(&[
            ("media_1", "https://a.test/1.jpg"),
            ("Media 2", "https://a.test/2.jpg"),
            ("Media Type", "image"),
        ]);
        assert_eq!(
            schema.media_references(&fields),
            vec!["https://a.test/2.jpg", "https://a.test/1.jpg"]
        );
    }

    #[test]
    fn test_spec_from_row() {
        let schema = RowSchema::default();
        let fields = row(&[
            ("Topic", "Solar"),
            ("Country", "Germany"),
            ("Headline", "Go solar"),
            ("Primary Text", "Save money"),
            ("Query", "solar panels"),
            ("Media", "https://a.test/1.jpg"),
            ("Budget", "$20"),
            ("Device Targeting", "android_only"),
            ("Special Ad Categories", "housing"),
            ("Beneficiary", "Acme"),
            ("Unrelated", "ignored"),
        ]);

        let spec = schema.spec_from_row(&fields);
        assert_eq!(spec.topic, "Solar");
        assert_eq!(spec.country, "Germany");
        assert_eq!(spec.title, "Go solar");
        assert_eq!(spec.body, "Save money");
        assert_eq!(spec.budget.as_deref(), Some("$20"));
        assert_eq!(spec.device_targeting, DeviceTargeting::AndroidOnly);
        assert_eq!(spec.special_categories, vec!["HOUSING"]);
        assert_eq!(spec.beneficiary.as_deref(), Some("Acme"));
        assert!(spec.payor.is_none());
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_generic_sheet_columns_are_not_aliases() {
        let schema = RowSchema::default();
        let fields = row(&[
            ("ID", "17"),
            ("Type", "video"),
            ("Targeting", "ios_only"),
        ]);

        let spec = schema.spec_from_row(&fields);
        assert!(spec.hash_id.is_none());
        assert!(spec.media_type.is_none());
        assert_eq!(spec.device_targeting, DeviceTargeting::All);
    }
}
