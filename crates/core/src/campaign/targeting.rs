//! Country, device and budget rules for ad set targeting.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::spec::DeviceTargeting;
use crate::platform::Targeting;

/// Code used for worldwide targeting.
pub const WORLDWIDE: &str = "WW";

/// Budget used when neither the row nor the config sets one, in minor units.
pub const FALLBACK_DAILY_BUDGET: u64 = 1000;

const COUNTRY_NAMES: &[(&str, &str)] = &[
    ("united kingdom", "GB"),
    ("great britain", "GB"),
    ("united states", "US"),
    ("usa", "US"),
    ("australia", "AU"),
    ("new zealand", "NZ"),
    ("canada", "CA"),
    ("ireland", "IE"),
    ("united arab emirates", "AE"),
    ("uae", "AE"),
    ("mexico", "MX"),
    ("germany", "DE"),
    ("spain", "ES"),
    ("italy", "IT"),
    ("chile", "CL"),
    ("france", "FR"),
    ("netherlands", "NL"),
];

const EU_MEMBER_CODES: &[&str] = &[
    "AT", "BE", "BG", "HR", "CY", "CZ", "DK", "EE", "FI", "FR", "DE", "GR", "HU", "IE", "IT",
    "LV", "LT", "LU", "MT", "NL", "PL", "PT", "RO", "SK", "SI", "ES", "SE",
];

/// How a multi-country target maps to ad sets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiCountryMode {
    /// One ad set listing every country.
    #[default]
    SingleAdSet,
    /// One ad set per country under the same campaign.
    PerCountry,
}

/// Targeting configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetingConfig {
    #[serde(default)]
    pub multi_country: MultiCountryMode,

    /// Codes whose targeting requires beneficiary and payor.
    #[serde(default = "default_regulated_countries")]
    pub regulated_countries: Vec<String>,

    #[serde(default = "default_device_platforms")]
    pub device_platforms: Vec<String>,
}

fn default_regulated_countries() -> Vec<String> {
    EU_MEMBER_CODES.iter().map(|c| c.to_string()).collect()
}

fn default_device_platforms() -> Vec<String> {
    vec!["mobile".to_string()]
}

impl Default for TargetingConfig {
    fn default() -> Self {
        Self {
            multi_country: MultiCountryMode::default(),
            regulated_countries: default_regulated_countries(),
            device_platforms: default_device_platforms(),
        }
    }
}

impl TargetingConfig {
    /// Whether targeting these codes needs beneficiary and payor.
    /// Worldwide includes the regulated region.
    pub fn is_regulated(&self, codes: &[String]) -> bool {
        codes.iter().any(|code| {
            code == WORLDWIDE
                || self
                    .regulated_countries
                    .iter()
                    .any(|r| r.eq_ignore_ascii_case(code))
        })
    }

    /// Country groups, one per ad set.
    pub fn ad_set_groups(&self, codes: &[String]) -> Vec<Vec<String>> {
        match self.multi_country {
            MultiCountryMode::PerCountry if codes.len() > 1 => {
                codes.iter().map(|c| vec![c.clone()]).collect()
            }
            _ => vec![codes.to_vec()],
        }
    }

    /// Platform targeting for one group of codes.
    pub fn build(&self, codes: &[String], device: DeviceTargeting) -> Targeting {
        let countries = if codes.iter().any(|c| c == WORLDWIDE) {
            Vec::new()
        } else {
            codes.to_vec()
        };
        let user_os = match device {
            DeviceTargeting::All => Vec::new(),
            DeviceTargeting::AndroidOnly => vec!["Android".to_string()],
            DeviceTargeting::IosOnly => vec!["iOS".to_string()],
        };
        Targeting {
            countries,
            device_platforms: self.device_platforms.clone(),
            user_os,
        }
    }
}

/// Normalize one country name or code to an uppercase 2-letter code.
///
/// Two-letter values are uppercased as-is; known names map through a table;
/// anything else takes the initials of its first two words, or its first two
/// letters.
pub fn normalize_country(value: &str) -> String {
    let trimmed = value.trim();
    let lower = trimmed.to_lowercase();

    if lower == "worldwide" || lower == "ww" || lower == "global" {
        return WORLDWIDE.to_string();
    }
    if trimmed.chars().count() == 2 {
        return trimmed.to_uppercase();
    }
    if let Some((_, code)) = COUNTRY_NAMES.iter().find(|(name, _)| *name == lower) {
        return code.to_string();
    }

    let words: Vec<&str> = trimmed.split_whitespace().collect();
    if words.len() >= 2 {
        words
            .iter()
            .take(2)
            .filter_map(|w| w.chars().next())
            .collect::<String>()
            .to_uppercase()
    } else {
        trimmed.chars().take(2).collect::<String>().to_uppercase()
    }
}

/// Normalize a comma-separated country list, dropping blanks and duplicates.
/// A worldwide entry absorbs every other code.
pub fn normalize_countries(value: &str) -> Vec<String> {
    let mut codes: Vec<String> = Vec::new();
    for part in value.split(',') {
        if part.trim().is_empty() {
            continue;
        }
        let code = normalize_country(part);
        if !codes.contains(&code) {
            codes.push(code);
        }
    }
    if codes.iter().any(|c| c == WORLDWIDE) {
        return vec![WORLDWIDE.to_string()];
    }
    codes
}

/// Parse a budget written in major currency units into minor units.
pub fn parse_budget(raw: &str) -> Option<u64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() || raw.trim_start().starts_with('-') {
        return None;
    }
    let major: f64 = cleaned.parse().ok()?;
    if !major.is_finite() || major <= 0.0 {
        return None;
    }
    Some((major * 100.0).round() as u64)
}

/// Row budget, then configured default, then [`FALLBACK_DAILY_BUDGET`].
pub fn resolve_budget(raw: Option<&str>, configured: Option<u64>) -> u64 {
    if let Some(raw) = raw.filter(|r| !r.trim().is_empty()) {
        match parse_budget(raw) {
            Some(minor) => return minor,
            None => warn!(budget = raw, "Ignoring invalid budget override"),
        }
    }
    configured.unwrap_or(FALLBACK_DAILY_BUDGET)
}

/// Split and uppercase a special ad category list.
pub fn parse_special_categories(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|c| c.trim().to_uppercase().replace(' ', "_"))
        .filter(|c| !c.is_empty() && c != "NONE")
        .collect()
}
