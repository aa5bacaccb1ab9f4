//! Summary settings.
//!
//! Settings are validated when they are built from raw request values.
//! Focus areas are kept in canonical order (sorted, no duplicates) so that
//! equality and cache keys do not depend on how the caller listed them.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::video::Language;

pub type SettingsResult<T> = Result<T, SettingsError>;

/// Rejected settings values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("Invalid summary length '{0}'. Must be one of: short, medium, long")]
    InvalidLength(String),

    #[error("Invalid focus area '{0}'. Must be one of: technical_details, key_points, action_items, balanced_overview")]
    InvalidFocusArea(String),

    #[error("Invalid language '{0}'. Expected a code such as en, fr or pt-br")]
    InvalidLanguage(String),
}

/// Target summary length.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum SummaryLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl SummaryLength {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryLength::Short => "short",
            SummaryLength::Medium => "medium",
            SummaryLength::Long => "long",
        }
    }
}

impl FromStr for SummaryLength {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short" => Ok(SummaryLength::Short),
            "medium" => Ok(SummaryLength::Medium),
            "long" => Ok(SummaryLength::Long),
            _ => Err(SettingsError::InvalidLength(s.to_string())),
        }
    }
}

impl fmt::Display for SummaryLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aspect of the transcript the summary should emphasize.
///
/// Variant order is alphabetical by wire name; the derived `Ord` is what
/// canonical ordering uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FocusArea {
    ActionItems,
    BalancedOverview,
    KeyPoints,
    TechnicalDetails,
}

impl FocusArea {
    pub const ALL: [FocusArea; 4] = [
        FocusArea::ActionItems,
        FocusArea::BalancedOverview,
        FocusArea::KeyPoints,
        FocusArea::TechnicalDetails,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FocusArea::ActionItems => "action_items",
            FocusArea::BalancedOverview => "balanced_overview",
            FocusArea::KeyPoints => "key_points",
            FocusArea::TechnicalDetails => "technical_details",
        }
    }
}

impl FromStr for FocusArea {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FocusArea::ALL
            .into_iter()
            .find(|area| area.as_str() == s)
            .ok_or_else(|| SettingsError::InvalidFocusArea(s.to_string()))
    }
}

impl fmt::Display for FocusArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of a summary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct SummarySettings {
    pub length: SummaryLength,
    pub focus_areas: Vec<FocusArea>,
    pub language: Language,
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            length: SummaryLength::default(),
            focus_areas: vec![FocusArea::KeyPoints],
            language: Language::default(),
        }
    }
}

impl SummarySettings {
    /// Build normalized settings from typed values.
    ///
    /// An empty focus list falls back to `[key_points]`.
    pub fn new(length: SummaryLength, focus_areas: Vec<FocusArea>, language: Language) -> Self {
        Self {
            length,
            focus_areas,
            language,
        }
        .normalized()
    }

    /// Validate raw request values.
    ///
    /// `length` and `language` default when absent. Length and focus values
    /// must match their wire names exactly; surrounding whitespace is ignored.
    pub fn parse<S: AsRef<str>>(
        length: Option<&str>,
        focus_areas: &[S],
        language: Option<&str>,
    ) -> SettingsResult<Self> {
        let length = match length.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => raw.parse()?,
            None => SummaryLength::default(),
        };

        let focus_areas = focus_areas
            .iter()
            .map(|s| s.as_ref().trim())
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect::<SettingsResult<Vec<FocusArea>>>()?;

        let language = language.map(Language::parse).transpose()?.unwrap_or_default();

        Ok(Self::new(length, focus_areas, language))
    }

    /// Canonical form: focus areas sorted and deduplicated, empty list
    /// replaced by `[key_points]`. Pure and idempotent.
    pub fn normalized(&self) -> Self {
        let mut focus_areas = self.focus_areas.clone();
        focus_areas.sort();
        focus_areas.dedup();
        if focus_areas.is_empty() {
            focus_areas.push(FocusArea::KeyPoints);
        }

        Self {
            length: self.length,
            focus_areas,
            language: self.language.clone(),
        }
    }

    pub fn is_balanced_overview(&self) -> bool {
        self.focus_areas.contains(&FocusArea::BalancedOverview)
    }

    /// Comma-joined focus areas in canonical order.
    pub fn focus_key(&self) -> String {
        self.normalized()
            .focus_areas
            .iter()
            .map(FocusArea::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let settings = SummarySettings::parse::<&str>(None, &[], None).unwrap();
        assert_eq!(settings, SummarySettings::default());
        assert_eq!(settings.focus_areas, vec![FocusArea::KeyPoints]);
        assert_eq!(settings.language.as_str(), "en");
    }

    #[test]
    fn test_parse_rejects_unknown_values() {
        assert_eq!(
            SummarySettings::parse(Some("huge"), &["key_points"], None),
            Err(SettingsError::InvalidLength("huge".to_string()))
        );
        assert_eq!(
            SummarySettings::parse(Some("short"), &["key_points", "gossip"], None),
            Err(SettingsError::InvalidFocusArea("gossip".to_string()))
        );
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert_eq!(
            SummarySettings::parse(Some("SHORT"), &["key_points"], None),
            Err(SettingsError::InvalidLength("SHORT".to_string()))
        );
        assert_eq!(
            SummarySettings::parse(Some("short"), &["KEY_POINTS"], None),
            Err(SettingsError::InvalidFocusArea("KEY_POINTS".to_string()))
        );
        assert_eq!(
            SummarySettings::parse(Some(" short "), &[" key_points "], None).unwrap().length,
            SummaryLength::Short
        );
    }

    #[test]
    fn test_parse_rejects_malformed_language() {
        assert_eq!(
            SummarySettings::parse(Some("short"), &["key_points"], Some("en,fr")),
            Err(SettingsError::InvalidLanguage("en,fr".to_string()))
        );
    }

    #[test]
    fn test_focus_order_does_not_matter() {
        let a = SummarySettings::parse(Some("long"), &["technical_details", "key_points"], Some("en")).unwrap();
        let b = SummarySettings::parse(Some("long"), &["key_points", "technical_details", "key_points"], Some("en"))
            .unwrap();

        assert_eq!(a, b);
        assert_eq!(a.focus_key(), "key_points,technical_details");
    }

    #[test]
    fn test_normalized_is_idempotent() {
        let raw = SummarySettings {
            length: SummaryLength::Short,
            focus_areas: vec![FocusArea::TechnicalDetails, FocusArea::ActionItems, FocusArea::TechnicalDetails],
            language: Language::new("fr"),
        };

        let once = raw.normalized();
        assert_eq!(once.focus_areas, vec![FocusArea::ActionItems, FocusArea::TechnicalDetails]);
        assert_eq!(once.normalized(), once);
    }

    #[test]
    fn test_empty_focus_defaults_to_key_points() {
        let settings = SummarySettings::new(SummaryLength::Short, vec![], Language::default());
        assert_eq!(settings.focus_areas, vec![FocusArea::KeyPoints]);
    }

    #[test]
    fn test_serde_wire_names() {
        let settings = SummarySettings::parse(Some("short"), &["balanced_overview"], Some("de")).unwrap();
        let json = serde_json::to_value(&settings).unwrap();

        assert_eq!(json["length"], "short");
        assert_eq!(json["focus_areas"][0], "balanced_overview");
        assert_eq!(json["language"], "de");
    }
}
