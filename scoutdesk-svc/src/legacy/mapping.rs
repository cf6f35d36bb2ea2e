//! Legacy value mapping: ratings, positions, verdicts, dates

use chrono::{DateTime, NaiveDate, Utc};

use crate::options::OptionSet;

/// Legacy position spellings not present in the option tables
const POSITION_ALIASES: &[(&str, &str)] = &[
    ("ST", "FW"),
    ("CF", "FW"),
    ("SPITS", "FW"),
    ("CAM", "ACM"),
    ("AM", "ACM"),
    ("CDM", "DM"),
    ("RWB", "RB"),
    ("LWB", "LB"),
    ("RM", "RW"),
    ("LM", "LW"),
    ("KEEPER", "GK"),
    ("GK", "GK"),
];

const DATE_FORMATS: &[&str] = &["%d-%m-%Y", "%Y-%m-%d", "%d/%m/%Y"];

/// Scale a legacy rating onto 1..=10
///
/// - 0.5..=5.0 is the old five-star scale: doubled, then rounded
/// - above 5 up to 10 is already on the ten-point scale: rounded
/// - anything else (blank, non-numeric, out of range) is `None`
///
/// A decimal comma is accepted.
pub fn scale_rating(raw: &str) -> Option<i64> {
    let value: f64 = raw.trim().replace(',', ".").parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    let scaled = if (0.5..=5.0).contains(&value) {
        (value * 2.0).round()
    } else if value > 5.0 && value <= 10.0 {
        value.round()
    } else {
        return None;
    };
    Some((scaled as i64).clamp(1, 10))
}

/// Map a legacy position onto the position option set
pub fn map_position(raw: &str, positions: &OptionSet) -> Option<String> {
    if let Some(value) = positions.resolve(raw) {
        return Some(value);
    }
    let upper = raw.trim().to_uppercase();
    POSITION_ALIASES
        .iter()
        .find(|(alias, _)| *alias == upper)
        .and_then(|(_, canonical)| positions.resolve(canonical))
}

/// Map a legacy verdict onto the verdict option set
pub fn map_verdict(raw: Option<&str>, verdicts: &OptionSet) -> Option<String> {
    verdicts.resolve(raw?)
}

/// Parse a legacy `DATE` cell as midnight UTC
pub fn parse_legacy_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{OptionItem, OptionSet};

    fn positions() -> OptionSet {
        OptionSet {
            items: ["GK", "CB", "RB", "LB", "DM", "CM", "ACM", "RW", "LW", "FW"]
                .iter()
                .map(|v| OptionItem {
                    value: v.to_string(),
                    label: v.to_string(),
                })
                .collect(),
            from_defaults: true,
        }
    }

    #[test]
    fn test_five_point_scale_doubled() {
        assert_eq!(scale_rating("4.0"), Some(8));
        assert_eq!(scale_rating("0.5"), Some(1));
        assert_eq!(scale_rating("3,5"), Some(7));
        assert_eq!(scale_rating("5"), Some(10));
        assert_eq!(scale_rating("2.25"), Some(5));
    }

    #[test]
    fn test_ten_point_scale_kept() {
        assert_eq!(scale_rating("7"), Some(7));
        assert_eq!(scale_rating("6.5"), Some(7));
        assert_eq!(scale_rating("10"), Some(10));
    }

    #[test]
    fn test_unusable_ratings() {
        assert_eq!(scale_rating(""), None);
        assert_eq!(scale_rating("goed"), None);
        assert_eq!(scale_rating("0.2"), None);
        assert_eq!(scale_rating("11"), None);
        assert_eq!(scale_rating("NaN"), None);
    }

    #[test]
    fn test_position_aliases() {
        let set = positions();
        assert_eq!(map_position("cm", &set).as_deref(), Some("CM"));
        assert_eq!(map_position("ST", &set).as_deref(), Some("FW"));
        assert_eq!(map_position("cam", &set).as_deref(), Some("ACM"));
        assert_eq!(map_position("Keeper", &set).as_deref(), Some("GK"));
        assert_eq!(map_position("libero", &set), None);
    }

    #[test]
    fn test_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2021, 3, 1).unwrap();
        for raw in ["01-03-2021", "2021-03-01", "01/03/2021"] {
            assert_eq!(parse_legacy_date(raw).unwrap().date_naive(), expected, "{}", raw);
        }
        assert!(parse_legacy_date("maart").is_none());
    }
}
