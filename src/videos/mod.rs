/// Video discovery module
///
/// Sends a page URL to the configured model, validates the structured reply
/// and keeps the normalized result for the rest of the process lifetime.

pub mod analyzer;
pub mod normalizer;
pub mod prompt;

pub use analyzer::{CacheStats, VideoAnalyzer};
pub use normalizer::normalize_response;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// One playable file or stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoVariant {
    /// Absolute URL, or the model's original string if it could not be resolved
    pub url: String,
    /// Lowercase container or manifest extension, e.g. "mp4", "m3u8"
    pub format: String,
    /// Quality label such as "1080p" or "Audio Only"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_mb: Option<f64>,
    /// Signed or time-limited URL that may stop working
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_protected: Option<bool>,
}

impl VideoVariant {
    pub fn may_expire(&self) -> bool {
        self.is_protected.unwrap_or(false)
    }
}

/// One conceptual video with all of its quality variants
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoGroup {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity: Option<f64>,
    /// Never empty
    pub variants: Vec<VideoVariant>,
}

impl VideoGroup {
    /// Popularity used for ordering; unknown counts as zero.
    pub fn popularity_score(&self) -> f64 {
        self.popularity.unwrap_or(0.0)
    }

    /// Upload instant used for ordering; missing or unparsable dates are the Unix epoch.
    pub fn upload_instant(&self) -> DateTime<Utc> {
        self.upload_date
            .as_deref()
            .and_then(parse_upload_date)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%B %d, %Y", "%b %d, %Y", "%d %B %Y"];

/// Parse the date formats models commonly emit. Naive values are taken as UTC.
pub fn parse_upload_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.and_utc());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(raw, format) {
            return parsed.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_upload_date_formats() {
        let iso = parse_upload_date("2024-03-05T10:30:00Z").unwrap();
        assert_eq!((iso.year(), iso.month(), iso.day(), iso.hour()), (2024, 3, 5, 10));

        let offset = parse_upload_date("2024-03-05T10:30:00+02:00").unwrap();
        assert_eq!(offset.hour(), 8);

        let plain = parse_upload_date("2023-12-31").unwrap();
        assert_eq!((plain.year(), plain.month(), plain.day()), (2023, 12, 31));

        let long = parse_upload_date("January 7, 2022").unwrap();
        assert_eq!((long.year(), long.month(), long.day()), (2022, 1, 7));
    }

    #[test]
    fn test_unparsable_dates_fall_back_to_epoch() {
        let mut group = VideoGroup {
            title: "Clip".to_string(),
            thumbnail_url: None,
            category: None,
            upload_date: Some("last tuesday".to_string()),
            popularity: None,
            variants: vec![],
        };
        assert_eq!(group.upload_instant(), DateTime::<Utc>::UNIX_EPOCH);

        group.upload_date = None;
        assert_eq!(group.upload_instant(), DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(group.popularity_score(), 0.0);
    }

    #[test]
    fn test_wire_names_are_camel_case() {
        let variant = VideoVariant {
            url: "https://cdn.test/a.mp4".to_string(),
            format: "mp4".to_string(),
            resolution: Some("720p".to_string()),
            size_mb: Some(12.5),
            is_protected: Some(true),
        };
        let json = serde_json::to_value(&variant).unwrap();
        assert_eq!(json["sizeMb"], 12.5);
        assert_eq!(json["isProtected"], true);
        assert!(variant.may_expire());
    }
}
