pub mod client;
pub mod config;
pub mod history;
pub mod readings;
pub mod session;
pub mod summary;
pub mod synthetic;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub use readings::SensorReading;
pub use summary::{
    summarize, AverageEngagement, HistoryStats, Summarizer, SuggestionResult, SuggestionRule,
    SummaryThresholds,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngagementLevel {
    Low,
    Moderate,
    High,
    Unknown,
}

impl EngagementLevel {
    pub fn from_value(value: i64) -> Self {
        match value {
            0 => EngagementLevel::Low,
            1 => EngagementLevel::Moderate,
            2 => EngagementLevel::High,
            _ => EngagementLevel::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EngagementLevel::Low => "Low",
            EngagementLevel::Moderate => "Moderate",
            EngagementLevel::High => "High",
            EngagementLevel::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AverageBand {
    Low,
    Moderate,
    High,
}

impl AverageBand {
    pub fn from_average(average: f64, low_below: f64, moderate_below: f64) -> Self {
        if average < low_below {
            AverageBand::Low
        } else if average < moderate_below {
            AverageBand::Moderate
        } else {
            AverageBand::High
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AverageBand::Low => "Low",
            AverageBand::Moderate => "Moderate",
            AverageBand::High => "High",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Normal,
    Mild,
    Severe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(
        default,
        deserialize_with = "de_opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub student_id: Option<String>,
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    pub input_data: SensorReading,
    #[serde(deserialize_with = "de_level")]
    pub predicted_engagement_level: i64,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_features: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub severities: BTreeMap<String, Severity>,
}

impl EngagementRecord {
    pub fn new(timestamp: NaiveDateTime, input_data: SensorReading, level: i64) -> Self {
        Self {
            id: None,
            student_id: None,
            timestamp,
            input_data,
            predicted_engagement_level: level,
            feedback: None,
            top_features: Vec::new(),
            severities: BTreeMap::new(),
        }
    }

    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }

    pub fn with_student_id(mut self, student_id: impl Into<String>) -> Self {
        self.student_id = Some(student_id.into());
        self
    }

    pub fn level(&self) -> EngagementLevel {
        EngagementLevel::from_value(self.predicted_engagement_level)
    }
}

// Offset timestamps are shifted to local time so hour checks match the dashboard.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Local).naive_local());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(parsed.with_timezone(&Local).naive_local());
    }

    let naive_formats = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for format in naive_formats {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(parsed);
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

pub mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_timestamp(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {}", raw)))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Text(String),
    Integer(i64),
    Float(f64),
}

pub(crate) fn de_opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<StringOrNumber>::deserialize(deserializer)?;
    Ok(value.map(|value| match value {
        StringOrNumber::Text(text) => text,
        StringOrNumber::Integer(number) => number.to_string(),
        StringOrNumber::Float(number) => number.to_string(),
    }))
}

// Levels occasionally arrive as whole floats (2.0) from dataframe-backed rows.
pub(crate) fn de_level<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Integer(value) => Ok(value),
        StringOrNumber::Float(value) if value.is_finite() && value.fract() == 0.0 => Ok(value as i64),
        StringOrNumber::Float(value) => Err(D::Error::custom(format!(
            "engagement level must be a whole number: {}",
            value
        ))),
        StringOrNumber::Text(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| D::Error::custom(format!("invalid engagement level: {}", text))),
    }
}

pub fn format_float(value: f64, digits: usize) -> String {
    format!("{:.1$}", value, digits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn level_labels_fall_back_to_unknown() {
        assert_eq!(EngagementLevel::from_value(0).label(), "Low");
        assert_eq!(EngagementLevel::from_value(2).label(), "High");
        assert_eq!(EngagementLevel::from_value(7).label(), "Unknown");
        assert_eq!(EngagementLevel::from_value(-1).label(), "Unknown");
    }

    #[test]
    fn naive_timestamps_keep_wall_clock_hour() {
        let parsed = parse_timestamp("2024-05-02T14:05:09.123456").unwrap();
        assert_eq!(parsed.hour(), 14);
        let spaced = parse_timestamp("2024-05-02 09:30:00").unwrap();
        assert_eq!(spaced.hour(), 9);
        assert!(parse_timestamp("2024-05-02").is_some());
        assert!(parse_timestamp("not a date").is_none());
    }

    #[test]
    fn levels_accept_whole_floats_and_reject_fractions() {
        let record = |level: &str| {
            serde_json::from_str::<EngagementRecord>(&format!(
                r#"{{"timestamp":"2024-05-02T09:00:00","input_data":{{"HeartRate":60,"SkinConductance":4,"EEG":9}},"predicted_engagement_level":{}}}"#,
                level
            ))
        };
        assert_eq!(record("2.0").unwrap().predicted_engagement_level, 2);
        assert_eq!(record("\"1\"").unwrap().predicted_engagement_level, 1);
        assert_eq!(record("7").unwrap().level(), EngagementLevel::Unknown);

        let err = record("1.5").unwrap_err();
        assert!(err.to_string().contains("whole number"), "{}", err);
    }

    #[test]
    fn timestamp_format_is_isoformat_like() {
        let parsed = parse_timestamp("2024-05-02T14:05:09").unwrap();
        assert_eq!(format_timestamp(&parsed), "2024-05-02T14:05:09");
    }
}
