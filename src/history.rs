use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

use crate::{format_timestamp, parse_timestamp, EngagementRecord, SensorReading};

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to read history: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse history json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to parse history csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid timestamp on line {line}: {value}")]
    Timestamp { line: usize, value: String },
    #[error("unsupported history format: {0} (expected .json or .csv)")]
    UnsupportedFormat(String),
}

pub fn load_history(path: &Path) -> Result<Vec<EngagementRecord>, HistoryError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "json" => {
            let data = std::fs::read_to_string(path)?;
            parse_history_json(&data)
        }
        "csv" => {
            let file = std::fs::File::open(path)?;
            parse_history_csv(file)
        }
        other => Err(HistoryError::UnsupportedFormat(other.to_string())),
    }
}

pub fn parse_history_json(data: &str) -> Result<Vec<EngagementRecord>, HistoryError> {
    if data.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(data)?)
}

#[derive(Debug, Deserialize)]
struct HistoryCsvRow {
    timestamp: String,
    #[serde(rename = "HeartRate")]
    heart_rate: f64,
    #[serde(rename = "SkinConductance")]
    skin_conductance: f64,
    #[serde(rename = "EEG")]
    eeg: f64,
    predicted_engagement_level: i64,
    #[serde(default)]
    feedback: Option<String>,
    #[serde(default)]
    student_id: Option<String>,
}

pub fn parse_history_csv<R: Read>(reader: R) -> Result<Vec<EngagementRecord>, HistoryError> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut records = Vec::new();

    for (index, row) in csv_reader.deserialize::<HistoryCsvRow>().enumerate() {
        let row = row?;
        let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| HistoryError::Timestamp {
            line: index + 2,
            value: row.timestamp.clone(),
        })?;

        let mut record = EngagementRecord::new(
            timestamp,
            SensorReading::new(row.heart_rate, row.skin_conductance, row.eeg),
            row.predicted_engagement_level,
        );
        record.feedback = row.feedback.filter(|feedback| !feedback.is_empty());
        record.student_id = row.student_id.filter(|id| !id.is_empty());
        records.push(record);
    }

    Ok(records)
}

pub fn format_record_line(record: &EngagementRecord) -> String {
    format!(
        "{} | HR {} | SC {} | EEG {} | {} | {}",
        format_timestamp(&record.timestamp),
        record.input_data.heart_rate,
        record.input_data.skin_conductance,
        record.input_data.eeg,
        record.level().label(),
        record.feedback.as_deref().filter(|text| !text.is_empty()).unwrap_or("-")
    )
}
