use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    #[serde(rename = "HeartRate")]
    pub heart_rate: f64,
    #[serde(rename = "SkinConductance")]
    pub skin_conductance: f64,
    #[serde(rename = "EEG")]
    pub eeg: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct ReadingRange {
    pub name: &'static str,
    pub unit: &'static str,
    pub min: f64,
    pub max: f64,
}

impl ReadingRange {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    fn violation(&self) -> String {
        format!(
            "{} must be between {} and {} {}.",
            self.name, self.min, self.max, self.unit
        )
    }
}

pub const HEART_RATE_RANGE: ReadingRange = ReadingRange {
    name: "HRV",
    unit: "ms",
    min: 20.0,
    max: 100.0,
};

pub const EEG_RANGE: ReadingRange = ReadingRange {
    name: "EEG Alpha Waves",
    unit: "Hz",
    min: 1.0,
    max: 20.0,
};

pub const SKIN_CONDUCTANCE_RANGE: ReadingRange = ReadingRange {
    name: "GSR",
    unit: "µS",
    min: 0.01,
    max: 20.0,
};

pub const REQUIRED_BATCH_COLUMNS: [&str; 4] = ["student_id", "HeartRate", "SkinConductance", "EEG"];

impl SensorReading {
    pub fn new(heart_rate: f64, skin_conductance: f64, eeg: f64) -> Self {
        Self {
            heart_rate,
            skin_conductance,
            eeg,
        }
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !HEART_RATE_RANGE.contains(self.heart_rate) {
            errors.push(HEART_RATE_RANGE.violation());
        }
        if !EEG_RANGE.contains(self.eeg) {
            errors.push(EEG_RANGE.violation());
        }
        if !SKIN_CONDUCTANCE_RANGE.contains(self.skin_conductance) {
            errors.push(SKIN_CONDUCTANCE_RANGE.violation());
        }
        errors
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("failed to read batch file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse batch csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV must contain columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchRow {
    pub line: usize,
    pub student_id: String,
    pub reading: SensorReading,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRow {
    pub line: usize,
    pub student_id: String,
    pub errors: Vec<String>,
}

// Blank measurements are imputed by the service, so they are only counted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingBatch {
    pub rows: Vec<BatchRow>,
    pub rejected: Vec<RejectedRow>,
    pub incomplete: usize,
}

impl ReadingBatch {
    pub fn total(&self) -> usize {
        self.rows.len() + self.rejected.len() + self.incomplete
    }
}

#[derive(Debug, Deserialize)]
struct BatchCsvRow {
    student_id: String,
    #[serde(rename = "HeartRate")]
    heart_rate: Option<f64>,
    #[serde(rename = "SkinConductance")]
    skin_conductance: Option<f64>,
    #[serde(rename = "EEG")]
    eeg: Option<f64>,
    #[serde(default)]
    timestamp: Option<String>,
}

pub fn load_batch(path: &Path) -> Result<ReadingBatch, BatchError> {
    let file = std::fs::File::open(path)?;
    parse_batch(file)
}

pub fn parse_batch<R: Read>(reader: R) -> Result<ReadingBatch, BatchError> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let missing: Vec<String> = REQUIRED_BATCH_COLUMNS
        .into_iter()
        .filter(|column| !headers.iter().any(|header| header == *column))
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(BatchError::MissingColumns(missing));
    }

    let mut batch = ReadingBatch::default();
    for (index, row) in csv_reader.deserialize::<BatchCsvRow>().enumerate() {
        let row = row?;
        // header is line 1
        let line = index + 2;
        let (heart_rate, skin_conductance, eeg) = match (row.heart_rate, row.skin_conductance, row.eeg) {
            (Some(hr), Some(sc), Some(eeg)) => (hr, sc, eeg),
            _ => {
                batch.incomplete += 1;
                continue;
            }
        };

        let reading = SensorReading::new(heart_rate, skin_conductance, eeg);
        let errors = reading.validate();
        if errors.is_empty() {
            batch.rows.push(BatchRow {
                line,
                student_id: row.student_id,
                reading,
                timestamp: row.timestamp.filter(|value| !value.trim().is_empty()),
            });
        } else {
            batch.rejected.push(RejectedRow {
                line,
                student_id: row.student_id,
                errors,
            });
        }
    }

    Ok(batch)
}
