use chrono::Timelike;
use serde::Serialize;

use crate::summary::SummaryThresholds;
use crate::EngagementRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryStats {
    pub count: usize,
    pub average: f64,
    pub recent_average: f64,
    pub variance: f64,
    pub mode: i64,
    pub afternoon_low_count: usize,
    pub negative_feedback_count: usize,
}

impl HistoryStats {
    pub fn from_records(records: &[EngagementRecord], thresholds: &SummaryThresholds) -> Option<Self> {
        if records.is_empty() {
            return None;
        }

        let levels: Vec<i64> = records
            .iter()
            .map(|record| record.predicted_engagement_level)
            .collect();
        let values: Vec<f64> = levels.iter().map(|&level| level as f64).collect();

        let average = mean(&values);
        let window = thresholds.recent_window.max(1).min(values.len());
        let recent_average = mean(&values[values.len() - window..]);
        let variance = population_variance(&values, average);
        let mode = first_seen_mode(&levels).unwrap_or_default();

        let afternoon_hours = thresholds.afternoon_start_hour..=thresholds.afternoon_end_hour;
        let afternoon_low_count = records
            .iter()
            .filter(|record| {
                afternoon_hours.contains(&record.timestamp.hour())
                    && record.predicted_engagement_level < thresholds.afternoon_low_level
            })
            .count();

        let keyword = thresholds.feedback_keyword.to_lowercase();
        let negative_feedback_count = if keyword.is_empty() {
            0
        } else {
            records
                .iter()
                .filter_map(|record| record.feedback.as_deref())
                .filter(|feedback| feedback.to_lowercase().contains(&keyword))
                .count()
        };

        Some(Self {
            count: records.len(),
            average,
            recent_average,
            variance,
            mode,
            afternoon_low_count,
            negative_feedback_count,
        })
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn population_variance(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|value| (value - mean).powi(2)).sum::<f64>() / values.len() as f64
}

// Ties go to the level that appeared first.
fn first_seen_mode(levels: &[i64]) -> Option<i64> {
    let mut tally: Vec<(i64, usize)> = Vec::new();
    for &level in levels {
        match tally.iter_mut().find(|(seen, _)| *seen == level) {
            Some((_, count)) => *count += 1,
            None => tally.push((level, 1)),
        }
    }

    let mut best: Option<(i64, usize)> = None;
    for (level, count) in tally {
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((level, count)),
        }
    }
    best.map(|(level, _)| level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_prefers_first_seen_on_tie() {
        assert_eq!(first_seen_mode(&[0, 2, 0, 2, 0, 2]), Some(0));
        assert_eq!(first_seen_mode(&[2, 0, 2, 0]), Some(2));
        assert_eq!(first_seen_mode(&[1, 2, 2]), Some(2));
        assert_eq!(first_seen_mode(&[]), None);
    }

    #[test]
    fn variance_divides_by_count() {
        let values = [0.0, 2.0, 0.0, 2.0];
        assert!((population_variance(&values, mean(&values)) - 1.0).abs() < 1e-12);
    }
}
