use serde::Serialize;
use std::fmt;

use crate::summary::{HistoryStats, SuggestionRule, SummaryThresholds};
use crate::{AverageBand, EngagementRecord};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AverageEngagement {
    pub value: f64,
    pub band: AverageBand,
}

impl fmt::Display for AverageEngagement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} ({})", self.value, self.band.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestionResult {
    pub average: Option<AverageEngagement>,
    pub suggestions: Vec<String>,
    pub rules: Vec<SuggestionRule>,
    pub stats: Option<HistoryStats>,
}

impl SuggestionResult {
    fn empty() -> Self {
        Self {
            average: None,
            suggestions: Vec::new(),
            rules: Vec::new(),
            stats: None,
        }
    }

    pub fn average_label(&self) -> Option<String> {
        self.average.map(|average| average.to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Summarizer {
    thresholds: SummaryThresholds,
}

impl Summarizer {
    pub fn new(thresholds: SummaryThresholds) -> Self {
        Self { thresholds }
    }

    pub fn summarize(&self, records: &[EngagementRecord]) -> SuggestionResult {
        let stats = match HistoryStats::from_records(records, &self.thresholds) {
            Some(stats) => stats,
            None => return SuggestionResult::empty(),
        };

        let band = AverageBand::from_average(
            stats.average,
            self.thresholds.band_low_below,
            self.thresholds.band_moderate_below,
        );

        let mut rules: Vec<SuggestionRule> = SuggestionRule::ORDERED
            .into_iter()
            .filter(|rule| rule.applies(&stats, &self.thresholds))
            .collect();
        if rules.is_empty() {
            rules.push(SuggestionRule::Stable);
        }

        let suggestions = rules
            .iter()
            .flat_map(|rule| rule.messages().iter().map(|message| message.to_string()))
            .collect();

        SuggestionResult {
            average: Some(AverageEngagement {
                value: stats.average,
                band,
            }),
            suggestions,
            rules,
            stats: Some(stats),
        }
    }
}

pub fn summarize(records: &[EngagementRecord]) -> SuggestionResult {
    Summarizer::default().summarize(records)
}
