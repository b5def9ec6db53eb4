use focus_monitor::{EngagementRecord, HistoryStats, SuggestionResult, SuggestionRule};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ApiSummarizeRequest {
    #[serde(default)]
    pub student_id: Option<String>,
    pub records: Vec<EngagementRecord>,
}

#[derive(Debug, Serialize)]
pub struct ApiSummaryResponse {
    pub student_id: Option<String>,
    pub record_count: usize,
    pub average_level: Option<String>,
    pub average_value: Option<f64>,
    pub band: Option<String>,
    pub suggestions: Vec<String>,
    pub rules: Vec<SuggestionRule>,
    pub stats: Option<HistoryStats>,
}

impl ApiSummaryResponse {
    pub fn from_result(result: SuggestionResult, student_id: Option<String>, record_count: usize) -> Self {
        Self {
            student_id,
            record_count,
            average_level: result.average_label(),
            average_value: result.average.map(|average| average.value),
            band: result.average.map(|average| average.band.label().to_string()),
            suggestions: result.suggestions,
            rules: result.rules,
            stats: result.stats,
        }
    }
}
