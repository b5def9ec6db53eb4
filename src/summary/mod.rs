pub mod rules;
pub mod stats;
pub mod summarizer;

pub use rules::{SuggestionRule, SummaryThresholds};
pub use stats::HistoryStats;
pub use summarizer::{summarize, AverageEngagement, Summarizer, SuggestionResult};
