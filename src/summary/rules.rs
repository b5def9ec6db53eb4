use serde::{Deserialize, Serialize};

use crate::summary::HistoryStats;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryThresholds {
    pub recent_window: usize,
    pub acute_recent_average: f64,
    pub declining_average: f64,
    pub volatility_variance: f64,
    pub sustained_high_level: i64,
    pub sustained_high_average: f64,
    pub afternoon_start_hour: u32,
    pub afternoon_end_hour: u32,
    pub afternoon_low_level: i64,
    pub afternoon_low_count: usize,
    pub feedback_keyword: String,
    pub negative_feedback_count: usize,
    pub band_low_below: f64,
    pub band_moderate_below: f64,
}

impl Default for SummaryThresholds {
    fn default() -> Self {
        Self {
            recent_window: 5,
            acute_recent_average: 0.5,
            declining_average: 1.0,
            volatility_variance: 0.5,
            sustained_high_level: 2,
            sustained_high_average: 1.5,
            afternoon_start_hour: 13,
            afternoon_end_hour: 16,
            afternoon_low_level: 1,
            afternoon_low_count: 2,
            feedback_keyword: "boring".to_string(),
            negative_feedback_count: 1,
            band_low_below: 0.8,
            band_moderate_below: 1.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionRule {
    AcuteDisengagement,
    DecliningTrend,
    Volatility,
    SustainedHigh,
    AfternoonDip,
    NegativeFeedback,
    Stable,
}

impl SuggestionRule {
    pub const ORDERED: [SuggestionRule; 6] = [
        SuggestionRule::AcuteDisengagement,
        SuggestionRule::DecliningTrend,
        SuggestionRule::Volatility,
        SuggestionRule::SustainedHigh,
        SuggestionRule::AfternoonDip,
        SuggestionRule::NegativeFeedback,
    ];

    pub fn applies(self, stats: &HistoryStats, thresholds: &SummaryThresholds) -> bool {
        match self {
            SuggestionRule::AcuteDisengagement => {
                stats.recent_average < thresholds.acute_recent_average
            }
            SuggestionRule::DecliningTrend => {
                stats.average < thresholds.declining_average
                    && stats.recent_average < stats.average
            }
            SuggestionRule::Volatility => stats.variance > thresholds.volatility_variance,
            SuggestionRule::SustainedHigh => {
                stats.mode == thresholds.sustained_high_level
                    && stats.average > thresholds.sustained_high_average
            }
            SuggestionRule::AfternoonDip => {
                stats.afternoon_low_count > thresholds.afternoon_low_count
            }
            SuggestionRule::NegativeFeedback => {
                stats.negative_feedback_count > thresholds.negative_feedback_count
            }
            SuggestionRule::Stable => false,
        }
    }

    pub fn messages(self) -> &'static [&'static str] {
        match self {
            SuggestionRule::AcuteDisengagement => &[
                "Very low recent focus. Try interactive activities like quizzes or peer discussion.",
                "Use multimedia or personal storytelling to stimulate attention.",
            ],
            SuggestionRule::DecliningTrend => &[
                "Engagement is dropping. Try short learning bursts and gamified tasks.",
                "Introduce collaborative exercises to improve involvement.",
            ],
            SuggestionRule::Volatility => &[
                "Engagement fluctuates. Recommend fixed daily schedules or structured breaks (e.g., 25 min study, 5 min break).",
                "Use Pomodoro or 45-10 minute learning cycles.",
            ],
            SuggestionRule::SustainedHigh => &[
                "Consistently engaged! Offer enrichment tasks like small research projects.",
                "Let them support peers, present topics, or take on advanced challenges.",
            ],
            SuggestionRule::AfternoonDip => &[
                "Low afternoon engagement detected. Use lighter content post-lunch or encourage short naps.",
                "Offer short audio/video learning aids during those hours.",
            ],
            SuggestionRule::NegativeFeedback => &[
                "Repeated negative feedback.",
                "Add visuals, simulations, or hands-on exercises.",
            ],
            SuggestionRule::Stable => &[
                "Engagement is stable. Continue using your current strategies, but stay flexible.",
            ],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SuggestionRule::AcuteDisengagement => "acute disengagement",
            SuggestionRule::DecliningTrend => "declining trend",
            SuggestionRule::Volatility => "volatility",
            SuggestionRule::SustainedHigh => "sustained high engagement",
            SuggestionRule::AfternoonDip => "afternoon dip",
            SuggestionRule::NegativeFeedback => "negative feedback",
            SuggestionRule::Stable => "stable",
        }
    }
}
