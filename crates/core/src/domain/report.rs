use crate::advice::SentimentDirection;
use crate::analysis::indicators::IndicatorSnapshot;
use crate::analysis::sentiment::SentimentScore;
use crate::analysis::technical::TechnicalSignal;
use crate::domain::fundamentals::Fundamentals;
use crate::domain::news::Headline;
use crate::domain::recommendation::{Recommendation, RiskTolerance};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Everything one evaluation produced, handed to the presentation layer as a value.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub analysis_id: Uuid,
    pub ticker: String,
    pub generated_at: DateTime<Utc>,
    pub risk: RiskTolerance,
    pub fundamentals: Fundamentals,
    pub indicators: Option<IndicatorSnapshot>,
    pub technical: TechnicalSignal,
    pub sentiment: SentimentScore,
    pub sentiment_direction: SentimentDirection,
    pub headlines: Vec<Headline>,
    pub recommendation: Recommendation,
}

impl AnalysisReport {
    pub fn latest_close(&self) -> Option<f64> {
        self.indicators.as_ref().map(|i| i.close)
    }
}
