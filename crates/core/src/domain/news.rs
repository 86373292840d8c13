use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One externally sourced news item. Only the title feeds sentiment scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    pub source: String,
    pub published_at: Option<DateTime<Utc>>,
    pub url: String,
}

impl Headline {
    /// Publish date as `YYYY-MM-DD`, or an empty string when the provider omitted it.
    pub fn published_date(&self) -> String {
        self.published_at
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }
}
