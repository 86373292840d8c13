pub mod anthropic;
pub mod error;
pub mod prompts;

use crate::advice::SentimentDirection;
use crate::analysis::sentiment::SentimentScore;
use crate::analysis::technical::TechnicalSignal;
use crate::domain::fundamentals::Fundamentals;
use crate::domain::recommendation::RiskTolerance;
use crate::domain::report::AnalysisReport;
use serde::{Deserialize, Serialize};

/// Fact sheet the narrative report is written from.
#[derive(Debug, Clone)]
pub struct ReportInput {
    pub fundamentals: Fundamentals,
    pub risk: RiskTolerance,
    pub latest_close: Option<f64>,
    pub technical: TechnicalSignal,
    pub sentiment: SentimentScore,
    pub sentiment_direction: SentimentDirection,
}

impl From<&AnalysisReport> for ReportInput {
    fn from(report: &AnalysisReport) -> Self {
        Self {
            fundamentals: report.fundamentals.clone(),
            risk: report.risk,
            latest_close: report.latest_close(),
            technical: report.technical,
            sentiment: report.sentiment,
            sentiment_direction: report.sentiment_direction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatInput {
    pub ticker: String,
    pub history: Vec<ChatMessage>,
    pub prompt: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
}

#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> Provider;

    /// Markdown report with the five `### ` sections.
    async fn generate_report(&self, input: &ReportInput) -> anyhow::Result<String>;

    async fn chat(&self, input: &ChatInput) -> anyhow::Result<String>;
}

pub const MISSING_KEY_REPORT: &str = "### LLM API Key Not Provided\n\n\
Set ANTHROPIC_API_KEY to generate a detailed narrative report.";

pub const MISSING_KEY_CHAT: &str =
    "Error: the LLM API key is not provided. Set ANTHROPIC_API_KEY to enable the chat.";

/// Report text for display. Never fails; problems become a Markdown message.
pub async fn report_or_message(client: Option<&dyn LlmClient>, input: &ReportInput) -> String {
    let Some(client) = client else {
        return MISSING_KEY_REPORT.to_string();
    };
    match client.generate_report(input).await {
        Ok(text) => text,
        Err(err) => {
            tracing::error!(
                symbol = %input.fundamentals.symbol,
                provider = ?client.provider(),
                error = %err,
                "report generation failed"
            );
            error::report_failure_message(&err)
        }
    }
}

/// Chat reply for display. Never fails; problems become a user-facing message.
pub async fn chat_or_message(client: Option<&dyn LlmClient>, input: &ChatInput) -> String {
    let Some(client) = client else {
        return MISSING_KEY_CHAT.to_string();
    };
    match client.chat(input).await {
        Ok(text) => text,
        Err(err) => {
            tracing::error!(
                ticker = %input.ticker,
                provider = ?client.provider(),
                error = %err,
                "chat request failed"
            );
            error::chat_failure_message(&err)
        }
    }
}
