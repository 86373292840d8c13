use crate::advice::policy::AdvicePolicy;
use crate::analysis::indicators::IndicatorSnapshot;
use crate::analysis::sentiment::{mean_sentiment, LexiconScorer, SentimentScorer};
use crate::analysis::technical::extract_signal;
use crate::config::Settings;
use crate::domain::fundamentals::Fundamentals;
use crate::domain::price::PriceSeries;
use crate::domain::recommendation::RiskTolerance;
use crate::domain::report::AnalysisReport;
use crate::ingest::discover::{self, SectorCatalog};
use crate::ingest::error::is_no_data;
use crate::ingest::market::{normalize_ticker, ChartApiProvider, Lookback, MarketDataProvider};
use crate::ingest::news::{NewsApiClient, NewsProvider};
use crate::llm::anthropic::AnthropicClient;
use crate::llm::{self, ChatInput, ChatMessage, LlmClient, ReportInput};
use anyhow::Context;
use std::sync::Arc;

/// Evaluation pipeline: fetches data, runs the extractor and the advice engine, and wraps
/// the LLM helpers. Holds no per-request state.
#[derive(Clone)]
pub struct Adviser {
    market: Arc<dyn MarketDataProvider>,
    news: Arc<dyn NewsProvider>,
    scorer: Arc<dyn SentimentScorer>,
    policy: AdvicePolicy,
    llm: Option<Arc<dyn LlmClient>>,
    settings: Settings,
}

impl Adviser {
    pub fn new(market: Arc<dyn MarketDataProvider>, news: Arc<dyn NewsProvider>) -> Self {
        Self {
            market,
            news,
            scorer: Arc::new(LexiconScorer::new()),
            policy: AdvicePolicy::default(),
            llm: None,
            settings: Settings::default(),
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let market = ChartApiProvider::from_settings(settings)?;
        let news = NewsApiClient::from_settings(settings)?;

        let llm: Option<Arc<dyn LlmClient>> = if settings.anthropic_api_key.is_some() {
            Some(Arc::new(AnthropicClient::from_settings(settings)?))
        } else {
            tracing::warn!("ANTHROPIC_API_KEY not set; narrative reports and chat are disabled");
            None
        };

        Ok(Self {
            llm,
            settings: settings.clone(),
            ..Self::new(Arc::new(market), Arc::new(news))
        })
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn SentimentScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_policy(mut self, policy: AdvicePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Runs one evaluation. Fails with `NoDataError` when the ticker has no price history.
    pub async fn analyze(
        &self,
        ticker: &str,
        risk: RiskTolerance,
        lookback: Lookback,
    ) -> anyhow::Result<AnalysisReport> {
        let ticker = normalize_ticker(ticker)?;

        let (history, fundamentals, headlines) = tokio::join!(
            self.market.fetch_history(&ticker, lookback),
            self.market.fetch_fundamentals(&ticker),
            self.news.fetch_headlines(&ticker),
        );

        let history = history.with_context(|| format!("price history for {ticker}"))?;
        let fundamentals = match fundamentals {
            Ok(f) => f,
            Err(err) => {
                tracing::warn!(
                    %ticker,
                    provider = self.market.provider_name(),
                    no_data = is_no_data(&err),
                    error = %err,
                    "fundamentals unavailable; continuing with price data only"
                );
                Fundamentals::empty(&ticker)
            }
        };

        let series = PriceSeries::new(history)
            .with_context(|| format!("invalid price history for {ticker}"))?;
        let sentiment = mean_sentiment(self.scorer.as_ref(), &headlines);
        let technical = extract_signal(&series);
        let recommendation = self.policy.evaluate(&technical, sentiment, risk);

        tracing::info!(
            %ticker,
            %risk,
            %lookback,
            periods = series.len(),
            headlines = headlines.len(),
            %sentiment,
            label = recommendation.label.as_str(),
            "analysis complete"
        );

        Ok(AnalysisReport {
            analysis_id: uuid::Uuid::new_v4(),
            ticker,
            generated_at: chrono::Utc::now(),
            risk,
            fundamentals,
            indicators: IndicatorSnapshot::from_series(&series),
            technical,
            sentiment,
            sentiment_direction: self.policy.direction(sentiment),
            headlines,
            recommendation,
        })
    }

    /// Narrative Markdown report for `analysis`. Never fails.
    pub async fn report(&self, analysis: &AnalysisReport) -> String {
        llm::report_or_message(self.llm.as_deref(), &ReportInput::from(analysis)).await
    }

    /// Chat reply about `ticker`. Never fails.
    pub async fn chat(&self, ticker: &str, history: Vec<ChatMessage>, prompt: &str) -> String {
        let input = ChatInput {
            ticker: ticker.trim().to_ascii_uppercase(),
            history,
            prompt: prompt.to_string(),
        };
        llm::chat_or_message(self.llm.as_deref(), &input).await
    }

    pub async fn discover(&self) -> SectorCatalog {
        discover::discover(&self.settings).await
    }
}
