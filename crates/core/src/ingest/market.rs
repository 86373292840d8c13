use crate::config::{env_or, Settings};
use crate::domain::fundamentals::Fundamentals;
use crate::domain::price::PricePoint;
use crate::ingest::error::{is_no_data, NoDataError};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRIES: u32 = 1;
const MAX_RETRIES: u32 = 8;
const USER_AGENT: &str = "adviser/0.1";

#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Daily bars, oldest first. Unknown tickers and empty histories fail with `NoDataError`.
    async fn fetch_history(&self, ticker: &str, lookback: Lookback) -> Result<Vec<PricePoint>>;

    async fn fetch_fundamentals(&self, ticker: &str) -> Result<Fundamentals>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lookback {
    OneMonth,
    ThreeMonths,
    SixMonths,
    #[default]
    OneYear,
    TwoYears,
    FiveYears,
    Max,
}

impl Lookback {
    pub fn as_range(&self) -> &'static str {
        match self {
            Self::OneMonth => "1mo",
            Self::ThreeMonths => "3mo",
            Self::SixMonths => "6mo",
            Self::OneYear => "1y",
            Self::TwoYears => "2y",
            Self::FiveYears => "5y",
            Self::Max => "max",
        }
    }
}

impl fmt::Display for Lookback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_range())
    }
}

impl FromStr for Lookback {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1mo" => Ok(Self::OneMonth),
            "3mo" => Ok(Self::ThreeMonths),
            "6mo" => Ok(Self::SixMonths),
            "1y" => Ok(Self::OneYear),
            "2y" => Ok(Self::TwoYears),
            "5y" => Ok(Self::FiveYears),
            "max" => Ok(Self::Max),
            other => anyhow::bail!("unsupported period {other:?} (expected 1mo, 3mo, 6mo, 1y, 2y, 5y or max)"),
        }
    }
}

/// Trims and upper-cases a user-entered ticker.
pub fn normalize_ticker(raw: &str) -> Result<String> {
    let ticker = raw.trim().to_ascii_uppercase();
    anyhow::ensure!(!ticker.is_empty(), "ticker must be non-empty");
    anyhow::ensure!(
        ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=')),
        "ticker contains unsupported characters: {ticker:?}"
    );
    Ok(ticker)
}

/// Chart + quote JSON endpoints in the Yahoo Finance v8/v7 shape.
#[derive(Debug, Clone)]
pub struct ChartApiProvider {
    http: reqwest::Client,
    base_url: String,
    retries: u32,
}

impl ChartApiProvider {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings
            .market_data_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let timeout_secs = env_or("MARKET_DATA_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS);
        let retries = env_or("MARKET_DATA_RETRIES", DEFAULT_RETRIES).clamp(1, MAX_RETRIES);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build market data http client")?;

        Ok(Self {
            http,
            base_url,
            retries,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn get_json_once(&self, url: &str, query: &[(&str, &str)]) -> Result<(reqwest::StatusCode, Value)> {
        let res = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .context("market data request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read market data response")?;
        let raw_json = serde_json::from_str::<Value>(&text)
            .with_context(|| format!("market data response is not valid JSON (HTTP {status}): {text}"))?;
        Ok((status, raw_json))
    }

    async fn get_json<T, F>(&self, url: &str, query: &[(&str, &str)], parse: F) -> Result<T>
    where
        F: Fn(reqwest::StatusCode, Value) -> Result<T>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let res = self
                .get_json_once(url, query)
                .await
                .and_then(|(status, raw)| parse(status, raw));
            match res {
                Ok(v) => return Ok(v),
                Err(err) if is_no_data(&err) => return Err(err),
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err);
                    }
                    let backoff = retry_backoff(attempt);
                    tracing::warn!(attempt, ?backoff, error = %err, "market data fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

/// Doubling delay after failed attempt `attempt` (1-based): 1s, 2s, 4s, ...
fn retry_backoff(attempt: u32) -> Duration {
    let secs = 1u64
        .checked_shl(attempt.saturating_sub(1))
        .unwrap_or(u64::MAX);
    Duration::from_secs(secs)
}

#[async_trait::async_trait]
impl MarketDataProvider for ChartApiProvider {
    fn provider_name(&self) -> &'static str {
        "chart_api"
    }

    async fn fetch_history(&self, ticker: &str, lookback: Lookback) -> Result<Vec<PricePoint>> {
        let ticker = normalize_ticker(ticker)?;
        let url = self.url(&format!("/v8/finance/chart/{ticker}"));
        let query = [("range", lookback.as_range()), ("interval", "1d")];
        let bars = self
            .get_json(&url, &query, |status, raw| parse_chart(&ticker, status, raw))
            .await?;
        tracing::debug!(%ticker, %lookback, bars = bars.len(), "fetched price history");
        Ok(bars)
    }

    async fn fetch_fundamentals(&self, ticker: &str) -> Result<Fundamentals> {
        let ticker = normalize_ticker(ticker)?;
        let url = self.url("/v7/finance/quote");
        let query = [("symbols", ticker.as_str())];
        self.get_json(&url, &query, |status, raw| parse_quote(&ticker, status, raw))
            .await
    }
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl ApiError {
    fn describe(&self) -> String {
        match (&self.code, &self.description) {
            (Some(c), Some(d)) => format!("{c}: {d}"),
            (Some(c), None) => c.clone(),
            (None, Some(d)) => d.clone(),
            (None, None) => "provider reported an error".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

fn parse_chart(ticker: &str, status: reqwest::StatusCode, raw: Value) -> Result<Vec<PricePoint>> {
    let envelope = serde_json::from_value::<ChartEnvelope>(raw.clone())
        .with_context(|| format!("unexpected chart response shape (HTTP {status}): {raw}"))?;

    if let Some(err) = envelope.chart.error {
        return Err(NoDataError::new(ticker, err.describe()).into());
    }
    if !status.is_success() {
        anyhow::bail!("market data HTTP {status}: {raw}");
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Err(NoDataError::new(ticker, "chart result is empty").into());
    };
    let timestamps = result.timestamp.unwrap_or_default();
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    // Keyed by date so a trailing intraday bar replaces the same day's bar.
    let mut by_date = BTreeMap::<NaiveDate, PricePoint>::new();
    for (i, ts) in timestamps.iter().enumerate() {
        let at = |v: &Vec<Option<f64>>| v.get(i).copied().flatten().filter(|x| x.is_finite());
        let (Some(open), Some(high), Some(low), Some(close)) =
            (at(&quote.open), at(&quote.high), at(&quote.low), at(&quote.close))
        else {
            continue;
        };
        let Some(date) = DateTime::from_timestamp(*ts, 0).map(|t| t.date_naive()) else {
            continue;
        };
        let volume = at(&quote.volume).map(|v| v.max(0.0) as u64).unwrap_or(0);
        by_date.insert(
            date,
            PricePoint {
                date,
                open,
                high,
                low,
                close,
                volume,
            },
        );
    }

    if by_date.is_empty() {
        return Err(NoDataError::new(ticker, "no historical bars returned").into());
    }
    Ok(by_date.into_values().collect())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteEnvelope {
    quote_response: QuoteBody,
}

#[derive(Debug, Deserialize)]
struct QuoteBody {
    #[serde(default)]
    result: Vec<QuoteRecord>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteRecord {
    symbol: String,
    #[serde(default)]
    long_name: Option<String>,
    #[serde(default)]
    short_name: Option<String>,
    #[serde(default)]
    sector: Option<String>,
    #[serde(default)]
    market_cap: Option<f64>,
    #[serde(default, rename = "trailingPE")]
    trailing_pe: Option<f64>,
    #[serde(default)]
    beta: Option<f64>,
    #[serde(default)]
    fifty_two_week_high: Option<f64>,
    #[serde(default)]
    fifty_two_week_low: Option<f64>,
    #[serde(default)]
    trailing_annual_dividend_yield: Option<f64>,
}

fn parse_quote(ticker: &str, status: reqwest::StatusCode, raw: Value) -> Result<Fundamentals> {
    let envelope = serde_json::from_value::<QuoteEnvelope>(raw.clone())
        .with_context(|| format!("unexpected quote response shape (HTTP {status}): {raw}"))?;

    if let Some(err) = envelope.quote_response.error {
        anyhow::bail!("quote endpoint error for {ticker}: {}", err.describe());
    }
    if !status.is_success() {
        anyhow::bail!("market data HTTP {status}: {raw}");
    }

    let Some(q) = envelope
        .quote_response
        .result
        .into_iter()
        .find(|q| q.symbol.eq_ignore_ascii_case(ticker))
    else {
        return Err(NoDataError::new(ticker, "quote result is empty").into());
    };

    Ok(Fundamentals {
        symbol: q.symbol,
        long_name: q.long_name.or(q.short_name),
        sector: q.sector,
        market_cap: q.market_cap.filter(|v| v.is_finite() && *v >= 0.0).map(|v| v as u64),
        trailing_pe: q.trailing_pe.filter(|v| v.is_finite()),
        beta: q.beta.filter(|v| v.is_finite()),
        fifty_two_week_high: q.fifty_two_week_high,
        fifty_two_week_low: q.fifty_two_week_low,
        dividend_yield: q.trailing_annual_dividend_yield.filter(|v| v.is_finite()),
    })
}
