use crate::config::{env_or, Settings};
use crate::domain::news::Headline;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://newsapi.org";
const DEFAULT_TIMEOUT_SECS: u64 = 20;
const DEFAULT_PAGE_SIZE: usize = 20;
const MAX_PAGE_SIZE: usize = 100;
const PLACEHOLDER_KEY: &str = "YOUR_API_KEY";
const REMOVED_TITLE: &str = "[Removed]";

#[async_trait::async_trait]
pub trait NewsProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Most recent headlines for `ticker`, newest first. Never fails: a missing key or a
    /// provider error yields an empty list.
    async fn fetch_headlines(&self, ticker: &str) -> Vec<Headline>;
}

#[derive(Debug, Clone)]
pub struct NewsApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    page_size: usize,
}

impl NewsApiClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings
            .news_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let api_key = settings
            .news_api_key
            .clone()
            .filter(|k| k != PLACEHOLDER_KEY);
        let timeout_secs = env_or("NEWS_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS);
        let page_size = env_or("NEWS_PAGE_SIZE", DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build news http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
            page_size,
        })
    }

    async fn fetch_once(&self, api_key: &str, ticker: &str) -> Result<Vec<Headline>> {
        let url = format!("{}/v2/everything", self.base_url.trim_end_matches('/'));
        let page_size = self.page_size.to_string();
        let res = self
            .http
            .get(url)
            .header("X-Api-Key", api_key)
            .query(&[
                ("q", ticker),
                ("language", "en"),
                ("sortBy", "publishedAt"),
                ("pageSize", page_size.as_str()),
            ])
            .send()
            .await
            .context("news request failed")?;

        let status = res.status();
        let text = res.text().await.context("failed to read news response")?;
        if !status.is_success() {
            anyhow::bail!("news HTTP {status}: {text}");
        }
        let parsed = serde_json::from_str::<NewsApiResponse>(&text)
            .with_context(|| format!("news response is not valid JSON: {text}"))?;
        Ok(into_headlines(parsed, self.page_size))
    }
}

#[async_trait::async_trait]
impl NewsProvider for NewsApiClient {
    fn provider_name(&self) -> &'static str {
        "newsapi"
    }

    async fn fetch_headlines(&self, ticker: &str) -> Vec<Headline> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::warn!(%ticker, "NEWS_API_KEY not provided; news analysis will be skipped");
            return Vec::new();
        };

        match self.fetch_once(api_key, ticker).await {
            Ok(headlines) => {
                tracing::info!(%ticker, count = headlines.len(), "fetched news headlines");
                headlines
            }
            Err(err) => {
                tracing::warn!(%ticker, error = %err, "could not fetch news; continuing without headlines");
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiArticle {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    source: Option<NewsApiSource>,
}

#[derive(Debug, Deserialize)]
struct NewsApiSource {
    #[serde(default)]
    name: Option<String>,
}

fn into_headlines(resp: NewsApiResponse, cap: usize) -> Vec<Headline> {
    resp.articles
        .into_iter()
        .filter_map(|a| {
            let title = a.title?.trim().to_string();
            if title.is_empty() || title == REMOVED_TITLE {
                return None;
            }
            let published_at = a
                .published_at
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|t| t.with_timezone(&Utc));
            Some(Headline {
                title,
                source: a
                    .source
                    .and_then(|s| s.name)
                    .unwrap_or_else(|| "Unknown".to_string()),
                published_at,
                url: a.url.unwrap_or_default(),
            })
        })
        .take(cap)
        .collect()
}
