use crate::config::{env_or, Settings};
use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 20;
const OTHER_SECTOR: &str = "Other";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedStock {
    pub symbol: String,
    pub description: String,
}

pub type SectorCatalog = BTreeMap<String, Vec<ListedStock>>;

/// One row of an index constituents listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ConstituentRecord {
    #[serde(default, alias = "Symbol")]
    pub symbol: Option<String>,
    #[serde(default, alias = "Security", alias = "name")]
    pub security: Option<String>,
    #[serde(default, alias = "Sector", alias = "GICS Sector")]
    pub sector: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ConstituentsSource {
    http: reqwest::Client,
    url: String,
}

impl ConstituentsSource {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let url = settings.require_constituents_url()?.to_string();
        let timeout_secs = env_or("CONSTITUENTS_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS);
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build constituents http client")?;
        Ok(Self { http, url })
    }

    pub async fn fetch(&self) -> Result<SectorCatalog> {
        let res = self
            .http
            .get(&self.url)
            .send()
            .await
            .context("constituents request failed")?;
        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read constituents response")?;
        if !status.is_success() {
            anyhow::bail!("constituents HTTP {status}: {text}");
        }

        let records = serde_json::from_str::<Vec<ConstituentRecord>>(&text)
            .context("constituents response is not a JSON list of records")?;
        let catalog = group_by_sector(records);
        ensure!(!catalog.is_empty(), "constituents listing has no usable rows");
        Ok(catalog)
    }
}

/// `BRK.B` style class suffixes use a dash on the market data side.
pub fn market_symbol(raw: &str) -> String {
    raw.trim().replace('.', "-")
}

pub fn group_by_sector(records: impl IntoIterator<Item = ConstituentRecord>) -> SectorCatalog {
    let mut out = SectorCatalog::new();
    for r in records {
        let Some(symbol) = r
            .symbol
            .as_deref()
            .map(market_symbol)
            .filter(|s| !s.is_empty())
        else {
            continue;
        };
        let sector = r
            .sector
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| OTHER_SECTOR.to_string());
        let description = r
            .security
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| symbol.clone());
        out.entry(sector)
            .or_default()
            .push(ListedStock { symbol, description });
    }
    out
}

pub fn fallback_catalog() -> SectorCatalog {
    let rows: [(&str, &str, &str); 12] = [
        ("Technology", "AAPL", "Apple Inc."),
        ("Technology", "MSFT", "Microsoft Corporation"),
        ("Technology", "GOOGL", "Alphabet Inc."),
        ("Technology", "NVDA", "NVIDIA Corporation"),
        ("Consumer", "AMZN", "Amazon.com, Inc."),
        ("Consumer", "TSLA", "Tesla, Inc."),
        ("Consumer", "HD", "The Home Depot, Inc."),
        ("Consumer Staples", "PG", "The Procter & Gamble Company"),
        ("Financials", "JPM", "JPMorgan Chase & Co."),
        ("Financials", "V", "Visa Inc."),
        ("Healthcare", "JNJ", "Johnson & Johnson"),
        ("Healthcare", "UNH", "UnitedHealth Group Incorporated"),
    ];
    group_by_sector(rows.into_iter().map(|(sector, symbol, name)| ConstituentRecord {
        symbol: Some(symbol.to_string()),
        security: Some(name.to_string()),
        sector: Some(sector.to_string()),
    }))
}

/// Sector-grouped listing of well-known stocks. Never fails; falls back to a small curated set.
pub async fn discover(settings: &Settings) -> SectorCatalog {
    let fetched = match ConstituentsSource::from_settings(settings) {
        Ok(source) => source.fetch().await,
        Err(err) => Err(err),
    };
    match fetched {
        Ok(catalog) => {
            tracing::info!(sectors = catalog.len(), "loaded constituents listing");
            catalog
        }
        Err(err) => {
            tracing::warn!(error = %err, "constituents listing unavailable; using built-in catalog");
            fallback_catalog()
        }
    }
}
