pub mod advice;
pub mod analysis;
pub mod domain;
pub mod ingest;
pub mod llm;
pub mod service;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone, Default)]
    pub struct Settings {
        pub news_api_key: Option<String>,
        pub anthropic_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub market_data_base_url: Option<String>,
        pub news_base_url: Option<String>,
        pub constituents_url: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                news_api_key: non_empty_var("NEWS_API_KEY"),
                anthropic_api_key: non_empty_var("ANTHROPIC_API_KEY"),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
                market_data_base_url: non_empty_var("MARKET_DATA_BASE_URL"),
                news_base_url: non_empty_var("NEWS_BASE_URL"),
                constituents_url: non_empty_var("CONSTITUENTS_URL"),
            })
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }

        pub fn require_constituents_url(&self) -> anyhow::Result<&str> {
            self.constituents_url
                .as_deref()
                .context("CONSTITUENTS_URL is required")
        }
    }

    fn non_empty_var(name: &str) -> Option<String> {
        std::env::var(name)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Reads a numeric tunable, falling back to `default` when unset or unparsable.
    pub fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
        std::env::var(name)
            .ok()
            .and_then(|s| s.trim().parse::<T>().ok())
            .unwrap_or(default)
    }
}
