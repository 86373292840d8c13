use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use adviser_core::domain::recommendation::RiskTolerance;
use adviser_core::domain::report::AnalysisReport;
use adviser_core::ingest::discover::SectorCatalog;
use adviser_core::ingest::error::is_no_data;
use adviser_core::ingest::market::{normalize_ticker, Lookback};
use adviser_core::llm::ChatMessage;
use adviser_core::service::Adviser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = adviser_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let adviser = Adviser::from_settings(&settings)?;
    let state = AppState {
        adviser: Arc::new(adviser),
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/analysis/:ticker", get(get_analysis))
        .route("/report", post(post_report))
        .route("/chat", post(post_chat))
        .route("/discover", get(get_discover))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    adviser: Arc<Adviser>,
}

#[derive(Debug, Default, Deserialize)]
struct AnalysisParams {
    risk: Option<String>,
    period: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
struct AnalysisRequest {
    ticker: String,
    risk: RiskTolerance,
    lookback: Lookback,
}

fn parse_request(
    ticker: &str,
    risk: Option<&str>,
    period: Option<&str>,
) -> Result<AnalysisRequest, StatusCode> {
    let ticker = normalize_ticker(ticker).map_err(|_| StatusCode::BAD_REQUEST)?;
    let risk = match risk {
        Some(r) => r.parse().map_err(|_| StatusCode::BAD_REQUEST)?,
        None => RiskTolerance::default(),
    };
    let lookback = match period {
        Some(p) => p.parse().map_err(|_| StatusCode::BAD_REQUEST)?,
        None => Lookback::default(),
    };
    Ok(AnalysisRequest {
        ticker,
        risk,
        lookback,
    })
}

fn status_for(err: &anyhow::Error) -> StatusCode {
    if is_no_data(err) {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

async fn run_analysis(
    adviser: &Adviser,
    req: &AnalysisRequest,
) -> Result<AnalysisReport, StatusCode> {
    adviser
        .analyze(&req.ticker, req.risk, req.lookback)
        .await
        .map_err(|e| {
            let status = status_for(&e);
            if status == StatusCode::NOT_FOUND {
                tracing::info!(ticker = %req.ticker, error = %e, "no data for ticker");
            } else {
                sentry_anyhow::capture_anyhow(&e);
                tracing::error!(ticker = %req.ticker, error = %e, "analysis failed");
            }
            status
        })
}

async fn get_analysis(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(params): Query<AnalysisParams>,
) -> Result<Json<AnalysisReport>, StatusCode> {
    let req = parse_request(&ticker, params.risk.as_deref(), params.period.as_deref())?;
    let report = run_analysis(&state.adviser, &req).await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
struct ReportBody {
    ticker: String,
    risk: Option<String>,
    period: Option<String>,
}

#[derive(Debug, Serialize)]
struct ReportResponse {
    analysis: AnalysisReport,
    report: String,
}

async fn post_report(
    State(state): State<AppState>,
    Json(body): Json<ReportBody>,
) -> Result<Json<ReportResponse>, StatusCode> {
    let req = parse_request(&body.ticker, body.risk.as_deref(), body.period.as_deref())?;
    let analysis = run_analysis(&state.adviser, &req).await?;
    let report = state.adviser.report(&analysis).await;
    Ok(Json(ReportResponse { analysis, report }))
}

#[derive(Debug, Deserialize)]
struct ChatBody {
    ticker: String,
    #[serde(default)]
    history: Vec<ChatMessage>,
    prompt: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    reply: String,
}

async fn post_chat(
    State(state): State<AppState>,
    Json(body): Json<ChatBody>,
) -> Result<Json<ChatResponse>, StatusCode> {
    let ticker = normalize_ticker(&body.ticker).map_err(|_| StatusCode::BAD_REQUEST)?;
    if body.prompt.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let reply = state.adviser.chat(&ticker, body.history, &body.prompt).await;
    Ok(Json(ChatResponse { reply }))
}

async fn get_discover(State(state): State<AppState>) -> Json<SectorCatalog> {
    Json(state.adviser.discover().await)
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &adviser_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use adviser_core::ingest::error::NoDataError;

    #[test]
    fn parses_query_with_defaults() {
        let req = parse_request(" aapl ", None, None).unwrap();
        assert_eq!(req.ticker, "AAPL");
        assert_eq!(req.risk, RiskTolerance::Medium);
        assert_eq!(req.lookback, Lookback::OneYear);

        let req = parse_request("msft", Some("high"), Some("5y")).unwrap();
        assert_eq!(req.risk, RiskTolerance::High);
        assert_eq!(req.lookback, Lookback::FiveYears);
    }

    #[test]
    fn bad_input_is_bad_request() {
        assert_eq!(parse_request("", None, None), Err(StatusCode::BAD_REQUEST));
        assert_eq!(
            parse_request("AAPL", Some("reckless"), None),
            Err(StatusCode::BAD_REQUEST)
        );
        assert_eq!(
            parse_request("AAPL", None, Some("7d")),
            Err(StatusCode::BAD_REQUEST)
        );
    }

    #[test]
    fn maps_errors_to_status() {
        let no_data = anyhow::Error::from(NoDataError::new("ZZZZ", "unknown symbol"))
            .context("price history for ZZZZ");
        assert_eq!(status_for(&no_data), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&anyhow::anyhow!("connection refused")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
