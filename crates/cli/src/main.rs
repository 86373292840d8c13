use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use adviser_core::domain::recommendation::RiskTolerance;
use adviser_core::domain::report::AnalysisReport;
use adviser_core::ingest::discover::SectorCatalog;
use adviser_core::ingest::market::Lookback;
use adviser_core::llm::ChatMessage;
use adviser_core::service::Adviser;

const TOP_HEADLINES: usize = 5;

#[derive(Debug, Parser)]
#[command(name = "adviser", about = "Technical and news-sentiment stock adviser")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Evaluate one ticker and print the recommendation.
    Analyze {
        #[arg(long)]
        ticker: String,
        #[arg(long, default_value = "medium")]
        risk: RiskTolerance,
        #[arg(long, default_value = "1y")]
        period: Lookback,
        /// Print the full analysis as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Evaluate one ticker and print the narrative report.
    Report {
        #[arg(long)]
        ticker: String,
        #[arg(long, default_value = "medium")]
        risk: RiskTolerance,
        #[arg(long, default_value = "1y")]
        period: Lookback,
    },
    /// Chat about a ticker on stdin. `exit` or EOF ends the session.
    Chat {
        #[arg(long)]
        ticker: String,
    },
    /// List well-known stocks grouped by sector.
    Discover,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = adviser_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    let adviser = Adviser::from_settings(&settings)?;

    let result = run(&adviser, args.command).await;
    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %err, "command failed");
    }
    result
}

async fn run(adviser: &Adviser, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Analyze {
            ticker,
            risk,
            period,
            json,
        } => {
            let analysis = adviser.analyze(&ticker, risk, period).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            } else {
                print!("{}", render_analysis(&analysis));
            }
        }
        Command::Report {
            ticker,
            risk,
            period,
        } => {
            let analysis = adviser.analyze(&ticker, risk, period).await?;
            print!("{}", render_analysis(&analysis));
            println!();
            println!("{}", adviser.report(&analysis).await);
        }
        Command::Chat { ticker } => chat_loop(adviser, &ticker).await?,
        Command::Discover => print!("{}", render_catalog(&adviser.discover().await)),
    }
    Ok(())
}

async fn chat_loop(adviser: &Adviser, ticker: &str) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut history: Vec<ChatMessage> = Vec::new();

    stdout
        .write_all(format!("Chatting about {ticker}. Type `exit` to quit.\n").as_bytes())
        .await?;
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            break;
        };
        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }
        if prompt.eq_ignore_ascii_case("exit") || prompt.eq_ignore_ascii_case("quit") {
            break;
        }

        let reply = adviser.chat(ticker, history.clone(), prompt).await;
        stdout.write_all(format!("{reply}\n\n").as_bytes()).await?;
        history.push(ChatMessage::user(prompt));
        history.push(ChatMessage::assistant(reply));
    }
    Ok(())
}

fn render_analysis(a: &AnalysisReport) -> String {
    let f = &a.fundamentals;
    let rec = &a.recommendation;
    let mut out = String::new();

    out.push_str(&format!("{} ({})\n", f.display_name(), a.ticker));
    out.push_str(&format!(
        "Recommendation: {} [{}] for {} risk tolerance\n",
        rec.label, rec.style, a.risk
    ));
    out.push_str(&format!("{}\n\n", rec.justification));

    out.push_str("Key metrics\n");
    let close = a
        .latest_close()
        .map(|c| format!("${c:.2}"))
        .unwrap_or_else(|| "N/A".to_string());
    let metrics = [
        ("Latest close", close),
        ("Market cap", f.display_market_cap()),
        ("P/E ratio", f.display_pe()),
        ("Beta", f.display_beta()),
        ("52-week high", f.display_52w_high()),
        ("52-week low", f.display_52w_low()),
        ("Dividend yield", f.display_dividend_yield()),
        ("News sentiment", format!("{} ({})", a.sentiment, a.sentiment_direction.as_str())),
    ];
    for (name, value) in metrics {
        out.push_str(&format!("  {name:<16} {value}\n"));
    }
    if let Some(ind) = &a.indicators {
        if let Some(rsi) = ind.rsi_14 {
            out.push_str(&format!("  {:<16} {rsi:.2}\n", "RSI (14)"));
        }
        if let Some(m) = &ind.macd {
            out.push_str(&format!(
                "  {:<16} {:.2} / signal {:.2}\n",
                "MACD", m.macd_line, m.signal_line
            ));
        }
    }

    out.push_str("\nRecent headlines\n");
    if a.headlines.is_empty() {
        out.push_str("  (none)\n");
    }
    for h in a.headlines.iter().take(TOP_HEADLINES) {
        out.push_str(&format!("  {} | {} | {}\n", h.published_date(), h.source, h.title));
    }
    out
}

fn render_catalog(catalog: &SectorCatalog) -> String {
    let mut out = String::new();
    for (sector, stocks) in catalog {
        out.push_str(&format!("{sector} ({})\n", stocks.len()));
        for s in stocks {
            out.push_str(&format!("  {:<8} {}\n", s.symbol, s.description));
        }
    }
    out
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
