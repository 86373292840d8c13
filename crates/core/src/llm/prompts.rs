use crate::advice::SentimentDirection;
use crate::analysis::technical::{Posture, TechnicalSignal};
use crate::llm::ReportInput;

pub const REPORT_SECTIONS: [&str; 5] = [
    "Executive Summary",
    "Technical Analysis",
    "Sentiment Analysis",
    "Risk Assessment",
    "Final Recommendation",
];

pub fn report_system_prompt() -> String {
    [
        "As an expert financial analyst, your task is to generate a comprehensive investment report.",
        "The tone should be professional, balanced, and strictly informational. Do not give financial advice, but rather an expert analysis based on the provided data.",
        "Structure the report with exactly these Markdown sections, in this order:",
        "- `### Executive Summary` (a brief, high-level recommendation and overview).",
        "- `### Technical Analysis` (elaborate on the moving averages and what they imply).",
        "- `### Sentiment Analysis` (discuss the news sentiment and its potential impact).",
        "- `### Risk Assessment` (analyze the potential risks, tailored to the investor's risk tolerance).",
        "- `### Final Recommendation` (a concluding paragraph with a clear course of action).",
        "Return Markdown only. Do not wrap the report in a code block.",
    ]
    .join("\n")
}

pub fn report_user_prompt(input: &ReportInput) -> String {
    let f = &input.fundamentals;
    let close = input
        .latest_close
        .map(|c| format!("${c:.2}"))
        .unwrap_or_else(|| "N/A".to_string());

    format!(
        "Generate a comprehensive investment report for {name} ({symbol}).\n\
The target audience is an investor with a **{risk}** risk tolerance.\n\n\
**Current Data:**\n\
- **Latest Closing Price:** {close}\n\
- **Market Cap:** {cap}\n\
- **P/E Ratio:** {pe}\n\
- **52-Week High:** {high}\n\
- **52-Week Low:** {low}\n\
- **Technical Situation:** {tech}\n\
- **Recent News Sentiment:** {word} (Score: {score})\n",
        name = f.display_name(),
        symbol = f.symbol,
        risk = input.risk,
        cap = f.display_market_cap(),
        pe = f.display_pe(),
        high = f.display_52w_high(),
        low = f.display_52w_low(),
        tech = technical_situation(&input.technical),
        word = sentiment_word(input.sentiment_direction),
        score = input.sentiment,
    )
}

pub fn technical_situation(signal: &TechnicalSignal) -> String {
    match signal {
        TechnicalSignal::InsufficientData { periods } => format!(
            "Not enough price history to compare the 50-day and 200-day moving averages \
({periods} periods available)."
        ),
        TechnicalSignal::Reading(r) => {
            let tone = match r.posture {
                Posture::Bullish => "generally a bullish sign",
                Posture::Bearish => "generally a bearish sign",
                Posture::Neutral => "a neutral sign",
            };
            let mut s = format!(
                "The 50-day moving average (${:.2}) is currently {} the 200-day moving average (${:.2}), which is {tone}.",
                r.sma_50,
                r.relation_word(),
                r.sma_200
            );
            if let Some(cross) = r.cross_name() {
                s.push_str(&format!(" A {cross} occurred on the latest session."));
            }
            s
        }
    }
}

fn sentiment_word(direction: SentimentDirection) -> &'static str {
    match direction {
        SentimentDirection::Positive => "Positive",
        SentimentDirection::Negative => "Negative",
        SentimentDirection::Neutral => "Neutral",
    }
}

pub fn repair_prompt(missing: &[&str]) -> String {
    let headers = missing
        .iter()
        .map(|s| format!("`### {s}`"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Your previous report is missing these required sections: {headers}.\n\
Rewrite the complete report so that it contains all five sections as `### ` headers, \
in order: {order}. Return Markdown only, without a code block.",
        order = REPORT_SECTIONS.join(", ")
    )
}

pub fn chat_system_prompt(ticker: &str) -> String {
    format!(
        "You are InvestaBot, a specialized financial assistant inside a stock analysis tool.\n\
Your primary focus is the stock with the ticker symbol: {ticker}.\n\
You are conversational and helpful, and you explain insights using sound financial concepts.\n\
Answer questions clearly and concisely.\n\
Do not invent data, and do not present personal financial advice you are not qualified to give.\n\
Your goal is to help the user understand the analysis shown to them."
    )
}

/// Removes one wrapping Markdown code fence (```` ``` ```` or ```` ```markdown ````).
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    let Some((_, body)) = trimmed.split_once('\n') else {
        return trimmed.trim_matches('`').trim().to_string();
    };
    let body = body.trim_end();
    let body = body.strip_suffix("```").unwrap_or(body);
    body.trim().to_string()
}

/// Required sections that have no `### ` header line in `text`.
pub fn missing_sections(text: &str) -> Vec<&'static str> {
    let headers: Vec<String> = text
        .lines()
        .filter_map(|l| l.trim().strip_prefix("###"))
        .map(|h| h.trim().trim_matches('*').trim().to_ascii_lowercase())
        .collect();

    REPORT_SECTIONS
        .iter()
        .copied()
        .filter(|s| !headers.iter().any(|h| h.starts_with(&s.to_ascii_lowercase())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::sentiment::SentimentScore;
    use crate::analysis::technical::{TechnicalReading, Transition};
    use crate::domain::fundamentals::Fundamentals;
    use crate::domain::recommendation::RiskTolerance;

    fn full_report() -> String {
        REPORT_SECTIONS
            .iter()
            .map(|s| format!("### {s}\nBody text.\n"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn strips_wrapping_fence() {
        let inner = full_report();
        let fenced = format!("```markdown\n{inner}\n```\n");
        assert_eq!(strip_code_fence(&fenced), inner.trim());
        assert_eq!(strip_code_fence("  plain  "), "plain");
    }

    #[test]
    fn detects_missing_sections() {
        assert!(missing_sections(&full_report()).is_empty());

        let partial = "### Executive Summary\nx\n### **Technical Analysis**\ny\n## Risk Assessment\n";
        assert_eq!(
            missing_sections(partial),
            vec!["Sentiment Analysis", "Risk Assessment", "Final Recommendation"]
        );
    }

    #[test]
    fn fact_sheet_uses_na_for_absent_metrics() {
        let input = ReportInput {
            fundamentals: Fundamentals {
                long_name: Some("Apple Inc.".to_string()),
                market_cap: Some(3_000_000_000_000),
                fifty_two_week_high: Some(199.62),
                ..Fundamentals::empty("AAPL")
            },
            risk: RiskTolerance::Low,
            latest_close: Some(190.5),
            technical: TechnicalSignal::Reading(TechnicalReading {
                posture: Posture::Bullish,
                transition: Transition::Crossover,
                sma_50: 180.0,
                sma_200: 170.0,
            }),
            sentiment: SentimentScore::new(0.25),
            sentiment_direction: SentimentDirection::Positive,
        };
        let prompt = report_user_prompt(&input);
        assert!(prompt.contains("Apple Inc. (AAPL)"));
        assert!(prompt.contains("**Low** risk tolerance"));
        assert!(prompt.contains("**Latest Closing Price:** $190.50"));
        assert!(prompt.contains("**Market Cap:** $3,000,000,000,000"));
        assert!(prompt.contains("**P/E Ratio:** N/A"));
        assert!(prompt.contains("**52-Week Low:** N/A"));
        assert!(prompt.contains("is currently above the 200-day moving average ($170.00)"));
        assert!(prompt.contains("golden cross"));
        assert!(prompt.contains("Positive (Score: 0.25)"));
    }

    #[test]
    fn technical_situation_for_short_history() {
        let s = technical_situation(&TechnicalSignal::InsufficientData { periods: 42 });
        assert!(s.contains("42 periods"));
    }

    #[test]
    fn repair_prompt_names_missing_headers() {
        let p = repair_prompt(&["Risk Assessment"]);
        assert!(p.contains("`### Risk Assessment`"));
    }
}
