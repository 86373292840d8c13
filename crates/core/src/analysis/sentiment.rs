use crate::domain::news::Headline;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Mean compound sentiment of a headline set, always within [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct SentimentScore(f64);

impl SentimentScore {
    pub const NEUTRAL: SentimentScore = SentimentScore(0.0);

    /// Clamps into [-1, 1]; NaN and negative zero become neutral.
    pub fn new(value: f64) -> Self {
        if value.is_nan() || value == 0.0 {
            return Self::NEUTRAL;
        }
        Self(value.clamp(-1.0, 1.0))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl From<f64> for SentimentScore {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<SentimentScore> for f64 {
    fn from(score: SentimentScore) -> Self {
        score.0
    }
}

impl fmt::Display for SentimentScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Per-text compound sentiment in [-1, 1]. Must be deterministic.
pub trait SentimentScorer: Send + Sync {
    fn compound(&self, text: &str) -> f64;
}

/// Mean of per-headline compound scores over titles. Empty input is exactly neutral.
///
/// Headlines with an empty title, or a non-finite score, count toward the denominator as zero.
pub fn mean_sentiment(scorer: &dyn SentimentScorer, headlines: &[Headline]) -> SentimentScore {
    if headlines.is_empty() {
        return SentimentScore::NEUTRAL;
    }
    let total: f64 = headlines
        .iter()
        .map(|h| {
            let title = h.title.trim();
            if title.is_empty() {
                0.0
            } else {
                let v = scorer.compound(title);
                if v.is_finite() {
                    v.clamp(-1.0, 1.0)
                } else {
                    0.0
                }
            }
        })
        .sum();
    SentimentScore::new(total / headlines.len() as f64)
}

// Valence-lexicon scoring constants.
const NORMALIZATION_ALPHA: f64 = 15.0;
const NEGATION_SCALAR: f64 = -0.74;
const BOOSTER_INCREMENT: f64 = 0.293;
const EXCLAMATION_INCREMENT: f64 = 0.292;
const MAX_EXCLAMATIONS: usize = 4;
const NEGATION_LOOKBACK: usize = 3;

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "none", "nor", "neither", "without", "cannot", "isnt", "arent",
    "wasnt", "werent", "dont", "doesnt", "didnt", "wont", "cant", "shouldnt", "hardly",
    "couldnt", "wouldnt", "hasnt", "havent", "hadnt", "aint", "mustnt", "neednt",
];

const BOOSTERS_UP: &[&str] = &[
    "very", "extremely", "sharply", "hugely", "highly", "strongly", "massively", "record",
    "significantly", "substantially", "deeply", "most", "really",
];

const BOOSTERS_DOWN: &[&str] = &[
    "slightly", "somewhat", "marginally", "barely", "modestly", "little", "partly",
];

// Valences on a -4..4 scale.
const LEXICON: &[(&str, f64)] = &[
    // positive
    ("gain", 2.4),
    ("gains", 2.4),
    ("surge", 2.2),
    ("surges", 2.2),
    ("soar", 2.6),
    ("soars", 2.6),
    ("rally", 2.0),
    ("rallies", 2.0),
    ("jump", 1.6),
    ("jumps", 1.6),
    ("rise", 1.4),
    ("rises", 1.4),
    ("climb", 1.4),
    ("climbs", 1.4),
    ("beat", 1.8),
    ("beats", 1.8),
    ("upgrade", 2.1),
    ("upgrades", 2.1),
    ("upgraded", 2.1),
    ("outperform", 2.0),
    ("bullish", 2.4),
    ("strong", 2.3),
    ("growth", 2.1),
    ("profit", 1.9),
    ("profits", 1.9),
    ("profitable", 2.0),
    ("record", 1.2),
    ("win", 2.8),
    ("wins", 2.7),
    ("success", 2.7),
    ("successful", 2.8),
    ("good", 1.9),
    ("great", 3.1),
    ("best", 3.2),
    ("positive", 2.6),
    ("optimistic", 2.3),
    ("optimism", 2.5),
    ("boost", 1.7),
    ("boosts", 1.7),
    ("improve", 1.9),
    ("improves", 1.9),
    ("improved", 2.1),
    ("innovative", 2.2),
    ("breakthrough", 2.4),
    ("approval", 2.0),
    ("approved", 1.8),
    ("dividend", 0.8),
    ("buyback", 1.2),
    ("recover", 1.7),
    ("recovery", 1.6),
    ("exceed", 1.5),
    ("exceeds", 1.5),
    ("expands", 1.3),
    ("expansion", 1.3),
    ("partnership", 1.1),
    // negative
    ("loss", -2.2),
    ("losses", -2.2),
    ("fall", -1.6),
    ("falls", -1.6),
    ("drop", -1.5),
    ("drops", -1.5),
    ("plunge", -2.6),
    ("plunges", -2.6),
    ("plummet", -2.7),
    ("plummets", -2.7),
    ("crash", -2.8),
    ("crashes", -2.8),
    ("slump", -2.1),
    ("slumps", -2.1),
    ("decline", -1.7),
    ("declines", -1.7),
    ("sink", -1.6),
    ("sinks", -1.6),
    ("tumble", -2.0),
    ("tumbles", -2.0),
    ("miss", -1.5),
    ("misses", -1.5),
    ("downgrade", -2.1),
    ("downgrades", -2.1),
    ("downgraded", -2.1),
    ("underperform", -1.9),
    ("bearish", -2.4),
    ("weak", -1.9),
    ("weakness", -1.8),
    ("risk", -1.1),
    ("risks", -1.1),
    ("concern", -1.4),
    ("concerns", -1.4),
    ("fear", -2.2),
    ("fears", -2.2),
    ("bad", -2.5),
    ("worst", -3.1),
    ("negative", -2.7),
    ("lawsuit", -1.9),
    ("sued", -2.0),
    ("probe", -1.4),
    ("investigation", -1.3),
    ("fraud", -3.0),
    ("scandal", -2.9),
    ("recall", -1.6),
    ("layoffs", -2.0),
    ("cuts", -1.2),
    ("bankruptcy", -3.1),
    ("default", -1.9),
    ("warning", -1.7),
    ("warns", -1.7),
    ("volatile", -1.2),
    ("volatility", -1.0),
    ("uncertainty", -1.4),
    ("fine", 0.8),
    ("fined", -1.8),
    ("penalty", -1.8),
    ("selloff", -2.1),
    ("recession", -2.4),
];

/// Valence-lexicon scorer with negation, booster and exclamation handling.
#[derive(Debug, Clone)]
pub struct LexiconScorer {
    lexicon: HashMap<&'static str, f64>,
}

impl Default for LexiconScorer {
    fn default() -> Self {
        Self {
            lexicon: LEXICON.iter().copied().collect(),
        }
    }
}

impl LexiconScorer {
    pub fn new() -> Self {
        Self::default()
    }

    fn tokens(text: &str) -> Vec<String> {
        text.split_whitespace()
            .map(|raw| {
                raw.chars()
                    .filter(|c| c.is_alphanumeric())
                    .collect::<String>()
                    .to_lowercase()
            })
            .filter(|t| !t.is_empty())
            .collect()
    }

    fn is_negation(token: &str) -> bool {
        NEGATIONS.contains(&token)
    }

    fn booster(token: &str) -> f64 {
        if BOOSTERS_UP.contains(&token) {
            BOOSTER_INCREMENT
        } else if BOOSTERS_DOWN.contains(&token) {
            -BOOSTER_INCREMENT
        } else {
            0.0
        }
    }
}

impl SentimentScorer for LexiconScorer {
    fn compound(&self, text: &str) -> f64 {
        let tokens = Self::tokens(text);
        let mut sum = 0.0;

        for (i, token) in tokens.iter().enumerate() {
            let Some(&base) = self.lexicon.get(token.as_str()) else {
                continue;
            };
            let mut valence = base;

            if i > 0 {
                let b = Self::booster(&tokens[i - 1]);
                if b != 0.0 {
                    valence += b * valence.signum();
                }
            }

            let lookback_start = i.saturating_sub(NEGATION_LOOKBACK);
            if tokens[lookback_start..i]
                .iter()
                .any(|t| Self::is_negation(t))
            {
                valence *= NEGATION_SCALAR;
            }

            sum += valence;
        }

        if sum != 0.0 {
            let bangs = text.matches('!').count().min(MAX_EXCLAMATIONS) as f64;
            sum += bangs * EXCLAMATION_INCREMENT * sum.signum();
        }

        if sum == 0.0 {
            return 0.0;
        }
        let normalized = sum / (sum * sum + NORMALIZATION_ALPHA).sqrt();
        normalized.clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headline(title: &str) -> Headline {
        Headline {
            title: title.to_string(),
            source: "Wire".to_string(),
            published_at: None,
            url: "https://example.com/a".to_string(),
        }
    }

    struct Fixed(f64);

    struct ByTitle;

    impl SentimentScorer for ByTitle {
        fn compound(&self, text: &str) -> f64 {
            match text {
                "broken" => f64::NAN,
                "unbounded" => f64::INFINITY,
                _ => 0.6,
            }
        }
    }

    impl SentimentScorer for Fixed {
        fn compound(&self, _text: &str) -> f64 {
            self.0
        }
    }

    #[test]
    fn empty_headlines_score_exactly_zero() {
        let score = mean_sentiment(&LexiconScorer::new(), &[]);
        assert_eq!(score.value(), 0.0);
    }

    #[test]
    fn mean_counts_untitled_headlines_as_neutral() {
        let heads = vec![headline("anything"), headline("  ")];
        let score = mean_sentiment(&Fixed(0.8), &heads);
        assert!((score.value() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn scorer_output_is_clamped() {
        let score = mean_sentiment(&Fixed(7.0), &[headline("x")]);
        assert_eq!(score.value(), 1.0);
    }

    #[test]
    fn lexicon_scores_direction() {
        let s = LexiconScorer::new();
        assert!(s.compound("Apple shares surge after record profits") > 0.5);
        assert!(s.compound("Shares plunge as fraud probe widens") < -0.5);
        assert_eq!(s.compound("Company schedules annual meeting"), 0.0);
    }

    #[test]
    fn negation_flips_valence() {
        let s = LexiconScorer::new();
        assert!(s.compound("results were good") > 0.0);
        assert!(s.compound("results were not good") < 0.0);
        assert!(s.compound("results weren't good") < 0.0);
    }

    #[test]
    fn boosters_and_exclamations_intensify() {
        let s = LexiconScorer::new();
        let plain = s.compound("strong quarter");
        assert!(s.compound("very strong quarter") > plain);
        assert!(s.compound("strong quarter!!") > plain);
        assert!(s.compound("slightly strong quarter") < plain);
    }

    #[test]
    fn lexicon_scoring_is_deterministic() {
        let s = LexiconScorer::new();
        let text = "Stock rallies despite lawsuit concerns";
        assert_eq!(s.compound(text), s.compound(text));
        let v = s.compound(text);
        assert!((-1.0..=1.0).contains(&v));
    }

    #[test]
    fn non_finite_headline_scores_count_as_neutral() {
        let heads = vec![headline("good"), headline("broken"), headline("unbounded")];
        let score = mean_sentiment(&ByTitle, &heads);
        assert!((score.value() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn deserialized_scores_are_clamped() {
        let s: SentimentScore = serde_json::from_str("5.0").unwrap();
        assert_eq!(s.value(), 1.0);
        let s: SentimentScore = serde_json::from_str("-0.35").unwrap();
        assert_eq!(s.value(), -0.35);
        assert_eq!(serde_json::to_string(&SentimentScore::new(0.25)).unwrap(), "0.25");
    }

    #[test]
    fn score_constructor_handles_nan_and_range() {
        assert_eq!(SentimentScore::new(f64::NAN).value(), 0.0);
        assert_eq!(SentimentScore::new(-3.0).value(), -1.0);
        assert_eq!(SentimentScore::new(0.25).to_string(), "0.25");
    }
}
