//! Maps a technical signal, a sentiment score and a risk tier to one recommendation.
//!
//! The mapping is a pure function of its inputs. Each signal is reduced to {-1, 0, +1},
//! the two are summed, and the sum is mapped to a label:
//!
//! | combined | label                                  |
//! |----------|----------------------------------------|
//! | >= +2    | Strong Buy                             |
//! | +1       | Buy if the tier allows strength 1, else Hold |
//! | 0        | Hold                                   |
//! | -1       | Sell if the tier allows strength 1, else Hold |
//! | <= -2    | Strong Sell                            |
//!
//! Which tiers act at strength 1 is data in [`policy::RiskTable`].

pub mod policy;

use crate::analysis::sentiment::SentimentScore;
use crate::analysis::technical::{TechnicalReading, TechnicalSignal, Transition};
use crate::domain::price::LONG_WINDOW;
use crate::domain::recommendation::{AdviceLabel, Recommendation, RiskTolerance};
use policy::{AdvicePolicy, STRONG_SIGNAL};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentDirection {
    Positive,
    Negative,
    Neutral,
}

impl SentimentDirection {
    /// Strict comparison: a score equal to the threshold is `Neutral`.
    pub fn classify(score: SentimentScore, threshold: f64) -> Self {
        let v = score.value();
        if v > threshold {
            Self::Positive
        } else if v < -threshold {
            Self::Negative
        } else {
            Self::Neutral
        }
    }

    pub fn value(&self) -> i8 {
        match self {
            Self::Positive => 1,
            Self::Negative => -1,
            Self::Neutral => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }
}

/// Evaluates with [`AdvicePolicy::default`].
pub fn evaluate(
    signal: &TechnicalSignal,
    sentiment: SentimentScore,
    risk: RiskTolerance,
) -> Recommendation {
    AdvicePolicy::default().evaluate(signal, sentiment, risk)
}

impl AdvicePolicy {
    pub fn combined_score(&self, reading: &TechnicalReading, sentiment: SentimentScore) -> i8 {
        let technical = reading.posture.value();
        let crossover_bonus = match reading.transition {
            Transition::Crossover => self.crossover_weight() * technical,
            Transition::Steady => 0,
        };
        technical + crossover_bonus + self.direction(sentiment).value()
    }

    pub fn direction(&self, sentiment: SentimentScore) -> SentimentDirection {
        SentimentDirection::classify(sentiment, self.sentiment_threshold())
    }

    pub fn label_for(&self, combined: i8, risk: RiskTolerance) -> AdviceLabel {
        let rule = self.risk_rule(risk);
        if combined >= STRONG_SIGNAL {
            AdviceLabel::StrongBuy
        } else if combined <= -STRONG_SIGNAL {
            AdviceLabel::StrongSell
        } else if combined > 0 && combined as u8 >= rule.min_buy_strength {
            AdviceLabel::Buy
        } else if combined < 0 && combined.unsigned_abs() >= rule.min_sell_strength {
            AdviceLabel::Sell
        } else {
            AdviceLabel::Hold
        }
    }

    /// Total over all inputs; never fails and performs no I/O.
    pub fn evaluate(
        &self,
        signal: &TechnicalSignal,
        sentiment: SentimentScore,
        risk: RiskTolerance,
    ) -> Recommendation {
        let reading = match signal {
            TechnicalSignal::InsufficientData { periods } => {
                let label = AdviceLabel::InsufficientData;
                return Recommendation {
                    label,
                    justification: format!(
                        "Could not generate advice due to lack of historical data: {periods} priced periods available, at least {LONG_WINDOW} required for the 200-day moving average."
                    ),
                    style: label.style(),
                    combined_score: None,
                };
            }
            TechnicalSignal::Reading(r) => r,
        };

        let direction = self.direction(sentiment);
        let combined = self.combined_score(reading, sentiment);
        let label = self.label_for(combined, risk);

        let mut justification = format!(
            "The 50-day moving average ({:.2}) is {} the 200-day moving average ({:.2})",
            reading.sma_50,
            reading.relation_word(),
            reading.sma_200
        );
        if let Some(cross) = reading.cross_name() {
            justification.push_str(&format!(", a {cross} on the latest session"));
        }
        justification.push_str(&format!(
            ". News sentiment is {} ({sentiment}). Combined signal {combined:+} for a {risk} risk tolerance.",
            direction.as_str()
        ));
        if label == AdviceLabel::Hold && combined != 0 {
            justification.push_str(&format!(
                " A {risk} risk tolerance requires a stronger signal before acting."
            ));
        }

        Recommendation {
            label,
            justification,
            style: label.style(),
            combined_score: Some(combined),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::policy::{RiskRule, RiskTable};
    use super::*;
    use crate::analysis::technical::Posture;
    use crate::domain::recommendation::StyleTag;

    fn reading(sma_50: f64, sma_200: f64) -> TechnicalSignal {
        let posture = if sma_50 > sma_200 {
            Posture::Bullish
        } else if sma_50 < sma_200 {
            Posture::Bearish
        } else {
            Posture::Neutral
        };
        TechnicalSignal::Reading(TechnicalReading {
            posture,
            transition: Transition::Steady,
            sma_50,
            sma_200,
        })
    }

    fn sentiment_grid() -> Vec<f64> {
        (-20..=20).map(|i| i as f64 / 20.0).collect()
    }

    #[test]
    fn bullish_average_and_positive_news_is_strong_buy() {
        let rec = evaluate(
            &reading(105.0, 100.0),
            SentimentScore::new(0.5),
            RiskTolerance::Medium,
        );
        assert_eq!(rec.label, AdviceLabel::StrongBuy);
        assert_eq!(rec.style, StyleTag::Buy);
        assert_eq!(rec.combined_score, Some(2));
        assert!(rec.justification.contains("(105.00)"));
        assert!(rec.justification.contains("above"));
        assert!(rec.justification.contains("(100.00)"));
        assert!(rec.justification.contains("positive (0.50)"));
    }

    #[test]
    fn low_risk_suppresses_single_sell_signal() {
        let rec = evaluate(
            &reading(95.0, 100.0),
            SentimentScore::new(0.0),
            RiskTolerance::Low,
        );
        assert_eq!(rec.combined_score, Some(-1));
        assert_eq!(rec.label, AdviceLabel::Hold);
        assert_eq!(rec.style, StyleTag::Hold);
        assert!(rec.justification.contains("below"));
        assert!(rec.justification.contains("neutral (0.00)"));
    }

    #[test]
    fn insufficient_data_ignores_sentiment_and_risk() {
        let signal = TechnicalSignal::InsufficientData { periods: 0 };
        for risk in RiskTolerance::ALL {
            for s in sentiment_grid() {
                let rec = evaluate(&signal, SentimentScore::new(s), risk);
                assert_eq!(rec.label, AdviceLabel::InsufficientData);
                assert_eq!(rec.style, StyleTag::Hold);
                assert_eq!(rec.combined_score, None);
            }
        }
        let rec = evaluate(&signal, SentimentScore::new(0.9), RiskTolerance::High);
        assert!(rec.justification.contains("lack of historical data"));
    }

    #[test]
    fn boundary_tiers_at_plus_and_minus_one() {
        let bullish = reading(101.0, 100.0);
        let bearish = reading(99.0, 100.0);
        let flat = SentimentScore::new(0.0);

        let buy = |risk| evaluate(&bullish, flat, risk).label;
        assert_eq!(buy(RiskTolerance::Low), AdviceLabel::Hold);
        assert_eq!(buy(RiskTolerance::Medium), AdviceLabel::Buy);
        assert_eq!(buy(RiskTolerance::High), AdviceLabel::Buy);

        let sell = |risk| evaluate(&bearish, flat, risk).label;
        assert_eq!(sell(RiskTolerance::Low), AdviceLabel::Hold);
        assert_eq!(sell(RiskTolerance::Medium), AdviceLabel::Hold);
        assert_eq!(sell(RiskTolerance::High), AdviceLabel::Sell);
    }

    #[test]
    fn strong_labels_ignore_risk_tier() {
        for risk in RiskTolerance::ALL {
            let rec = evaluate(&reading(90.0, 100.0), SentimentScore::new(-0.6), risk);
            assert_eq!(rec.label, AdviceLabel::StrongSell);
            assert_eq!(rec.style, StyleTag::Sell);
        }
    }

    #[test]
    fn threshold_value_is_neutral() {
        let policy = AdvicePolicy::default();
        let t = policy.sentiment_threshold();
        assert_eq!(
            policy.direction(SentimentScore::new(t)),
            SentimentDirection::Neutral
        );
        assert_eq!(
            policy.direction(SentimentScore::new(-t)),
            SentimentDirection::Neutral
        );
        assert_eq!(
            policy.direction(SentimentScore::new(t + 1e-9)),
            SentimentDirection::Positive
        );
        assert_eq!(
            policy.direction(SentimentScore::new(-t - 1e-9)),
            SentimentDirection::Negative
        );
    }

    #[test]
    fn equal_averages_contribute_nothing() {
        let rec = evaluate(
            &reading(100.0, 100.0),
            SentimentScore::new(0.3),
            RiskTolerance::Medium,
        );
        assert_eq!(rec.combined_score, Some(1));
        assert_eq!(rec.label, AdviceLabel::Buy);
        assert!(rec.justification.contains("equal to"));
    }

    #[test]
    fn combined_score_is_monotonic_in_sentiment_and_posture() {
        let policy = AdvicePolicy::default();
        let postures = [reading(90.0, 100.0), reading(100.0, 100.0), reading(110.0, 100.0)];
        for risk in RiskTolerance::ALL {
            for signal in &postures {
                let mut prev: Option<(i8, i8)> = None;
                for s in sentiment_grid() {
                    let rec = policy.evaluate(signal, SentimentScore::new(s), risk);
                    let cur = (rec.combined_score.unwrap(), rec.label.bullishness());
                    if let Some((p_score, p_label)) = prev {
                        assert!(cur.0 >= p_score);
                        assert!(cur.1 >= p_label);
                    }
                    prev = Some(cur);
                }
            }
            for s in sentiment_grid() {
                let sentiment = SentimentScore::new(s);
                let scores: Vec<_> = postures
                    .iter()
                    .map(|p| policy.evaluate(p, sentiment, risk))
                    .collect();
                for pair in scores.windows(2) {
                    assert!(pair[1].combined_score >= pair[0].combined_score);
                    assert!(pair[1].label.bullishness() >= pair[0].label.bullishness());
                }
            }
        }
    }

    #[test]
    fn repeated_evaluation_is_identical() {
        let signal = reading(123.456, 120.001);
        let a = evaluate(&signal, SentimentScore::new(-0.42), RiskTolerance::High);
        let b = evaluate(&signal, SentimentScore::new(-0.42), RiskTolerance::High);
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn crossover_weight_strengthens_fresh_crosses() {
        let signal = TechnicalSignal::Reading(TechnicalReading {
            posture: Posture::Bullish,
            transition: Transition::Crossover,
            sma_50: 101.0,
            sma_200: 100.0,
        });
        let flat = SentimentScore::new(0.0);

        let default = evaluate(&signal, flat, RiskTolerance::Low);
        assert_eq!(default.label, AdviceLabel::Hold);
        assert!(default.justification.contains("golden cross"));

        let weighted = AdvicePolicy::new(0.1, 1, RiskTable::default()).unwrap();
        let rec = weighted.evaluate(&signal, flat, RiskTolerance::Low);
        assert_eq!(rec.combined_score, Some(2));
        assert_eq!(rec.label, AdviceLabel::StrongBuy);
    }

    #[test]
    fn risk_table_can_be_extended_without_code_changes() {
        let cautious_high = RiskTable::default().with_rule(
            RiskTolerance::High,
            RiskRule {
                min_buy_strength: 2,
                min_sell_strength: 1,
            },
        );
        let policy = AdvicePolicy::new(0.1, 0, cautious_high).unwrap();
        let rec = policy.evaluate(
            &reading(101.0, 100.0),
            SentimentScore::new(0.0),
            RiskTolerance::High,
        );
        assert_eq!(rec.label, AdviceLabel::Hold);
    }
}
