use crate::domain::recommendation::RiskTolerance;
use anyhow::ensure;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentiment beyond ±this value counts as a directional signal. The boundary itself is
/// neutral: a score of exactly 0.10 contributes 0.
pub const DEFAULT_SENTIMENT_THRESHOLD: f64 = 0.10;
pub const MIN_SENTIMENT_THRESHOLD: f64 = 0.05;
pub const MAX_SENTIMENT_THRESHOLD: f64 = 0.30;

/// Combined score at or beyond which the strong labels apply for every tier.
pub const STRONG_SIGNAL: i8 = 2;

/// Smallest combined-score magnitude a tier needs before receiving Buy / Sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskRule {
    pub min_buy_strength: u8,
    pub min_sell_strength: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskTable {
    rules: BTreeMap<RiskTolerance, RiskRule>,
}

impl Default for RiskTable {
    fn default() -> Self {
        let mut rules = BTreeMap::new();
        rules.insert(
            RiskTolerance::Low,
            RiskRule {
                min_buy_strength: 2,
                min_sell_strength: 2,
            },
        );
        rules.insert(
            RiskTolerance::Medium,
            RiskRule {
                min_buy_strength: 1,
                min_sell_strength: 2,
            },
        );
        rules.insert(
            RiskTolerance::High,
            RiskRule {
                min_buy_strength: 1,
                min_sell_strength: 1,
            },
        );
        Self { rules }
    }
}

impl RiskTable {
    pub fn with_rule(mut self, risk: RiskTolerance, rule: RiskRule) -> Self {
        self.rules.insert(risk, rule);
        self
    }

    /// Rule for `risk`; a tier missing from the table acts like the strictest tier.
    pub fn rule(&self, risk: RiskTolerance) -> RiskRule {
        self.rules.get(&risk).copied().unwrap_or(RiskRule {
            min_buy_strength: STRONG_SIGNAL as u8,
            min_sell_strength: STRONG_SIGNAL as u8,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvicePolicy {
    sentiment_threshold: f64,
    /// Extra weight in the posture direction when the averages crossed on the latest bar.
    crossover_weight: i8,
    risk_table: RiskTable,
}

impl Default for AdvicePolicy {
    fn default() -> Self {
        Self {
            sentiment_threshold: DEFAULT_SENTIMENT_THRESHOLD,
            crossover_weight: 0,
            risk_table: RiskTable::default(),
        }
    }
}

impl AdvicePolicy {
    pub fn new(
        sentiment_threshold: f64,
        crossover_weight: i8,
        risk_table: RiskTable,
    ) -> anyhow::Result<Self> {
        ensure!(
            (MIN_SENTIMENT_THRESHOLD..=MAX_SENTIMENT_THRESHOLD).contains(&sentiment_threshold),
            "sentiment threshold must be within {MIN_SENTIMENT_THRESHOLD}..={MAX_SENTIMENT_THRESHOLD} (got {sentiment_threshold})"
        );
        ensure!(
            (0..=1).contains(&crossover_weight),
            "crossover weight must be 0 or 1 (got {crossover_weight})"
        );
        Ok(Self {
            sentiment_threshold,
            crossover_weight,
            risk_table,
        })
    }

    pub fn sentiment_threshold(&self) -> f64 {
        self.sentiment_threshold
    }

    pub fn crossover_weight(&self) -> i8 {
        self.crossover_weight
    }

    pub fn risk_rule(&self, risk: RiskTolerance) -> RiskRule {
        self.risk_table.rule(risk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_matches_documented_tiers() {
        let t = RiskTable::default();
        assert_eq!(t.rule(RiskTolerance::Low).min_buy_strength, 2);
        assert_eq!(t.rule(RiskTolerance::Low).min_sell_strength, 2);
        assert_eq!(t.rule(RiskTolerance::Medium).min_buy_strength, 1);
        assert_eq!(t.rule(RiskTolerance::Medium).min_sell_strength, 2);
        assert_eq!(t.rule(RiskTolerance::High).min_buy_strength, 1);
        assert_eq!(t.rule(RiskTolerance::High).min_sell_strength, 1);
    }

    #[test]
    fn rejects_threshold_outside_allowed_band() {
        assert!(AdvicePolicy::new(0.04, 0, RiskTable::default()).is_err());
        assert!(AdvicePolicy::new(0.31, 0, RiskTable::default()).is_err());
        assert!(AdvicePolicy::new(0.2, 0, RiskTable::default()).is_ok());
        assert!(AdvicePolicy::new(0.1, 2, RiskTable::default()).is_err());
    }
}
