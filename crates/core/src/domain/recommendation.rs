use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How aggressively borderline signals turn into actionable labels. Chosen per evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskTolerance {
    Low,
    Medium,
    High,
}

impl RiskTolerance {
    pub const ALL: [RiskTolerance; 3] = [Self::Low, Self::Medium, Self::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl Default for RiskTolerance {
    fn default() -> Self {
        Self::Medium
    }
}

impl fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskTolerance {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" | "med" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => anyhow::bail!("unknown risk tolerance {other:?} (expected low, medium or high)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdviceLabel {
    #[serde(rename = "Strong Buy")]
    StrongBuy,
    #[serde(rename = "Buy")]
    Buy,
    #[serde(rename = "Hold")]
    Hold,
    #[serde(rename = "Sell")]
    Sell,
    #[serde(rename = "Strong Sell")]
    StrongSell,
    #[serde(rename = "Insufficient Data")]
    InsufficientData,
}

impl AdviceLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StrongBuy => "Strong Buy",
            Self::Buy => "Buy",
            Self::Hold => "Hold",
            Self::Sell => "Sell",
            Self::StrongSell => "Strong Sell",
            Self::InsufficientData => "Insufficient Data",
        }
    }

    /// Position on the bearish-to-bullish axis; `InsufficientData` sits with `Hold`.
    pub fn bullishness(&self) -> i8 {
        match self {
            Self::StrongSell => -2,
            Self::Sell => -1,
            Self::Hold | Self::InsufficientData => 0,
            Self::Buy => 1,
            Self::StrongBuy => 2,
        }
    }

    pub fn style(&self) -> StyleTag {
        match self.bullishness() {
            b if b > 0 => StyleTag::Buy,
            b if b < 0 => StyleTag::Sell,
            _ => StyleTag::Hold,
        }
    }
}

impl fmt::Display for AdviceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presentation class for the recommendation card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleTag {
    Buy,
    Sell,
    Hold,
}

impl StyleTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
            Self::Hold => "hold",
        }
    }
}

impl fmt::Display for StyleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub label: AdviceLabel,
    pub justification: String,
    pub style: StyleTag,
    /// Combined technical + sentiment score; absent when history was insufficient.
    pub combined_score: Option<i8>,
}
