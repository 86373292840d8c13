use serde::{Deserialize, Serialize};

const NOT_AVAILABLE: &str = "N/A";

/// Company snapshot from the market-data provider.
///
/// Every metric is independently optional: providers routinely omit P/E for loss-making
/// companies and dividend yield for non-payers. Absent values render as `N/A` through the
/// `display_*` helpers; they are never silently replaced with zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    pub symbol: String,
    pub long_name: Option<String>,
    pub sector: Option<String>,
    pub market_cap: Option<u64>,
    pub trailing_pe: Option<f64>,
    pub beta: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    /// Fraction, e.g. `0.0052` for 0.52%.
    pub dividend_yield: Option<f64>,
}

impl Fundamentals {
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Default::default()
        }
    }

    pub fn display_name(&self) -> &str {
        self.long_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.symbol)
    }

    pub fn display_market_cap(&self) -> String {
        match self.market_cap {
            Some(v) => format!("${}", group_thousands(v)),
            None => NOT_AVAILABLE.to_string(),
        }
    }

    pub fn display_pe(&self) -> String {
        display_decimal(self.trailing_pe, "")
    }

    pub fn display_beta(&self) -> String {
        display_decimal(self.beta, "")
    }

    pub fn display_52w_high(&self) -> String {
        display_decimal(self.fifty_two_week_high, "$")
    }

    pub fn display_52w_low(&self) -> String {
        display_decimal(self.fifty_two_week_low, "$")
    }

    pub fn display_dividend_yield(&self) -> String {
        match self.dividend_yield.filter(|v| v.is_finite()) {
            Some(v) => format!("{:.2}%", v * 100.0),
            None => NOT_AVAILABLE.to_string(),
        }
    }
}

fn display_decimal(v: Option<f64>, prefix: &str) -> String {
    match v.filter(|v| v.is_finite()) {
        Some(v) => format!("{prefix}{v:.2}"),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn group_thousands(v: u64) -> String {
    let digits = v.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i != 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
