use crate::domain::price::{MovingAverages, PriceSeries, LONG_WINDOW};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Ordering of the short vs long moving average at one bar.
///
/// Exactly equal averages are `Neutral`; there is no epsilon band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Posture {
    Bullish,
    Bearish,
    Neutral,
}

impl Posture {
    pub fn from_averages(ma: MovingAverages) -> Self {
        match ma.short.partial_cmp(&ma.long) {
            Some(Ordering::Greater) => Self::Bullish,
            Some(Ordering::Less) => Self::Bearish,
            Some(Ordering::Equal) | None => Self::Neutral,
        }
    }

    pub fn value(&self) -> i8 {
        match self {
            Self::Bullish => 1,
            Self::Bearish => -1,
            Self::Neutral => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// The ordering changed into the current non-neutral posture on the latest bar.
    Crossover,
    Steady,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TechnicalReading {
    pub posture: Posture,
    pub transition: Transition,
    pub sma_50: f64,
    pub sma_200: f64,
}

impl TechnicalReading {
    pub fn relation_word(&self) -> &'static str {
        match self.posture {
            Posture::Bullish => "above",
            Posture::Bearish => "below",
            Posture::Neutral => "equal to",
        }
    }

    /// Golden/death cross wording, or `None` in steady state.
    pub fn cross_name(&self) -> Option<&'static str> {
        match (self.transition, self.posture) {
            (Transition::Crossover, Posture::Bullish) => Some("golden cross"),
            (Transition::Crossover, Posture::Bearish) => Some("death cross"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TechnicalSignal {
    InsufficientData { periods: usize },
    Reading(TechnicalReading),
}

impl TechnicalSignal {
    pub fn reading(&self) -> Option<&TechnicalReading> {
        match self {
            Self::Reading(r) => Some(r),
            Self::InsufficientData { .. } => None,
        }
    }
}

/// Classifies the latest bar of `series`.
///
/// Needs the long average at the latest bar, i.e. at least `LONG_WINDOW` bars. When the bar
/// before it has no long average yet (exactly `LONG_WINDOW` bars) the transition cannot be
/// observed and is reported as `Steady`.
pub fn extract_signal(series: &PriceSeries) -> TechnicalSignal {
    let n = series.len();
    if n < LONG_WINDOW {
        return TechnicalSignal::InsufficientData { periods: n };
    }
    let Some(latest) = series.moving_averages_at(n - 1) else {
        return TechnicalSignal::InsufficientData { periods: n };
    };
    if !latest.short.is_finite() || !latest.long.is_finite() {
        return TechnicalSignal::InsufficientData { periods: n };
    }

    let posture = Posture::from_averages(latest);
    let previous = series
        .moving_averages_at(n - 2)
        .map(Posture::from_averages);

    let transition = match previous {
        Some(prev) if posture != Posture::Neutral && prev != posture => Transition::Crossover,
        _ => Transition::Steady,
    };

    TechnicalSignal::Reading(TechnicalReading {
        posture,
        transition,
        sma_50: latest.short,
        sma_200: latest.long,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price::synthetic_points;

    fn series(closes: &[f64]) -> PriceSeries {
        PriceSeries::new(synthetic_points(closes)).unwrap()
    }

    #[test]
    fn short_history_is_insufficient() {
        let s = series(&vec![100.0; LONG_WINDOW - 1]);
        assert_eq!(
            extract_signal(&s),
            TechnicalSignal::InsufficientData {
                periods: LONG_WINDOW - 1
            }
        );
        assert_eq!(
            extract_signal(&PriceSeries::empty()),
            TechnicalSignal::InsufficientData { periods: 0 }
        );
    }

    #[test]
    fn equal_averages_are_neutral() {
        let s = series(&vec![100.0; LONG_WINDOW + 5]);
        let r = *extract_signal(&s).reading().unwrap();
        assert_eq!(r.posture, Posture::Neutral);
        assert_eq!(r.transition, Transition::Steady);
        assert_eq!(r.sma_50, r.sma_200);
    }

    #[test]
    fn steady_uptrend_is_bullish_without_crossover() {
        let closes: Vec<f64> = (0..260).map(|i| 100.0 + i as f64).collect();
        let r = *extract_signal(&series(&closes)).reading().unwrap();
        assert_eq!(r.posture, Posture::Bullish);
        assert_eq!(r.transition, Transition::Steady);
        assert!(r.sma_50 > r.sma_200);
    }

    #[test]
    fn steady_downtrend_is_bearish() {
        let closes: Vec<f64> = (0..260).map(|i| 500.0 - i as f64).collect();
        let r = *extract_signal(&series(&closes)).reading().unwrap();
        assert_eq!(r.posture, Posture::Bearish);
        assert_eq!(r.relation_word(), "below");
    }

    #[test]
    fn flat_then_jump_is_a_golden_cross() {
        // Flat history keeps both averages equal until the last bar lifts the short one.
        let mut closes = vec![100.0; LONG_WINDOW];
        closes.push(150.0);
        let r = *extract_signal(&series(&closes)).reading().unwrap();
        assert_eq!(r.posture, Posture::Bullish);
        assert_eq!(r.transition, Transition::Crossover);
        assert_eq!(r.cross_name(), Some("golden cross"));
    }

    #[test]
    fn flat_then_drop_is_a_death_cross() {
        let mut closes = vec![100.0; LONG_WINDOW];
        closes.push(50.0);
        let r = *extract_signal(&series(&closes)).reading().unwrap();
        assert_eq!(r.posture, Posture::Bearish);
        assert_eq!(r.transition, Transition::Crossover);
        assert_eq!(r.cross_name(), Some("death cross"));
    }

    #[test]
    fn exactly_long_window_bars_reports_steady() {
        let closes: Vec<f64> = (0..LONG_WINDOW).map(|i| 100.0 + i as f64).collect();
        let r = *extract_signal(&series(&closes)).reading().unwrap();
        assert_eq!(r.posture, Posture::Bullish);
        assert_eq!(r.transition, Transition::Steady);
    }
}
