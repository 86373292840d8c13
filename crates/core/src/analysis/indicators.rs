//! Moving averages and momentum indicators over closing prices.

use crate::domain::price::PriceSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Macd {
    pub macd_line: f64,
    pub signal_line: f64,
    pub histogram: f64,
}

/// Latest-bar view of every indicator, used by the report prompt and the api.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub as_of: NaiveDate,
    pub close: f64,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
    pub ema_50: f64,
    pub ema_200: f64,
    pub rsi_14: Option<f64>,
    pub macd: Option<Macd>,
}

impl IndicatorSnapshot {
    pub fn from_series(series: &PriceSeries) -> Option<Self> {
        let last = series.latest()?;
        let idx = series.len() - 1;
        let closes = series.closes();
        Some(Self {
            as_of: last.date,
            close: last.close,
            sma_50: series.sma_50()[idx],
            sma_200: series.sma_200()[idx],
            ema_50: series.ema_50()[idx],
            ema_200: series.ema_200()[idx],
            rsi_14: rsi(&closes, RSI_PERIOD),
            macd: macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL),
        })
    }
}

/// Trailing simple moving average. Entries before the window fills are `None`.
pub fn sma_series(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            // Sum each window independently so equal inputs give bit-equal averages.
            let sum: f64 = values[i + 1 - window..=i].iter().sum();
            Some(sum / window as f64)
        })
        .collect()
}

/// Exponential moving average with `alpha = 2 / (span + 1)`, seeded with the first value.
pub fn ema_series(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &v in values {
        let next = match prev {
            Some(p) => alpha * v + (1.0 - alpha) * p,
            None => v,
        };
        out.push(next);
        prev = Some(next);
    }
    out
}

/// Wilder's RSI of the latest bar.
pub fn rsi(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period + 1 {
        return None;
    }

    let mut gains = Vec::with_capacity(values.len() - 1);
    let mut losses = Vec::with_capacity(values.len() - 1);
    for pair in values.windows(2) {
        let change = pair[1] - pair[0];
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    let mut avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / period as f64;
    for i in period..gains.len() {
        avg_gain = (avg_gain * (period - 1) as f64 + gains[i]) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + losses[i]) / period as f64;
    }

    if avg_loss == 0.0 {
        return Some(if avg_gain == 0.0 { 50.0 } else { 100.0 });
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// MACD of the latest bar.
pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> Option<Macd> {
    if fast >= slow || values.len() < slow + signal {
        return None;
    }
    let fast_ema = ema_series(values, fast);
    let slow_ema = ema_series(values, slow);
    let line: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();
    let signal_series = ema_series(&line, signal);

    let macd_line = *line.last()?;
    let signal_line = *signal_series.last()?;
    Some(Macd {
        macd_line,
        signal_line,
        histogram: macd_line - signal_line,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price::synthetic_points;

    #[test]
    fn sma_matches_trailing_mean() {
        let out = sma_series(&[10.0, 11.0, 12.0, 13.0, 14.0], 3);
        assert_eq!(out.len(), 5);
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert_eq!(out[2], Some(11.0));
        assert_eq!(out[4], Some(13.0));
    }

    #[test]
    fn ema_is_seeded_with_first_value() {
        let out = ema_series(&[10.0, 20.0], 3);
        // alpha = 0.5
        assert_eq!(out, vec![10.0, 15.0]);
    }

    #[test]
    fn rsi_is_bullish_for_rising_prices() {
        let prices = vec![
            44.0, 44.25, 44.5, 43.75, 44.0, 44.25, 44.5, 44.75, 45.0, 45.25, 45.5, 45.75, 46.0,
            45.75, 45.5,
        ];
        let v = rsi(&prices, 14).unwrap();
        assert!(v > 50.0 && v < 100.0);
        assert!(rsi(&prices[..14], 14).is_none());
    }

    #[test]
    fn rsi_of_flat_series_is_neutral() {
        assert_eq!(rsi(&[5.0; 20], 14), Some(50.0));
    }

    #[test]
    fn macd_needs_slow_plus_signal_bars() {
        let rising: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        assert!(macd(&rising[..34], 12, 26, 9).is_none());
        let m = macd(&rising, 12, 26, 9).unwrap();
        assert!(m.macd_line > 0.0);
        assert!((m.histogram - (m.macd_line - m.signal_line)).abs() < 1e-12);
    }

    #[test]
    fn snapshot_reports_latest_bar() {
        let closes: Vec<f64> = (0..60).map(|i| 50.0 + i as f64).collect();
        let series = PriceSeries::new(synthetic_points(&closes)).unwrap();
        let snap = IndicatorSnapshot::from_series(&series).unwrap();
        assert_eq!(snap.close, 109.0);
        assert!(snap.sma_50.is_some());
        assert!(snap.sma_200.is_none());
        assert!(snap.rsi_14.is_some());
        assert!(IndicatorSnapshot::from_series(&PriceSeries::empty()).is_none());
    }
}
