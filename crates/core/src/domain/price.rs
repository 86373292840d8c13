use crate::analysis::indicators::{ema_series, sma_series};
use anyhow::ensure;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Window of the short simple moving average, in trading periods.
pub const SHORT_WINDOW: usize = 50;
/// Window of the long simple moving average, in trading periods.
pub const LONG_WINDOW: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Short/long simple moving averages observed at one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MovingAverages {
    pub short: f64,
    pub long: f64,
}

/// Chronological daily bars plus the derived average series, aligned by index.
///
/// Built in one pass from the fetched bars and never mutated afterwards; a refetch builds a
/// new series. Every derived series has the same length as `points`. The SMA series hold
/// `None` until their window is filled.
#[derive(Debug, Clone, Serialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
    sma_50: Vec<Option<f64>>,
    sma_200: Vec<Option<f64>>,
    ema_50: Vec<f64>,
    ema_200: Vec<f64>,
}

impl PriceSeries {
    pub fn new(points: Vec<PricePoint>) -> anyhow::Result<Self> {
        for pair in points.windows(2) {
            ensure!(
                pair[0].date < pair[1].date,
                "price bars must be strictly chronological: {} is not before {}",
                pair[0].date,
                pair[1].date
            );
        }
        for p in &points {
            ensure!(
                p.close.is_finite(),
                "non-finite close on {}: {}",
                p.date,
                p.close
            );
        }

        let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
        Ok(Self {
            sma_50: sma_series(&closes, SHORT_WINDOW),
            sma_200: sma_series(&closes, LONG_WINDOW),
            ema_50: ema_series(&closes, SHORT_WINDOW),
            ema_200: ema_series(&closes, LONG_WINDOW),
            points,
        })
    }

    pub fn empty() -> Self {
        Self {
            points: Vec::new(),
            sma_50: Vec::new(),
            sma_200: Vec::new(),
            ema_50: Vec::new(),
            ema_200: Vec::new(),
        }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn latest(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn sma_50(&self) -> &[Option<f64>] {
        &self.sma_50
    }

    pub fn sma_200(&self) -> &[Option<f64>] {
        &self.sma_200
    }

    pub fn ema_50(&self) -> &[f64] {
        &self.ema_50
    }

    pub fn ema_200(&self) -> &[f64] {
        &self.ema_200
    }

    /// Both averages at `idx`, or `None` while either window is still filling.
    pub fn moving_averages_at(&self, idx: usize) -> Option<MovingAverages> {
        let short = (*self.sma_50.get(idx)?)?;
        let long = (*self.sma_200.get(idx)?)?;
        Some(MovingAverages { short, long })
    }
}

#[cfg(test)]
pub(crate) fn synthetic_points(closes: &[f64]) -> Vec<PricePoint> {
    let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PricePoint {
            date: start + chrono::Duration::days(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1_000,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_series_share_the_price_length() {
        let closes: Vec<f64> = (0..250).map(|i| 100.0 + i as f64).collect();
        let series = PriceSeries::new(synthetic_points(&closes)).unwrap();

        assert_eq!(series.sma_50().len(), 250);
        assert_eq!(series.sma_200().len(), 250);
        assert_eq!(series.ema_200().len(), 250);
        assert!(series.sma_200()[198].is_none());
        assert!(series.sma_200()[199].is_some());
        assert!(series.sma_50()[48].is_none());
        assert!(series.sma_50()[49].is_some());
    }

    #[test]
    fn averages_need_the_long_window() {
        let closes = vec![10.0; LONG_WINDOW];
        let series = PriceSeries::new(synthetic_points(&closes)).unwrap();
        assert!(series.moving_averages_at(LONG_WINDOW - 2).is_none());
        let last = series.moving_averages_at(LONG_WINDOW - 1).unwrap();
        assert_eq!(last.short, 10.0);
        assert_eq!(last.long, 10.0);
        assert!(series.moving_averages_at(LONG_WINDOW).is_none());
    }

    #[test]
    fn rejects_out_of_order_bars() {
        let mut points = synthetic_points(&[1.0, 2.0, 3.0]);
        points.swap(0, 2);
        assert!(PriceSeries::new(points).is_err());
    }

    #[test]
    fn rejects_duplicate_dates() {
        let mut points = synthetic_points(&[1.0, 2.0]);
        points[1].date = points[0].date;
        assert!(PriceSeries::new(points).is_err());
    }

    #[test]
    fn empty_series_has_no_averages() {
        let series = PriceSeries::new(Vec::new()).unwrap();
        assert!(series.is_empty());
        assert!(series.latest().is_none());
        assert!(series.moving_averages_at(0).is_none());
    }
}
