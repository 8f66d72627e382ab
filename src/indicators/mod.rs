//! Indicator Engine
//!
//! Rolling technical indicators over the close series, computed with the `ta`
//! crate's canonical implementations:
//! - RSI oscillator (0-100)
//! - Bollinger bands: position of the last close relative to the middle band
//!   and band width as a fraction of the middle band
//! - MACD line as a signed percent of price (trend strength)
//! - Average true range as a percent of price

use serde::{Deserialize, Serialize};
use ta::indicators::{
    AverageTrueRange, BollingerBands, MovingAverageConvergenceDivergence, RelativeStrengthIndex,
};
use ta::{DataItem, Next};
use tracing::debug;

use crate::error::{CondorError, CondorResult};
use crate::types::PricePoint;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    /// RSI lookback. Default 14.
    pub oscillator_window: usize,
    /// Bollinger middle-band window. Default 20.
    pub band_window: usize,
    /// Band half-width in standard deviations. Default 2.0.
    pub band_std_devs: f64,
    /// ATR smoothing window. Default 14.
    pub atr_window: usize,
    /// MACD fast EMA. Default 12.
    pub trend_fast_window: usize,
    /// MACD slow EMA. Default 26.
    pub trend_slow_window: usize,
    /// MACD signal EMA. Default 9.
    pub trend_signal_window: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            oscillator_window: 14,
            band_window: 20,
            band_std_devs: 2.0,
            atr_window: 14,
            trend_fast_window: 12,
            trend_slow_window: 26,
            trend_signal_window: 9,
        }
    }
}

impl IndicatorConfig {
    pub fn validate(&self) -> CondorResult<()> {
        let windows = [
            ("oscillator_window", self.oscillator_window),
            ("band_window", self.band_window),
            ("atr_window", self.atr_window),
            ("trend_fast_window", self.trend_fast_window),
            ("trend_slow_window", self.trend_slow_window),
            ("trend_signal_window", self.trend_signal_window),
        ];
        if let Some((name, window)) = windows.iter().find(|(_, w)| *w < 2) {
            return Err(CondorError::invalid_input(format!(
                "{name} must be >= 2, got {window}"
            )));
        }
        if self.trend_fast_window >= self.trend_slow_window {
            return Err(CondorError::invalid_input(format!(
                "trend_fast_window ({}) must be shorter than trend_slow_window ({})",
                self.trend_fast_window, self.trend_slow_window
            )));
        }
        if !self.band_std_devs.is_finite() || self.band_std_devs <= 0.0 {
            return Err(CondorError::invalid_input(format!(
                "band_std_devs must be > 0, got {}",
                self.band_std_devs
            )));
        }
        Ok(())
    }

    /// Points needed before every indicator has a full window. The oscillator
    /// and ATR consume one extra point for their first difference.
    pub fn required_points(&self) -> usize {
        [
            self.oscillator_window + 1,
            self.band_window,
            self.atr_window + 1,
            self.trend_slow_window,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub close: f64,
    pub oscillator: f64,
    pub band_upper: f64,
    pub band_middle: f64,
    pub band_lower: f64,
    /// 0 on the middle band, +-1 on the outer bands, beyond +-1 outside them.
    pub band_position: f64,
    /// (upper - lower) / middle.
    pub band_width: f64,
    /// MACD line as percent of the last close.
    pub trend_strength: f64,
    pub trend_signal: f64,
    pub atr_percent: f64,
}

fn ta_error(what: &str, err: ta::errors::TaError) -> CondorError {
    CondorError::invalid_input(format!("{what}: {err:?}"))
}

fn bar_item(point: &PricePoint) -> CondorResult<Option<DataItem>> {
    match (point.high, point.low) {
        (Some(high), Some(low)) => {
            let high = high.max(point.close);
            let low = low.min(point.close);
            DataItem::builder()
                .open(point.close)
                .high(high)
                .low(low)
                .close(point.close)
                .volume(0.0)
                .build()
                .map(Some)
                .map_err(|e| ta_error("invalid price bar", e))
        }
        _ => Ok(None),
    }
}

/// Runs every indicator across the whole series and reports the values at the
/// newest point.
pub fn compute_indicators(
    series: &[PricePoint],
    config: &IndicatorConfig,
) -> CondorResult<IndicatorSnapshot> {
    config.validate()?;

    let required = config.required_points();
    if series.len() < required {
        return Err(CondorError::InsufficientData {
            required,
            actual: series.len(),
        });
    }
    if let Some(bad) = series.iter().find(|p| !p.close.is_finite() || p.close <= 0.0) {
        return Err(CondorError::invalid_input(format!(
            "close at {} must be > 0, got {}",
            bad.timestamp, bad.close
        )));
    }

    let mut rsi = RelativeStrengthIndex::new(config.oscillator_window)
        .map_err(|e| ta_error("oscillator", e))?;
    let mut bands = BollingerBands::new(config.band_window, config.band_std_devs)
        .map_err(|e| ta_error("bands", e))?;
    let mut atr = AverageTrueRange::new(config.atr_window).map_err(|e| ta_error("atr", e))?;
    let mut macd = MovingAverageConvergenceDivergence::new(
        config.trend_fast_window,
        config.trend_slow_window,
        config.trend_signal_window,
    )
    .map_err(|e| ta_error("trend", e))?;

    let mut oscillator = 50.0;
    let mut band = None;
    let mut true_range = 0.0;
    let mut trend = None;

    for point in series {
        oscillator = rsi.next(point.close);
        band = Some(bands.next(point.close));
        true_range = match bar_item(point)? {
            Some(item) => atr.next(&item),
            None => atr.next(point.close),
        };
        trend = Some(macd.next(point.close));
    }

    let (band, trend) = match (band, trend) {
        (Some(band), Some(trend)) => (band, trend),
        _ => {
            return Err(CondorError::InsufficientData {
                required,
                actual: 0,
            })
        }
    };

    let close = series[series.len() - 1].close;
    let half_width = band.upper - band.average;
    let band_position = if half_width > f64::EPSILON * band.average.abs() {
        (close - band.average) / half_width
    } else {
        0.0
    };
    let band_width = ((band.upper - band.lower) / band.average).max(0.0);

    let snapshot = IndicatorSnapshot {
        close,
        oscillator: oscillator.clamp(0.0, 100.0),
        band_upper: band.upper,
        band_middle: band.average,
        band_lower: band.lower,
        band_position,
        band_width,
        trend_strength: trend.macd / close * 100.0,
        trend_signal: trend.signal / close * 100.0,
        atr_percent: (true_range / close * 100.0).max(0.0),
    };

    if [
        snapshot.oscillator,
        snapshot.band_position,
        snapshot.band_width,
        snapshot.trend_strength,
        snapshot.atr_percent,
    ]
    .iter()
    .any(|v| !v.is_finite())
    {
        return Err(CondorError::invalid_input(
            "indicator computation produced a non-finite value",
        ));
    }

    debug!(
        rsi = snapshot.oscillator,
        band_position = snapshot.band_position,
        band_width = snapshot.band_width,
        trend = snapshot.trend_strength,
        atr_pct = snapshot.atr_percent,
        "indicators computed"
    );
    Ok(snapshot)
}
