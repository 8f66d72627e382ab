// src/strategies/scorer.rs
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CondorError, CondorResult};
use crate::indicators::IndicatorSnapshot;
use crate::types::Signal;

pub const MAX_SCORE: u8 = 9;

const OSCILLATOR_CENTER: f64 = 50.0;

/// Two nested thresholds on one indicator; each one met is worth a point.
///
/// For "calm" tiers a point is earned while the reading is at or below the
/// threshold, `strong` being the tighter one. For "stretched" tiers a point is
/// earned once the reading is above the threshold, `strong` being the further
/// one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreTier {
    pub mild: f64,
    pub strong: f64,
}

impl ScoreTier {
    pub const fn new(mild: f64, strong: f64) -> Self {
        Self { mild, strong }
    }

    fn calm_points(&self, reading: f64) -> u8 {
        u8::from(reading <= self.mild) + u8::from(reading <= self.strong)
    }

    fn stretched_points(&self, reading: f64) -> u8 {
        u8::from(reading > self.mild) + u8::from(reading > self.strong)
    }
}

/// Scoring thresholds. Oscillator tiers are distances from 50, band-position
/// and trend tiers are absolute values, band width is a fraction of price and
/// ATR is in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Default: within 10 / 5 points of 50.
    pub oscillator_calm: ScoreTier,
    /// Default: beyond 15 / 20 points from 50.
    pub oscillator_stretched: ScoreTier,
    /// Default: |position| within 0.4 / 0.2.
    pub band_position_calm: ScoreTier,
    /// Default: |position| beyond 0.5 / 0.6.
    pub band_position_stretched: ScoreTier,
    /// Default: width at most 7% / 5%.
    pub band_width_calm: ScoreTier,
    /// Default: width above 10% / 15%.
    pub band_width_stretched: ScoreTier,
    /// Default: ATR at most 1.2% / 0.8%.
    pub atr_calm: ScoreTier,
    /// Default: ATR above 2% / 3%.
    pub atr_stretched: ScoreTier,
    /// Default: |trend| at most 0.3%.
    pub trend_calm: f64,
    /// Default: |trend| above 1%.
    pub trend_stretched: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            oscillator_calm: ScoreTier::new(10.0, 5.0),
            oscillator_stretched: ScoreTier::new(15.0, 20.0),
            band_position_calm: ScoreTier::new(0.4, 0.2),
            band_position_stretched: ScoreTier::new(0.5, 0.6),
            band_width_calm: ScoreTier::new(0.07, 0.05),
            band_width_stretched: ScoreTier::new(0.10, 0.15),
            atr_calm: ScoreTier::new(1.2, 0.8),
            atr_stretched: ScoreTier::new(2.0, 3.0),
            trend_calm: 0.3,
            trend_stretched: 1.0,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> CondorResult<()> {
        let calm = [
            ("oscillator_calm", self.oscillator_calm),
            ("band_position_calm", self.band_position_calm),
            ("band_width_calm", self.band_width_calm),
            ("atr_calm", self.atr_calm),
        ];
        let stretched = [
            ("oscillator_stretched", self.oscillator_stretched),
            ("band_position_stretched", self.band_position_stretched),
            ("band_width_stretched", self.band_width_stretched),
            ("atr_stretched", self.atr_stretched),
        ];
        for (name, tier) in calm {
            if !(tier.strong >= 0.0 && tier.strong <= tier.mild) {
                return Err(CondorError::invalid_input(format!(
                    "{name}: strong ({}) must be within [0, mild ({})]",
                    tier.strong, tier.mild
                )));
            }
        }
        for (name, tier) in stretched {
            if !(tier.mild >= 0.0 && tier.strong >= tier.mild) {
                return Err(CondorError::invalid_input(format!(
                    "{name}: strong ({}) must be >= mild ({}) >= 0",
                    tier.strong, tier.mild
                )));
            }
        }
        if !(self.trend_calm >= 0.0 && self.trend_stretched >= self.trend_calm) {
            return Err(CondorError::invalid_input(
                "trend thresholds must satisfy 0 <= trend_calm <= trend_stretched",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalScore {
    pub entry: u8,
    pub risk: u8,
    pub signal: Signal,
}

/// Ordered rules, first match wins. STRONG_ENTRY and ENTRY are checked before
/// the risk rules, so (entry=4, risk=4) is ENTRY while (entry=5, risk=5) falls
/// through to CAUTION.
pub fn classify(entry: u8, risk: u8) -> Signal {
    if entry >= 6 && risk <= 3 {
        Signal::StrongEntry
    } else if entry >= 4 && risk <= 4 {
        Signal::Entry
    } else if risk >= 6 {
        Signal::ExitAvoid
    } else if risk == 5 {
        Signal::Caution
    } else {
        Signal::Neutral
    }
}

pub struct SignalScorer {
    config: ScoringConfig,
}

impl SignalScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn score(&self, indicators: &IndicatorSnapshot) -> SignalScore {
        let cfg = &self.config;
        let oscillator_distance = (indicators.oscillator - OSCILLATOR_CENTER).abs();
        let band_position = indicators.band_position.abs();
        let trend = indicators.trend_strength.abs();

        let entry = cfg.oscillator_calm.calm_points(oscillator_distance)
            + cfg.band_position_calm.calm_points(band_position)
            + cfg.band_width_calm.calm_points(indicators.band_width)
            + cfg.atr_calm.calm_points(indicators.atr_percent)
            + u8::from(trend <= cfg.trend_calm);

        let risk = cfg.oscillator_stretched.stretched_points(oscillator_distance)
            + cfg.band_position_stretched.stretched_points(band_position)
            + cfg.band_width_stretched.stretched_points(indicators.band_width)
            + cfg.atr_stretched.stretched_points(indicators.atr_percent)
            + u8::from(trend > cfg.trend_stretched);

        let entry = entry.min(MAX_SCORE);
        let risk = risk.min(MAX_SCORE);
        let signal = classify(entry, risk);

        debug!(entry, risk, %signal, "conditions scored");
        SignalScore {
            entry,
            risk,
            signal,
        }
    }
}

impl Default for SignalScorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}
