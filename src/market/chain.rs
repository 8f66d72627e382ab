// src/market/chain.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CondorError, CondorResult};
use crate::types::{OptionKind, OptionQuote};

const STRIKE_EPSILON: f64 = 1e-6;

/// All quotes for a single expiry of one underlying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteChain {
    pub underlying: String,
    pub spot: f64,
    pub as_of: DateTime<Utc>,
    pub days_to_expiry: u32,
    quotes: Vec<OptionQuote>,
}

impl QuoteChain {
    /// Quotes are stored ordered by (kind, strike). Every quote must belong to
    /// the chain's expiry and carry a positive, finite strike, at most once
    /// per (strike, kind).
    pub fn new(
        underlying: impl Into<String>,
        spot: f64,
        as_of: DateTime<Utc>,
        days_to_expiry: u32,
        mut quotes: Vec<OptionQuote>,
    ) -> CondorResult<Self> {
        if !spot.is_finite() || spot <= 0.0 {
            return Err(CondorError::invalid_input(format!("chain spot must be > 0, got {spot}")));
        }
        if let Some(bad) = quotes
            .iter()
            .find(|q| !q.strike.is_finite() || q.strike <= 0.0 || q.days_to_expiry != days_to_expiry)
        {
            return Err(CondorError::invalid_input(format!(
                "quote {}{} ({} DTE) does not belong to a {} DTE chain",
                bad.strike, bad.kind, bad.days_to_expiry, days_to_expiry
            )));
        }
        quotes.sort_by(|a, b| a.kind.cmp(&b.kind).then(a.strike.total_cmp(&b.strike)));
        if let Some(pair) = quotes
            .windows(2)
            .find(|w| w[0].kind == w[1].kind && (w[1].strike - w[0].strike).abs() < STRIKE_EPSILON)
        {
            return Err(CondorError::invalid_input(format!(
                "duplicate quote {}{} in {} DTE chain",
                pair[1].strike, pair[1].kind, days_to_expiry
            )));
        }

        Ok(Self {
            underlying: underlying.into(),
            spot,
            as_of,
            days_to_expiry,
            quotes,
        })
    }

    pub fn quotes(&self) -> &[OptionQuote] {
        &self.quotes
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn quote(&self, strike: f64, kind: OptionKind) -> Option<&OptionQuote> {
        self.quotes
            .iter()
            .find(|q| q.kind == kind && (q.strike - strike).abs() < STRIKE_EPSILON)
    }

    /// Out-of-the-money calls ordered from spot outward (ascending strike).
    pub fn otm_calls(&self) -> Vec<&OptionQuote> {
        self.quotes
            .iter()
            .filter(|q| q.kind == OptionKind::Call && q.strike > self.spot)
            .collect()
    }

    /// Out-of-the-money puts ordered from spot outward (descending strike).
    pub fn otm_puts(&self) -> Vec<&OptionQuote> {
        let mut puts: Vec<&OptionQuote> = self
            .quotes
            .iter()
            .filter(|q| q.kind == OptionKind::Put && q.strike < self.spot)
            .collect();
        puts.reverse();
        puts
    }

    /// Distinct strikes, ascending.
    pub fn strikes(&self) -> Vec<f64> {
        let mut strikes: Vec<f64> = self.quotes.iter().map(|q| q.strike).collect();
        strikes.sort_by(f64::total_cmp);
        strikes.dedup_by(|a, b| (*a - *b).abs() < STRIKE_EPSILON);
        strikes
    }
}

/// Evenly spaced strikes between `spot * lower` and `spot * upper`, snapped to
/// multiples of `step`.
pub fn strike_ladder(spot: f64, lower: f64, upper: f64, step: f64) -> CondorResult<Vec<f64>> {
    if !(spot > 0.0 && step > 0.0 && lower > 0.0 && upper > lower) {
        return Err(CondorError::invalid_input(format!(
            "bad strike ladder: spot={spot} range={lower}..{upper} step={step}"
        )));
    }
    let first = ((spot * lower) / step).ceil() as i64;
    let last = ((spot * upper) / step).floor() as i64;
    Ok((first..=last).map(|i| i as f64 * step).collect())
}
