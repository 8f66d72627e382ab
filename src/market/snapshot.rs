// src/market/snapshot.rs
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{CondorError, CondorResult};
use crate::market::chain::QuoteChain;
use crate::pricing::{price_and_sensitivities, MIN_VOLATILITY};
use crate::types::{OptionKind, OptionQuote};

const MIN_QUOTE_PRICE: f64 = 0.01;

/// Surface key. Strikes are stored in cents so the key is totally ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VolKey {
    pub days_to_expiry: u32,
    pub kind: OptionKind,
    pub strike_cents: i64,
}

impl VolKey {
    pub fn new(strike: f64, kind: OptionKind, days_to_expiry: u32) -> Self {
        Self {
            days_to_expiry,
            kind,
            strike_cents: (strike * 100.0).round() as i64,
        }
    }

    pub fn strike(&self) -> f64 {
        self.strike_cents as f64 / 100.0
    }
}

/// Implied volatility keyed by (strike, kind, expiry).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VolSurface {
    points: BTreeMap<VolKey, f64>,
}

impl VolSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        strike: f64,
        kind: OptionKind,
        days_to_expiry: u32,
        volatility: f64,
    ) -> CondorResult<()> {
        if !volatility.is_finite() || volatility < 0.0 {
            return Err(CondorError::invalid_input(format!(
                "surface volatility must be >= 0, got {volatility}"
            )));
        }
        self.points
            .insert(VolKey::new(strike, kind, days_to_expiry), volatility);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, strike: f64, kind: OptionKind, days_to_expiry: u32) -> Option<f64> {
        self.points
            .get(&VolKey::new(strike, kind, days_to_expiry))
            .copied()
    }

    /// Exact point if present, otherwise the nearest strike of the same kind
    /// and expiry. Equidistant neighbours resolve to the lower strike.
    pub fn nearest(&self, strike: f64, kind: OptionKind, days_to_expiry: u32) -> Option<f64> {
        if let Some(vol) = self.get(strike, kind, days_to_expiry) {
            return Some(vol);
        }
        let target = VolKey::new(strike, kind, days_to_expiry).strike_cents;
        self.points
            .iter()
            .filter(|(key, _)| key.kind == kind && key.days_to_expiry == days_to_expiry)
            .min_by_key(|(key, _)| (key.strike_cents - target).abs())
            .map(|(_, vol)| *vol)
    }
}

/// Immutable view of the market at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    pub underlying: String,
    pub spot: f64,
    pub as_of: DateTime<Utc>,
    pub rate: f64,
    /// Used where the surface has no point for the requested kind and expiry.
    pub base_volatility: f64,
    pub surface: VolSurface,
}

impl MarketSnapshot {
    pub fn new(
        underlying: impl Into<String>,
        spot: f64,
        as_of: DateTime<Utc>,
        rate: f64,
        base_volatility: f64,
        surface: VolSurface,
    ) -> CondorResult<Self> {
        if !spot.is_finite() || spot <= 0.0 {
            return Err(CondorError::invalid_input(format!("spot must be > 0, got {spot}")));
        }
        if !rate.is_finite() || rate < 0.0 {
            return Err(CondorError::invalid_input(format!("rate must be >= 0, got {rate}")));
        }
        if !base_volatility.is_finite() || base_volatility <= 0.0 {
            return Err(CondorError::invalid_input(format!(
                "base volatility must be > 0, got {base_volatility}"
            )));
        }
        Ok(Self {
            underlying: underlying.into(),
            spot,
            as_of,
            rate,
            base_volatility,
            surface,
        })
    }

    pub fn volatility(&self, strike: f64, kind: OptionKind, days_to_expiry: u32) -> f64 {
        self.surface
            .nearest(strike, kind, days_to_expiry)
            .unwrap_or(self.base_volatility)
            .max(MIN_VOLATILITY)
    }

    /// Prices a call and a put at every strike and wraps them in a chain.
    /// Bid and ask sit `half_spread` (a fraction of the model price) either
    /// side of the model value, rounded to cents and floored at one cent.
    pub fn quote_chain(
        &self,
        days_to_expiry: u32,
        strikes: &[f64],
        half_spread: f64,
    ) -> CondorResult<QuoteChain> {
        if !(0.0..1.0).contains(&half_spread) {
            return Err(CondorError::invalid_input(format!(
                "half spread must be in [0, 1), got {half_spread}"
            )));
        }

        let mut quotes = Vec::with_capacity(strikes.len() * 2);
        for &strike in strikes {
            for kind in [OptionKind::Call, OptionKind::Put] {
                let vol = self.volatility(strike, kind, days_to_expiry);
                let model =
                    price_and_sensitivities(self.spot, strike, days_to_expiry, vol, self.rate, kind)?;
                quotes.push(with_spread(model, half_spread));
            }
        }
        debug!(
            underlying = %self.underlying,
            days_to_expiry,
            quotes = quotes.len(),
            "synthesized quote chain"
        );

        QuoteChain::new(
            self.underlying.clone(),
            self.spot,
            self.as_of,
            days_to_expiry,
            quotes,
        )
    }
}

fn cents(value: f64) -> f64 {
    ((value * 100.0).round() / 100.0).max(MIN_QUOTE_PRICE)
}

fn with_spread(model: OptionQuote, half_spread: f64) -> OptionQuote {
    let fair = model.last;
    OptionQuote {
        bid: cents(fair * (1.0 - half_spread)),
        ask: cents(fair * (1.0 + half_spread)),
        last: cents(fair),
        ..model
    }
}
