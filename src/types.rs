// src/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Call,
    Put,
}

impl OptionKind {
    /// Payoff at expiry for one unit of the underlying.
    pub fn intrinsic(&self, spot: f64, strike: f64) -> f64 {
        match self {
            OptionKind::Call => (spot - strike).max(0.0),
            OptionKind::Put => (strike - spot).max(0.0),
        }
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionKind::Call => write!(f, "C"),
            OptionKind::Put => write!(f, "P"),
        }
    }
}

/// Whether a leg was sold (short) or bought (long).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// +1 for bought legs, -1 for sold legs.
    pub fn sign(&self) -> f64 {
        match self {
            Side::Buy => 1.0,
            Side::Sell => -1.0,
        }
    }
}

/// The five first-order sensitivities, reported per unit.
///
/// `theta` is per year, `vega` per 1.00 of volatility and `rho` per 1.00 of
/// rate. Use the helpers for the usual display scalings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    pub rho: f64,
}

impl Greeks {
    pub fn new(delta: f64, gamma: f64, theta: f64, vega: f64, rho: f64) -> Self {
        Self {
            delta,
            gamma,
            theta,
            vega,
            rho,
        }
    }

    pub fn per_day_theta(&self) -> f64 {
        self.theta / 365.0
    }

    /// Vega for a one vol-point (1%) move.
    pub fn per_point_vega(&self) -> f64 {
        self.vega / 100.0
    }

    pub fn scale(&self, factor: f64) -> Self {
        Self {
            delta: self.delta * factor,
            gamma: self.gamma * factor,
            theta: self.theta * factor,
            vega: self.vega * factor,
            rho: self.rho * factor,
        }
    }

    pub fn add(&self, other: &Greeks) -> Self {
        Self {
            delta: self.delta + other.delta,
            gamma: self.gamma + other.gamma,
            theta: self.theta + other.theta,
            vega: self.vega + other.vega,
            rho: self.rho + other.rho,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionQuote {
    pub strike: f64,
    pub kind: OptionKind,
    pub days_to_expiry: u32,
    pub bid: f64,
    pub ask: f64,
    pub last: f64,
    pub implied_volatility: f64,
    pub greeks: Greeks,
}

impl OptionQuote {
    pub fn mid(&self) -> Option<f64> {
        if self.bid > 0.0 && self.ask >= self.bid {
            Some((self.bid + self.ask) / 2.0)
        } else {
            None
        }
    }

    /// Per-share premium used for both entry and marking: the mid when the
    /// market is two-sided, otherwise the last trade.
    pub fn premium(&self) -> f64 {
        self.mid().unwrap_or(self.last).max(0.0)
    }

    pub fn abs_delta(&self) -> f64 {
        self.greeks.delta.abs()
    }
}

/// One point of the price history feed, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub low: Option<f64>,
}

impl PricePoint {
    pub fn from_close(timestamp: DateTime<Utc>, close: f64) -> Self {
        Self {
            timestamp,
            close,
            high: None,
            low: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    StrongEntry,
    Entry,
    ExitAvoid,
    Caution,
    Neutral,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Signal::StrongEntry => "STRONG ENTRY",
            Signal::Entry => "ENTRY",
            Signal::ExitAvoid => "EXIT / AVOID",
            Signal::Caution => "CAUTION",
            Signal::Neutral => "NEUTRAL",
        };
        f.write_str(label)
    }
}
