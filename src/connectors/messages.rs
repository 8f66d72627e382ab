// src/connectors/messages.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CondorError, CondorResult};
use crate::pricing::price_and_sensitivities;
use crate::types::{Greeks, OptionKind, OptionQuote, PricePoint};

/// One bar of the price-history feed. Short field names are accepted so
/// exported OHLC files load without rewriting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBarRecord {
    #[serde(alias = "t", alias = "date")]
    pub timestamp: DateTime<Utc>,

    #[serde(alias = "c")]
    pub close: f64,

    #[serde(default, alias = "h")]
    pub high: Option<f64>,

    #[serde(default, alias = "l")]
    pub low: Option<f64>,
}

impl From<PriceBarRecord> for PricePoint {
    fn from(bar: PriceBarRecord) -> Self {
        PricePoint {
            timestamp: bar.timestamp,
            close: bar.close,
            high: bar.high,
            low: bar.low,
        }
    }
}

/// One row of an option-chain dump. Feeds that ship without sensitivities
/// must at least carry an implied volatility; the Greeks are then derived
/// from the pricing model while the market bid/ask are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionQuoteRecord {
    pub strike: f64,

    #[serde(alias = "type", alias = "option_type")]
    pub kind: OptionKind,

    #[serde(default)]
    pub bid: f64,

    #[serde(default)]
    pub ask: f64,

    #[serde(default, alias = "lastPrice")]
    pub last: f64,

    #[serde(default, alias = "iv", alias = "impliedVolatility")]
    pub implied_volatility: Option<f64>,

    #[serde(default)]
    pub delta: Option<f64>,
    #[serde(default)]
    pub gamma: Option<f64>,
    #[serde(default)]
    pub theta: Option<f64>,
    #[serde(default)]
    pub vega: Option<f64>,
    #[serde(default)]
    pub rho: Option<f64>,
}

impl OptionQuoteRecord {
    pub fn into_quote(self, days_to_expiry: u32, spot: f64, rate: f64) -> CondorResult<OptionQuote> {
        let supplied = match (self.delta, self.gamma, self.theta, self.vega) {
            (Some(delta), Some(gamma), Some(theta), Some(vega)) => Some(Greeks::new(
                delta,
                gamma,
                theta,
                vega,
                self.rho.unwrap_or(0.0),
            )),
            _ => None,
        };

        let (greeks, implied_volatility) = match (supplied, self.implied_volatility) {
            (Some(greeks), iv) => (greeks, iv.unwrap_or(0.0)),
            (None, Some(iv)) => {
                let model =
                    price_and_sensitivities(spot, self.strike, days_to_expiry, iv, rate, self.kind)?;
                (model.greeks, iv)
            }
            (None, None) => {
                return Err(CondorError::invalid_input(format!(
                    "{}{} quote has neither Greeks nor implied volatility",
                    self.strike, self.kind
                )))
            }
        };

        Ok(OptionQuote {
            strike: self.strike,
            kind: self.kind,
            days_to_expiry,
            bid: self.bid,
            ask: self.ask,
            last: self.last,
            implied_volatility,
            greeks,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpiryRecord {
    pub days_to_expiry: u32,
    pub quotes: Vec<OptionQuoteRecord>,
}

/// Whole chain file: one underlying, several expiries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainFileRecord {
    pub underlying: String,
    pub spot: f64,
    pub as_of: DateTime<Utc>,
    /// Risk-free rate behind model Greeks. The loader supplies one when absent.
    #[serde(default)]
    pub rate: Option<f64>,
    pub expiries: Vec<ExpiryRecord>,
}
