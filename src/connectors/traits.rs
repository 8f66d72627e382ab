// src/connectors/traits.rs
use anyhow::Result;

use crate::market::QuoteChain;
use crate::types::PricePoint;

/// Where the desk gets its market data. Implementations may hit a live feed,
/// replay files, or synthesize quotes; the desk does not care which.
pub trait MarketDataSource {
    /// Closes ordered oldest to newest.
    fn price_history(&self) -> Result<Vec<PricePoint>>;

    /// Days to expiry of every listed expiry, ascending.
    fn expiries(&self) -> Result<Vec<u32>>;

    fn quote_chain(&self, days_to_expiry: u32) -> Result<QuoteChain>;
}
