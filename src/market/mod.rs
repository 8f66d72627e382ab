//! Market inputs consumed by the desk: an immutable snapshot with its
//! implied-volatility surface, and per-expiry quote chains.

pub mod chain;
pub mod snapshot;

pub use chain::{strike_ladder, QuoteChain};
pub use snapshot::{MarketSnapshot, VolKey, VolSurface};
