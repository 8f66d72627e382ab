//! Option pricing
//!
//! Closed-form valuation used both for synthesizing quote chains from a
//! market snapshot and for marking positions.

pub mod black_scholes;

pub use black_scholes::{
    norm_cdf, norm_pdf, price_and_sensitivities, DAYS_PER_YEAR, MIN_VOLATILITY,
};
