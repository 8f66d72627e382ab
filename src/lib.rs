//! Iron condor analytics and paper trading.
//!
//! Prices options and their sensitivities, scores market conditions from a
//! close series, selects iron condors at preset short-strike deltas, and runs
//! a paper account that opens, marks and closes them.

pub mod config;
pub mod connectors;
pub mod core;
pub mod error;
pub mod indicators;
pub mod market;
pub mod pricing;
pub mod strategies;
pub mod types;
pub mod utils;

pub use error::{CondorError, CondorResult};
