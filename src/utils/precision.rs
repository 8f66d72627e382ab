// src/utils/precision.rs
use crate::error::{CondorError, CondorResult};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

/// Shares per equity option contract.
pub const CONTRACT_MULTIPLIER: Decimal = Decimal::ONE_HUNDRED;

/// Quote tick for option premiums: 0.01.
pub const PREMIUM_TICK: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Rounds a price to the NEAREST multiple of tick_size.
/// Example: price=1.236, tick=0.01 -> 1.24
pub fn normalize_price(price: Decimal, tick_size: Decimal) -> Decimal {
    if tick_size.is_zero() {
        return price;
    }
    (price / tick_size).round() * tick_size
}

/// Converts a model value into money. NaN and infinities are rejected rather
/// than silently becoming zero.
pub fn to_money(value: f64) -> CondorResult<Decimal> {
    if !value.is_finite() {
        return Err(CondorError::invalid_input(format!(
            "non-finite amount {value}"
        )));
    }
    Decimal::from_f64(value)
        .ok_or_else(|| CondorError::invalid_input(format!("amount {value} out of range")))
}

/// Per-share option premium as money, rounded to the quote tick.
pub fn normalize_premium(premium: f64, tick_size: Decimal) -> CondorResult<Decimal> {
    Ok(normalize_price(to_money(premium)?, tick_size).normalize())
}

/// Per-share amount scaled to dollars for `contracts` contracts.
pub fn contract_dollars(per_share: Decimal, contracts: u32) -> Decimal {
    per_share * CONTRACT_MULTIPLIER * Decimal::from(contracts)
}
