// src/strategies/condor.rs
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CondorError, CondorResult};
use crate::market::QuoteChain;
use crate::types::{Greeks, OptionKind, OptionQuote, Side};
use crate::utils::precision::{contract_dollars, normalize_premium, to_money, PREMIUM_TICK};

/// The three preset short-strike deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyProfile {
    Conservative,
    Balanced,
    Aggressive,
}

impl StrategyProfile {
    pub const ALL: [StrategyProfile; 3] = [
        StrategyProfile::Conservative,
        StrategyProfile::Balanced,
        StrategyProfile::Aggressive,
    ];

    pub fn target_delta(&self) -> f64 {
        match self {
            StrategyProfile::Conservative => 0.16,
            StrategyProfile::Balanced => 0.20,
            StrategyProfile::Aggressive => 0.30,
        }
    }

    pub fn from_target(target: f64) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| (p.target_delta() - target).abs() < 1e-9)
    }
}

impl fmt::Display for StrategyProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyProfile::Conservative => write!(f, "CONSERVATIVE"),
            StrategyProfile::Balanced => write!(f, "BALANCED"),
            StrategyProfile::Aggressive => write!(f, "AGGRESSIVE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyLeg {
    pub quote: OptionQuote,
    pub side: Side,
    pub quantity: u32,
}

impl StrategyLeg {
    pub fn new(quote: OptionQuote, side: Side) -> Self {
        Self {
            quote,
            side,
            quantity: 1,
        }
    }

    pub fn strike(&self) -> f64 {
        self.quote.strike
    }

    pub fn kind(&self) -> OptionKind {
        self.quote.kind
    }

    /// Per-share premium of the leg at its own quote, on the tick grid.
    pub fn premium(&self) -> CondorResult<Decimal> {
        normalize_premium(self.quote.premium(), PREMIUM_TICK)
    }

    /// Per-share premium of the same contract in another chain.
    pub fn premium_in(&self, chain: &QuoteChain) -> CondorResult<Decimal> {
        let quote = chain.quote(self.strike(), self.kind()).ok_or_else(|| {
            CondorError::invalid_input(format!(
                "no {} {} quote in the {} DTE chain",
                self.strike(),
                self.kind(),
                chain.days_to_expiry
            ))
        })?;
        normalize_premium(quote.premium(), PREMIUM_TICK)
    }
}

/// Short call spread plus short put spread on one expiry.
///
/// Invariants, checked by [`IronCondorStrategy::new`]:
/// long call > short call > spot > short put > long put, net credit > 0 and
/// credit no larger than the wider spread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IronCondorStrategy {
    pub underlying: String,
    pub spot: f64,
    pub days_to_expiry: u32,
    pub target_delta: f64,
    pub short_call: StrategyLeg,
    pub long_call: StrategyLeg,
    pub short_put: StrategyLeg,
    pub long_put: StrategyLeg,
    /// Net credit per share.
    credit: Decimal,
}

impl IronCondorStrategy {
    pub fn new(
        underlying: impl Into<String>,
        spot: f64,
        target_delta: f64,
        short_call: OptionQuote,
        long_call: OptionQuote,
        short_put: OptionQuote,
        long_put: OptionQuote,
    ) -> CondorResult<Self> {
        let kinds_ok = short_call.kind == OptionKind::Call
            && long_call.kind == OptionKind::Call
            && short_put.kind == OptionKind::Put
            && long_put.kind == OptionKind::Put;
        if !kinds_ok {
            return Err(CondorError::invalid_input("condor legs have the wrong option kinds"));
        }
        let days = short_call.days_to_expiry;
        if [&long_call, &short_put, &long_put]
            .iter()
            .any(|q| q.days_to_expiry != days)
        {
            return Err(CondorError::invalid_input("condor legs span more than one expiry"));
        }
        if !(long_call.strike > short_call.strike
            && short_call.strike > spot
            && spot > short_put.strike
            && short_put.strike > long_put.strike)
        {
            return Err(CondorError::no_viable_strike(format!(
                "strikes out of order: {}P/{}P | {} | {}C/{}C",
                long_put.strike, short_put.strike, spot, short_call.strike, long_call.strike
            )));
        }

        let short_call = StrategyLeg::new(short_call, Side::Sell);
        let long_call = StrategyLeg::new(long_call, Side::Buy);
        let short_put = StrategyLeg::new(short_put, Side::Sell);
        let long_put = StrategyLeg::new(long_put, Side::Buy);

        let credit = (short_call.premium()? - long_call.premium()?)
            + (short_put.premium()? - long_put.premium()?);

        let strategy = Self {
            underlying: underlying.into(),
            spot,
            days_to_expiry: days,
            target_delta,
            short_call,
            long_call,
            short_put,
            long_put,
            credit,
        };

        if credit <= Decimal::ZERO {
            return Err(CondorError::no_viable_strike(format!(
                "net credit {credit} is not positive"
            )));
        }
        if strategy.max_loss(1)? < Decimal::ZERO {
            return Err(CondorError::no_viable_strike(format!(
                "credit {credit} exceeds the spread width {}",
                strategy.max_width()?
            )));
        }
        Ok(strategy)
    }

    /// Net credit per share.
    pub fn credit(&self) -> Decimal {
        self.credit
    }

    pub fn legs(&self) -> [&StrategyLeg; 4] {
        [&self.short_call, &self.long_call, &self.short_put, &self.long_put]
    }

    pub fn call_width(&self) -> f64 {
        self.long_call.strike() - self.short_call.strike()
    }

    pub fn put_width(&self) -> f64 {
        self.short_put.strike() - self.long_put.strike()
    }

    pub fn max_width(&self) -> CondorResult<Decimal> {
        normalize_premium(self.call_width().max(self.put_width()), PREMIUM_TICK)
    }

    pub fn max_profit(&self, contracts: u32) -> Decimal {
        contract_dollars(self.credit, contracts)
    }

    pub fn max_loss(&self, contracts: u32) -> CondorResult<Decimal> {
        Ok(contract_dollars(self.max_width()?, contracts) - self.max_profit(contracts))
    }

    pub fn breakeven_upper(&self) -> CondorResult<Decimal> {
        Ok(to_money(self.short_call.strike())? + self.credit)
    }

    pub fn breakeven_lower(&self) -> CondorResult<Decimal> {
        Ok(to_money(self.short_put.strike())? - self.credit)
    }

    /// Display estimate: one minus the short strikes' absolute deltas, clamped
    /// to [0, 1]. Not a closed-form probability.
    pub fn probability_of_profit(&self) -> f64 {
        (1.0 - self.short_call.quote.abs_delta() - self.short_put.quote.abs_delta()).clamp(0.0, 1.0)
    }

    /// Net sensitivities of one contract's four legs, per share.
    pub fn net_greeks(&self) -> Greeks {
        self.legs().iter().fold(Greeks::default(), |acc, leg| {
            acc.add(&leg.quote.greeks.scale(leg.side.sign() * f64::from(leg.quantity)))
        })
    }

    /// Per-share debit to buy back the shorts and sell the longs at the
    /// chain's quotes.
    pub fn cost_to_close(&self, chain: &QuoteChain) -> CondorResult<Decimal> {
        Ok(self.short_call.premium_in(chain)? - self.long_call.premium_in(chain)?
            + self.short_put.premium_in(chain)?
            - self.long_put.premium_in(chain)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn q(strike: f64, kind: OptionKind, mid: f64, delta: f64) -> OptionQuote {
        OptionQuote {
            strike,
            kind,
            days_to_expiry: 30,
            bid: mid - 0.05,
            ask: mid + 0.05,
            last: mid,
            implied_volatility: 0.2,
            greeks: Greeks::new(delta, 0.01, -5.0, 40.0, 1.0),
        }
    }

    fn condor() -> IronCondorStrategy {
        IronCondorStrategy::new(
            "SPY",
            580.0,
            0.20,
            q(600.0, OptionKind::Call, 2.10, 0.20),
            q(605.0, OptionKind::Call, 1.40, 0.15),
            q(560.0, OptionKind::Put, 2.50, -0.21),
            q(555.0, OptionKind::Put, 1.90, -0.17),
        )
        .unwrap()
    }

    #[test]
    fn derived_metrics() {
        let ic = condor();
        assert_eq!(ic.credit(), dec!(1.30));
        assert_eq!(ic.max_profit(1), dec!(130));
        assert_eq!(ic.max_loss(1).unwrap(), dec!(370));
        assert_eq!(ic.max_loss(3).unwrap(), dec!(1110));
        assert_eq!(ic.breakeven_upper().unwrap(), dec!(601.30));
        assert_eq!(ic.breakeven_lower().unwrap(), dec!(558.70));
        assert!((ic.probability_of_profit() - 0.59).abs() < 1e-9);
    }

    #[test]
    fn uneven_wings_use_wider_spread() {
        let ic = IronCondorStrategy::new(
            "SPY",
            580.0,
            0.20,
            q(600.0, OptionKind::Call, 2.10, 0.20),
            q(610.0, OptionKind::Call, 0.90, 0.10),
            q(560.0, OptionKind::Put, 2.50, -0.21),
            q(555.0, OptionKind::Put, 1.90, -0.17),
        )
        .unwrap();
        assert_eq!(ic.credit(), dec!(1.80));
        assert_eq!(ic.max_loss(1).unwrap(), dec!(820));
    }

    #[test]
    fn net_greeks_are_short_the_wings() {
        let g = condor().net_greeks();
        // -0.20 + 0.15 + 0.21 - 0.17
        assert!((g.delta - -0.01).abs() < 1e-12);
        assert!(g.gamma.abs() < 1e-12);
    }

    #[test]
    fn rejects_debit_and_inverted_condors() {
        let debit = IronCondorStrategy::new(
            "SPY",
            580.0,
            0.20,
            q(600.0, OptionKind::Call, 1.00, 0.20),
            q(605.0, OptionKind::Call, 1.40, 0.15),
            q(560.0, OptionKind::Put, 1.00, -0.21),
            q(555.0, OptionKind::Put, 1.90, -0.17),
        );
        assert!(matches!(debit, Err(CondorError::NoViableStrike(_))));

        let inverted = IronCondorStrategy::new(
            "SPY",
            580.0,
            0.20,
            q(605.0, OptionKind::Call, 2.10, 0.20),
            q(600.0, OptionKind::Call, 1.40, 0.15),
            q(560.0, OptionKind::Put, 2.50, -0.21),
            q(555.0, OptionKind::Put, 1.90, -0.17),
        );
        assert!(matches!(inverted, Err(CondorError::NoViableStrike(_))));
    }

    #[test]
    fn rejects_credit_wider_than_wings() {
        let result = IronCondorStrategy::new(
            "SPY",
            580.0,
            0.20,
            q(600.0, OptionKind::Call, 6.00, 0.20),
            q(601.0, OptionKind::Call, 0.10, 0.15),
            q(560.0, OptionKind::Put, 2.50, -0.21),
            q(559.0, OptionKind::Put, 0.10, -0.17),
        );
        assert!(matches!(result, Err(CondorError::NoViableStrike(_))));
    }

    #[test]
    fn cost_to_close_at_entry_quotes_equals_credit() {
        let ic = condor();
        let quotes = ic.legs().iter().map(|leg| leg.quote.clone()).collect();
        let chain = QuoteChain::new("SPY", 580.0, Utc::now(), 30, quotes).unwrap();
        assert_eq!(ic.cost_to_close(&chain).unwrap(), ic.credit());
    }

    #[test]
    fn presets_round_trip_targets() {
        for profile in StrategyProfile::ALL {
            assert_eq!(StrategyProfile::from_target(profile.target_delta()), Some(profile));
        }
        assert_eq!(StrategyProfile::from_target(0.25), None);
    }
}
