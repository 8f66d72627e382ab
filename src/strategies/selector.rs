// src/strategies/selector.rs
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CondorError, CondorResult};
use crate::market::QuoteChain;
use crate::strategies::condor::{IronCondorStrategy, StrategyProfile};
use crate::types::OptionQuote;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Short-strike |delta| targets. Default: 0.16, 0.20, 0.30.
    pub targets: Vec<f64>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            targets: StrategyProfile::ALL.iter().map(|p| p.target_delta()).collect(),
        }
    }
}

impl SelectorConfig {
    pub fn validate(&self) -> CondorResult<()> {
        if let Some(bad) = self.targets.iter().find(|t| !(**t > 0.0 && **t < 1.0)) {
            return Err(CondorError::invalid_input(format!(
                "delta target must be in (0, 1), got {bad}"
            )));
        }
        Ok(())
    }
}

/// Picks (short, long) from one side of the chain.
///
/// `ladder` must run from the money outward. The short is the quote whose
/// |delta| is closest to `target`; on an exact tie the one further from spot
/// wins. The long is the next strike out.
fn pick_spread<'a>(
    ladder: &[&'a OptionQuote],
    target: f64,
    side: &str,
) -> CondorResult<(&'a OptionQuote, &'a OptionQuote)> {
    if ladder.len() < 2 {
        return Err(CondorError::no_viable_strike(format!(
            "{} OTM {side} strike(s), need at least 2",
            ladder.len()
        )));
    }

    let mut best: Option<(usize, f64)> = None;
    for (i, quote) in ladder.iter().enumerate() {
        let distance = (quote.abs_delta() - target).abs();
        if !distance.is_finite() {
            continue;
        }
        match best {
            Some((_, best_distance)) if distance > best_distance => {}
            _ => best = Some((i, distance)),
        }
    }

    let (short_idx, _) = best.ok_or_else(|| {
        CondorError::no_viable_strike(format!("no {side} quote carries a usable delta"))
    })?;
    let long = ladder.get(short_idx + 1).ok_or_else(|| {
        CondorError::no_viable_strike(format!(
            "short {side} {} is the outermost strike, no long wing available",
            ladder[short_idx].strike
        ))
    })?;
    Ok((ladder[short_idx], long))
}

/// One condor for one delta target, or the reason none exists.
pub fn select_strategy(chain: &QuoteChain, target: f64) -> CondorResult<IronCondorStrategy> {
    if !(target > 0.0 && target < 1.0) {
        return Err(CondorError::invalid_input(format!(
            "delta target must be in (0, 1), got {target}"
        )));
    }

    let calls = chain.otm_calls();
    let puts = chain.otm_puts();
    let (short_call, long_call) = pick_spread(&calls, target, "call")?;
    let (short_put, long_put) = pick_spread(&puts, target, "put")?;

    IronCondorStrategy::new(
        chain.underlying.clone(),
        chain.spot,
        target,
        short_call.clone(),
        long_call.clone(),
        short_put.clone(),
        long_put.clone(),
    )
}

/// One condor per target, in target order. Targets the chain cannot satisfy
/// are left out.
pub fn select_strategies(chain: &QuoteChain, targets: &[f64]) -> Vec<IronCondorStrategy> {
    targets
        .iter()
        .filter_map(|&target| match select_strategy(chain, target) {
            Ok(strategy) => {
                info!(
                    target,
                    short_call = strategy.short_call.strike(),
                    short_put = strategy.short_put.strike(),
                    credit = %strategy.credit(),
                    "condor selected"
                );
                Some(strategy)
            }
            Err(e) => {
                warn!(target, dte = chain.days_to_expiry, "no condor for target: {}", e);
                None
            }
        })
        .collect()
}

pub struct StrategySelector {
    config: SelectorConfig,
}

impl StrategySelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    pub fn targets(&self) -> &[f64] {
        &self.config.targets
    }

    pub fn select(&self, chain: &QuoteChain) -> Vec<IronCondorStrategy> {
        select_strategies(chain, &self.config.targets)
    }
}

impl Default for StrategySelector {
    fn default() -> Self {
        Self::new(SelectorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{strike_ladder, MarketSnapshot, VolSurface};
    use crate::types::{Greeks, OptionKind};
    use chrono::Utc;

    fn quote(strike: f64, kind: OptionKind, mid: f64, delta: f64) -> OptionQuote {
        OptionQuote {
            strike,
            kind,
            days_to_expiry: 30,
            bid: mid - 0.02,
            ask: mid + 0.02,
            last: mid,
            implied_volatility: 0.2,
            greeks: Greeks::new(delta, 0.0, 0.0, 0.0, 0.0),
        }
    }

    fn hand_chain() -> QuoteChain {
        let quotes = vec![
            quote(105.0, OptionKind::Call, 3.00, 0.35),
            quote(110.0, OptionKind::Call, 1.80, 0.25),
            quote(115.0, OptionKind::Call, 1.00, 0.15),
            quote(120.0, OptionKind::Call, 0.50, 0.08),
            quote(95.0, OptionKind::Put, 3.20, -0.36),
            quote(90.0, OptionKind::Put, 2.00, -0.25),
            quote(85.0, OptionKind::Put, 1.10, -0.15),
            quote(80.0, OptionKind::Put, 0.55, -0.08),
        ];
        QuoteChain::new("XYZ", 100.0, Utc::now(), 30, quotes).unwrap()
    }

    fn strikes(ic: &IronCondorStrategy) -> [f64; 4] {
        [
            ic.long_put.strike(),
            ic.short_put.strike(),
            ic.short_call.strike(),
            ic.long_call.strike(),
        ]
    }

    #[test]
    fn picks_closest_delta_and_next_wing() {
        let ic = select_strategy(&hand_chain(), 0.16).unwrap();
        assert_eq!(strikes(&ic), [80.0, 85.0, 115.0, 120.0]);
        assert_eq!(ic.credit(), rust_decimal_macros::dec!(1.05));
    }

    #[test]
    fn exact_tie_prefers_further_strike() {
        // 0.25 sits exactly between 0.375 and 0.125 on both sides
        let quotes = vec![
            quote(105.0, OptionKind::Call, 3.00, 0.375),
            quote(110.0, OptionKind::Call, 1.50, 0.125),
            quote(115.0, OptionKind::Call, 0.50, 0.0625),
            quote(95.0, OptionKind::Put, 3.00, -0.375),
            quote(90.0, OptionKind::Put, 1.50, -0.125),
            quote(85.0, OptionKind::Put, 0.50, -0.0625),
        ];
        let chain = QuoteChain::new("XYZ", 100.0, Utc::now(), 30, quotes).unwrap();
        let ic = select_strategy(&chain, 0.25).unwrap();
        assert_eq!(strikes(&ic), [85.0, 90.0, 110.0, 115.0]);
    }

    #[test]
    fn outermost_short_has_no_wing() {
        let result = select_strategy(&hand_chain(), 0.05);
        assert!(matches!(result, Err(CondorError::NoViableStrike(_))));
    }

    #[test]
    fn single_strike_per_side_selects_nothing() {
        let quotes = vec![
            quote(105.0, OptionKind::Call, 2.0, 0.30),
            quote(95.0, OptionKind::Put, 2.0, -0.30),
        ];
        let chain = QuoteChain::new("XYZ", 100.0, Utc::now(), 30, quotes).unwrap();
        assert!(select_strategies(&chain, &[0.16, 0.20, 0.30]).is_empty());
        assert!(matches!(
            select_strategy(&chain, 0.20),
            Err(CondorError::NoViableStrike(_))
        ));
    }

    #[test]
    fn failing_target_is_omitted_not_fatal() {
        let picked = select_strategies(&hand_chain(), &[0.16, 0.05, 0.30]);
        assert_eq!(picked.len(), 2);
        assert_eq!(picked[0].target_delta, 0.16);
        assert_eq!(picked[1].target_delta, 0.30);
    }

    #[test]
    fn selection_is_deterministic_on_model_chain() {
        let snap = MarketSnapshot::new("SPY", 580.0, Utc::now(), 0.045, 0.18, VolSurface::new())
            .unwrap();
        let ladder = strike_ladder(580.0, 0.85, 1.15, 5.0).unwrap();
        let chain = snap.quote_chain(35, &ladder, 0.02).unwrap();

        let first = StrategySelector::default().select(&chain);
        let second = StrategySelector::default().select(&chain);
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);

        for ic in &first {
            assert!(ic.long_call.strike() > ic.short_call.strike());
            assert!(ic.short_call.strike() > chain.spot);
            assert!(chain.spot > ic.short_put.strike());
            assert!(ic.short_put.strike() > ic.long_put.strike());
            assert!(ic.max_loss(1).unwrap() >= rust_decimal::Decimal::ZERO);
        }
        // Higher delta targets sit closer to the money.
        assert!(first[0].short_call.strike() >= first[2].short_call.strike());
        assert!(first[0].short_put.strike() <= first[2].short_put.strike());
    }

    #[test]
    fn rejects_out_of_range_targets() {
        assert!(matches!(
            select_strategy(&hand_chain(), 1.2),
            Err(CondorError::InvalidInput(_))
        ));
        assert!(SelectorConfig { targets: vec![0.0] }.validate().is_err());
    }
}
