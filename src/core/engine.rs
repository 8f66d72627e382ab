// src/core/engine.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::connectors::MarketDataSource;
use crate::core::ledger::Ledger;
use crate::core::position::{ExitSignal, Position};
use crate::error::{CondorError, CondorResult};
use crate::indicators::{compute_indicators, IndicatorConfig, IndicatorSnapshot};
use crate::market::QuoteChain;
use crate::strategies::{IronCondorStrategy, SignalScore, SignalScorer, StrategySelector};
use crate::types::{PricePoint, Signal};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketAssessment {
    pub indicators: IndicatorSnapshot,
    pub score: SignalScore,
}

impl MarketAssessment {
    pub fn entry_allowed(&self) -> bool {
        matches!(self.score.signal, Signal::StrongEntry | Signal::Entry)
    }
}

/// Everything one refresh produced, ready for a presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeskReport {
    pub underlying: String,
    pub spot: f64,
    pub as_of: DateTime<Utc>,
    pub days_to_expiry: u32,
    pub assessment: MarketAssessment,
    pub candidates: Vec<IronCondorStrategy>,
}

impl DeskReport {
    pub fn candidate(&self, target_delta: f64) -> Option<&IronCondorStrategy> {
        self.candidates
            .iter()
            .find(|c| (c.target_delta - target_delta).abs() < 1e-9)
    }
}

/// Listed expiry closest to `target_dte`; the nearer one wins a tie.
pub fn pick_expiry(expiries: &[u32], target_dte: u32) -> Option<u32> {
    expiries
        .iter()
        .copied()
        .min_by_key(|&d| (d.abs_diff(target_dte), d))
}

/// One paper-trading session: indicators, scoring, selection and the ledger
/// that owns the account.
pub struct CondorDesk {
    indicators: IndicatorConfig,
    scorer: SignalScorer,
    selector: StrategySelector,
    ledger: Ledger,
}

impl CondorDesk {
    pub fn new(
        indicators: IndicatorConfig,
        scorer: SignalScorer,
        selector: StrategySelector,
        ledger: Ledger,
    ) -> Self {
        Self {
            indicators,
            scorer,
            selector,
            ledger,
        }
    }

    pub fn from_config(config: &AppConfig) -> CondorResult<Self> {
        config.validate()?;
        Ok(Self::new(
            config.indicators.clone(),
            SignalScorer::new(config.scoring.clone()),
            StrategySelector::new(config.selector.clone()),
            Ledger::new(config.ledger.clone()),
        ))
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }

    pub fn assess(&self, history: &[PricePoint]) -> CondorResult<MarketAssessment> {
        let indicators = compute_indicators(history, &self.indicators)?;
        let score = self.scorer.score(&indicators);
        Ok(MarketAssessment { indicators, score })
    }

    pub fn candidates(&self, chain: &QuoteChain) -> Vec<IronCondorStrategy> {
        self.selector.select(chain)
    }

    /// Pulls history and the chain nearest `target_dte`, then scores and
    /// selects.
    pub fn refresh(&self, source: &dyn MarketDataSource, target_dte: u32) -> Result<DeskReport> {
        let history = source.price_history().context("fetching price history")?;
        let assessment = self.assess(&history).context("computing indicators")?;

        let expiries = source.expiries().context("listing expiries")?;
        let days = pick_expiry(&expiries, target_dte)
            .with_context(|| format!("no expiries listed (wanted ~{target_dte} DTE)"))?;
        let chain = source
            .quote_chain(days)
            .with_context(|| format!("fetching {days} DTE chain"))?;
        let candidates = self.candidates(&chain);

        info!(
            underlying = %chain.underlying,
            dte = days,
            signal = %assessment.score.signal,
            entry = assessment.score.entry,
            risk = assessment.score.risk,
            candidates = candidates.len(),
            "desk refreshed"
        );

        Ok(DeskReport {
            underlying: chain.underlying.clone(),
            spot: chain.spot,
            as_of: chain.as_of,
            days_to_expiry: days,
            assessment,
            candidates,
        })
    }

    /// Opens the report's candidate for `target_delta`.
    pub fn open_candidate(
        &mut self,
        report: &DeskReport,
        target_delta: f64,
        contracts: u32,
        note: Option<String>,
    ) -> CondorResult<Position> {
        let strategy = report.candidate(target_delta).ok_or_else(|| {
            CondorError::no_viable_strike(format!(
                "no candidate for delta {target_delta} at {} DTE",
                report.days_to_expiry
            ))
        })?;
        if !report.assessment.entry_allowed() {
            warn!(
                signal = %report.assessment.score.signal,
                "opening against a non-entry signal"
            );
        }
        self.ledger.open(strategy, contracts, note)
    }

    /// Marks every open position on the chain's underlying. Failures are
    /// reported per position; one bad leg does not stop the rest.
    pub fn mark_all(&mut self, chain: &QuoteChain) -> Vec<(u64, CondorResult<Decimal>)> {
        let ids: Vec<u64> = self
            .ledger
            .positions()
            .iter()
            .filter(|p| p.strategy.underlying == chain.underlying)
            .map(|p| p.id)
            .collect();

        ids.into_iter()
            .map(|id| {
                let result = self.ledger.mark(id, chain);
                if let Err(e) = &result {
                    warn!(id, "mark failed: {}", e);
                }
                (id, result)
            })
            .collect()
    }

    pub fn review_exits(&self, as_of: DateTime<Utc>) -> Vec<(u64, Vec<ExitSignal>)> {
        let flagged = self.ledger.exit_signals(as_of);
        for (id, signals) in &flagged {
            for signal in signals {
                info!(id, "exit signal: {}", signal);
            }
        }
        flagged
    }
}
