// src/core/ledger.rs
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::position::{
    ClosedTrade, ExitRules, ExitSignal, Position, PositionMark, PositionStatus, TradeAction,
    TradeEvent, DEFAULT_CLOSE_REASON,
};
use crate::error::{CondorError, CondorResult};
use crate::market::QuoteChain;
use crate::strategies::{IronCondorStrategy, StrategyProfile};
use crate::utils::precision::contract_dollars;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Default 10000.
    pub starting_cash: Decimal,
    pub exits: ExitRules,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            starting_cash: Decimal::from(10_000),
            exits: ExitRules::default(),
        }
    }
}

impl LedgerConfig {
    pub fn validate(&self) -> CondorResult<()> {
        if self.starting_cash <= Decimal::ZERO {
            return Err(CondorError::invalid_input(format!(
                "starting_cash must be > 0, got {}",
                self.starting_cash
            )));
        }
        if self.exits.profit_target_pct <= Decimal::ZERO || self.exits.stop_loss_pct <= Decimal::ZERO
        {
            return Err(CondorError::invalid_input(
                "exit percentages must be > 0",
            ));
        }
        Ok(())
    }
}

/// How a close is priced.
#[derive(Debug, Clone, Copy)]
pub enum ClosingPrice<'a> {
    /// Per-share debit actually paid.
    Fill(Decimal),
    /// Buy back at the chain's current quotes.
    Chain(&'a QuoteChain),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub starting_cash: Decimal,
    pub cash: Decimal,
    pub margin_held: Decimal,
    pub available_cash: Decimal,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    /// Cash less what it would cost to close every open position.
    pub account_value: Decimal,
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate_pct: Decimal,
    pub avg_win: Decimal,
    pub avg_loss: Decimal,
    pub open_positions: usize,
    pub roi_pct: Decimal,
}

/// Paper account for iron condors.
///
/// Every mutating call either fully applies or leaves the ledger untouched.
#[derive(Debug, Clone)]
pub struct Ledger {
    config: LedgerConfig,
    cash: Decimal,
    margin_held: Decimal,
    next_id: u64,
    open: Vec<Position>,
    history: Vec<ClosedTrade>,
    journal: Vec<TradeEvent>,
}

impl Ledger {
    pub fn new(config: LedgerConfig) -> Self {
        let cash = config.starting_cash;
        Self {
            config,
            cash,
            margin_held: Decimal::ZERO,
            next_id: 1,
            open: Vec::new(),
            history: Vec::new(),
            journal: Vec::new(),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn starting_cash(&self) -> Decimal {
        self.config.starting_cash
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn margin_held(&self) -> Decimal {
        self.margin_held
    }

    pub fn available_cash(&self) -> Decimal {
        self.cash - self.margin_held
    }

    pub fn positions(&self) -> &[Position] {
        &self.open
    }

    pub fn position(&self, id: u64) -> Option<&Position> {
        self.open.iter().find(|p| p.id == id)
    }

    pub fn history(&self) -> &[ClosedTrade] {
        &self.history
    }

    pub fn journal(&self) -> &[TradeEvent] {
        &self.journal
    }

    pub fn open(
        &mut self,
        strategy: &IronCondorStrategy,
        contracts: u32,
        note: Option<String>,
    ) -> CondorResult<Position> {
        self.open_at(strategy, contracts, note, Utc::now())
    }

    pub fn open_at(
        &mut self,
        strategy: &IronCondorStrategy,
        contracts: u32,
        note: Option<String>,
        at: DateTime<Utc>,
    ) -> CondorResult<Position> {
        if contracts < 1 {
            return Err(CondorError::invalid_input("contracts must be >= 1"));
        }

        let margin = strategy.max_loss(contracts)?;
        let available = self.available_cash();
        if margin > available {
            warn!(
                underlying = %strategy.underlying,
                %margin,
                %available,
                "open rejected: insufficient cash"
            );
            return Err(CondorError::InsufficientCash {
                required: margin,
                available,
            });
        }

        let position = Position {
            id: self.next_id,
            profile: StrategyProfile::from_target(strategy.target_delta),
            strategy: strategy.clone(),
            contracts,
            opened_at: at,
            entry_credit: strategy.credit(),
            margin,
            status: PositionStatus::Open,
            note,
            last_mark: None,
        };
        let credit = position.credit_received();

        self.next_id += 1;
        self.cash += credit;
        self.margin_held += margin;
        self.journal.push(TradeEvent {
            at,
            action: TradeAction::Open,
            position_id: position.id,
            contracts,
            cash_change: credit,
        });
        self.open.push(position.clone());

        info!(
            id = position.id,
            underlying = %position.strategy.underlying,
            contracts,
            %credit,
            %margin,
            cash = %self.cash,
            "position opened"
        );
        Ok(position)
    }

    /// Re-prices an open position against `chain` and records the mark.
    /// Returns unrealized P&L in dollars. Cash and margin are untouched.
    pub fn mark(&mut self, id: u64, chain: &QuoteChain) -> CondorResult<Decimal> {
        let idx = self.open_index(id)?;
        let position = &self.open[idx];
        if position.strategy.underlying != chain.underlying {
            return Err(CondorError::invalid_input(format!(
                "position #{id} is on {}, chain is {}",
                position.strategy.underlying, chain.underlying
            )));
        }

        let cost_to_close = position.strategy.cost_to_close(chain)?;
        let unrealized_pnl = contract_dollars(position.entry_credit - cost_to_close, position.contracts);

        self.open[idx].last_mark = Some(PositionMark {
            at: chain.as_of,
            cost_to_close,
            unrealized_pnl,
        });
        info!(id, %cost_to_close, %unrealized_pnl, "position marked");
        Ok(unrealized_pnl)
    }

    pub fn close(&mut self, id: u64, closing: ClosingPrice<'_>) -> CondorResult<ClosedTrade> {
        self.close_at(id, closing, None, Utc::now())
    }

    /// Closes a position. The debit to close is paid from cash and the margin
    /// released, so across open and close cash moves by the realized P&L.
    pub fn close_at(
        &mut self,
        id: u64,
        closing: ClosingPrice<'_>,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> CondorResult<ClosedTrade> {
        let idx = self.open_index(id)?;
        let position = &self.open[idx];

        let exit_debit = match closing {
            ClosingPrice::Fill(debit) => {
                if debit < Decimal::ZERO {
                    return Err(CondorError::invalid_input(format!(
                        "closing debit must be >= 0, got {debit}"
                    )));
                }
                debit
            }
            ClosingPrice::Chain(chain) => position.strategy.cost_to_close(chain)?,
        };
        // both wings can't finish in the money, so the widest wing caps the debit
        let cap = position.strategy.max_width()?;
        if exit_debit > cap {
            return Err(CondorError::invalid_input(format!(
                "closing debit {exit_debit} exceeds widest wing {cap}"
            )));
        }

        let realized_pnl = contract_dollars(position.entry_credit - exit_debit, position.contracts);
        let cash_change = -contract_dollars(exit_debit, position.contracts);

        let mut position = self.open.remove(idx);
        position.status = PositionStatus::Closed;

        self.cash += cash_change;
        self.margin_held -= position.margin;

        let trade = ClosedTrade {
            position_id: position.id,
            underlying: position.strategy.underlying.clone(),
            profile: position.profile,
            contracts: position.contracts,
            entry_credit: position.entry_credit,
            exit_debit,
            opened_at: position.opened_at,
            closed_at: at,
            realized_pnl,
            days_held: (at - position.opened_at).num_days().max(0),
            reason: reason.unwrap_or_else(|| DEFAULT_CLOSE_REASON.to_string()),
            note: position.note,
        };
        self.journal.push(TradeEvent {
            at,
            action: TradeAction::Close,
            position_id: id,
            contracts: trade.contracts,
            cash_change,
        });
        self.history.push(trade.clone());

        info!(
            id,
            %exit_debit,
            %realized_pnl,
            reason = %trade.reason,
            cash = %self.cash,
            "position closed"
        );
        Ok(trade)
    }

    /// Exit checks for every open position that has at least one signal.
    pub fn exit_signals(&self, as_of: DateTime<Utc>) -> Vec<(u64, Vec<ExitSignal>)> {
        self.open
            .iter()
            .map(|p| (p.id, p.exit_signals(as_of, &self.config.exits)))
            .filter(|(_, signals)| !signals.is_empty())
            .collect()
    }

    pub fn reset(&mut self) {
        let cleared = self.open.len();
        *self = Self::new(self.config.clone());
        info!(
            cash = %self.cash,
            dropped_positions = cleared,
            "ledger reset"
        );
    }

    pub fn summary(&self) -> AccountSummary {
        let realized_pnl: Decimal = self.history.iter().map(|t| t.realized_pnl).sum();
        let unrealized_pnl: Decimal = self.open.iter().map(Position::unrealized_pnl).sum();
        let cost_to_close: Decimal = self.open.iter().map(Position::cost_to_close).sum();

        let wins: Vec<Decimal> = self
            .history
            .iter()
            .filter(|t| t.is_win())
            .map(|t| t.realized_pnl)
            .collect();
        let losses: Vec<Decimal> = self
            .history
            .iter()
            .filter(|t| t.realized_pnl < Decimal::ZERO)
            .map(|t| t.realized_pnl)
            .collect();
        let total_trades = self.history.len();

        let account_value = self.cash - cost_to_close;
        let starting_cash = self.config.starting_cash;

        AccountSummary {
            starting_cash,
            cash: self.cash,
            margin_held: self.margin_held,
            available_cash: self.available_cash(),
            realized_pnl,
            unrealized_pnl,
            account_value,
            total_trades,
            wins: wins.len(),
            losses: losses.len(),
            win_rate_pct: percent(Decimal::from(wins.len()), Decimal::from(total_trades)),
            avg_win: average(&wins),
            avg_loss: average(&losses),
            open_positions: self.open.len(),
            roi_pct: percent(account_value - starting_cash, starting_cash),
        }
    }

    fn open_index(&self, id: u64) -> CondorResult<usize> {
        self.open
            .iter()
            .position(|p| p.id == id)
            .ok_or(CondorError::PositionNotFound(id))
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

fn percent(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        Decimal::ZERO
    } else {
        (part / whole * Decimal::ONE_HUNDRED).round_dp(2)
    }
}

fn average(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        Decimal::ZERO
    } else {
        (values.iter().sum::<Decimal>() / Decimal::from(values.len())).round_dp(2)
    }
}
