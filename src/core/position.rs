// src/core/position.rs
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::strategies::{IronCondorStrategy, StrategyProfile};
use crate::utils::precision::contract_dollars;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionStatus {
    Open,
    Closed,
}

/// Result of the latest `Ledger::mark` on a position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionMark {
    pub at: DateTime<Utc>,
    /// Per-share debit to close at the marked quotes.
    pub cost_to_close: Decimal,
    /// Dollars across all contracts.
    pub unrealized_pnl: Decimal,
}

/// Thresholds for the advisory exit checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitRules {
    /// Take profit once this percent of the entry credit is captured. Default 50.
    pub profit_target_pct: Decimal,
    /// Flag positions at or under this many days to expiry. Default 21.
    pub time_exit_dte: u32,
    /// Stop once the loss reaches this percent of the entry credit. Default 100.
    pub stop_loss_pct: Decimal,
}

impl Default for ExitRules {
    fn default() -> Self {
        Self {
            profit_target_pct: Decimal::from(50),
            time_exit_dte: 21,
            stop_loss_pct: Decimal::ONE_HUNDRED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitSignal {
    ProfitTarget { captured_pct: Decimal },
    TimeExit { days_remaining: u32 },
    StopLoss { loss_pct: Decimal },
}

impl fmt::Display for ExitSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitSignal::ProfitTarget { captured_pct } => {
                write!(f, "Profit target reached ({}% of credit)", captured_pct.round_dp(1))
            }
            ExitSignal::TimeExit { days_remaining } => {
                write!(f, "Time exit ({days_remaining} DTE)")
            }
            ExitSignal::StopLoss { loss_pct } => {
                write!(f, "Stop loss hit ({}% of credit)", loss_pct.round_dp(1))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: u64,
    pub profile: Option<StrategyProfile>,
    pub strategy: IronCondorStrategy,
    pub contracts: u32,
    pub opened_at: DateTime<Utc>,
    /// Per-share credit received at open.
    pub entry_credit: Decimal,
    /// Dollars held against the position (max loss at open).
    pub margin: Decimal,
    pub status: PositionStatus,
    pub note: Option<String>,
    pub last_mark: Option<PositionMark>,
}

impl Position {
    /// Dollars credited to cash at open.
    pub fn credit_received(&self) -> Decimal {
        contract_dollars(self.entry_credit, self.contracts)
    }

    /// Unrealized P&L from the latest mark, zero if never marked.
    pub fn unrealized_pnl(&self) -> Decimal {
        self.last_mark.map(|m| m.unrealized_pnl).unwrap_or_default()
    }

    /// Dollars needed to close at the latest mark, or at the entry credit if
    /// never marked.
    pub fn cost_to_close(&self) -> Decimal {
        self.credit_received() - self.unrealized_pnl()
    }

    pub fn days_remaining(&self, as_of: DateTime<Utc>) -> u32 {
        let elapsed = (as_of - self.opened_at).num_days().max(0);
        let elapsed = u32::try_from(elapsed).unwrap_or(u32::MAX);
        self.strategy.days_to_expiry.saturating_sub(elapsed)
    }

    /// Exit conditions met as of `as_of`. P&L checks use the latest mark;
    /// an unmarked position can only trigger the time exit.
    pub fn exit_signals(&self, as_of: DateTime<Utc>, rules: &ExitRules) -> Vec<ExitSignal> {
        let mut signals = Vec::new();

        let credit = self.credit_received();
        if let Some(mark) = self.last_mark {
            if credit > Decimal::ZERO {
                let pct = mark.unrealized_pnl / credit * Decimal::ONE_HUNDRED;
                if pct >= rules.profit_target_pct {
                    signals.push(ExitSignal::ProfitTarget { captured_pct: pct });
                }
                if -pct >= rules.stop_loss_pct {
                    signals.push(ExitSignal::StopLoss { loss_pct: -pct });
                }
            }
        }

        let days_remaining = self.days_remaining(as_of);
        if days_remaining <= rules.time_exit_dte {
            signals.push(ExitSignal::TimeExit { days_remaining });
        }
        signals
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeAction {
    Open,
    Close,
}

/// One line of the trade log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub at: DateTime<Utc>,
    pub action: TradeAction,
    pub position_id: u64,
    pub contracts: u32,
    /// Signed change to cash.
    pub cash_change: Decimal,
}

pub const DEFAULT_CLOSE_REASON: &str = "Manual close";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub position_id: u64,
    pub underlying: String,
    pub profile: Option<StrategyProfile>,
    pub contracts: u32,
    /// Per-share credit at open.
    pub entry_credit: Decimal,
    /// Per-share debit paid to close.
    pub exit_debit: Decimal,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    pub realized_pnl: Decimal,
    pub days_held: i64,
    pub reason: String,
    pub note: Option<String>,
}

impl ClosedTrade {
    pub fn is_win(&self) -> bool {
        self.realized_pnl > Decimal::ZERO
    }
}
