pub mod engine;
pub mod ledger;
pub mod position;

pub use engine::{pick_expiry, CondorDesk, DeskReport, MarketAssessment};
pub use ledger::{AccountSummary, ClosingPrice, Ledger, LedgerConfig};
pub use position::{
    ClosedTrade, ExitRules, ExitSignal, Position, PositionMark, PositionStatus, TradeAction,
    TradeEvent, DEFAULT_CLOSE_REASON,
};
