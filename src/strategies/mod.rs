// src/strategies/mod.rs
pub mod condor;
pub mod scorer;
pub mod selector;

pub use condor::{IronCondorStrategy, StrategyLeg, StrategyProfile};
pub use scorer::{classify, ScoreTier, ScoringConfig, SignalScore, SignalScorer, MAX_SCORE};
pub use selector::{select_strategies, select_strategy, SelectorConfig, StrategySelector};
