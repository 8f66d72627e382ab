// src/error.rs
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CondorError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient data: need {required} points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("No viable strike: {0}")]
    NoViableStrike(String),

    #[error("Insufficient cash: need ${required}, have ${available} available")]
    InsufficientCash { required: Decimal, available: Decimal },

    #[error("Position #{0} not found or already closed")]
    PositionNotFound(u64),
}

pub type CondorResult<T> = Result<T, CondorError>;

impl CondorError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn no_viable_strike(msg: impl Into<String>) -> Self {
        Self::NoViableStrike(msg.into())
    }
}
