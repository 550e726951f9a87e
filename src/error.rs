//! Error types for the quantum market engine

use borsh::{BorshDeserialize, BorshSerialize};
use num_derive::FromPrimitive;
use solana_program::{
    decode_error::DecodeError,
    msg,
    program_error::{PrintProgramError, ProgramError},
};
use thiserror::Error;

/// Custom error type for the quantum market engine
///
/// Every variant in the 7000-7019 band rejects the operation before any
/// state is written; callers retry with corrected inputs or treat the
/// request as failed. Arithmetic variants (7020+) indicate inputs outside
/// the representable range of the fixed-point kernel.
#[derive(Clone, Debug, Eq, Error, FromPrimitive, PartialEq)]
pub enum QuantumMarketError {
    // Market construction and lookup (7000-7009)
    #[error("Outcome count out of range")]
    InvalidOutcomeCount = 7000,

    #[error("Invalid outcome index")]
    InvalidOutcome = 7001,

    #[error("Liquidity parameter must be positive")]
    InvalidLiquidityParameter = 7002,

    #[error("Expiry must be after creation time")]
    InvalidExpiry = 7003,

    #[error("Market not found")]
    MarketNotFound = 7004,

    #[error("Proposal not found")]
    ProposalNotFound = 7005,

    #[error("Proposal count out of range")]
    InvalidProposalCount = 7006,

    #[error("Invalid input")]
    InvalidInput = 7007,

    // Trading rejections (7010-7019)
    #[error("Market is not active")]
    MarketNotActive = 7010,

    #[error("Market already settled")]
    MarketSettled = 7011,

    #[error("Proposal is locked")]
    ProposalLocked = 7012,

    #[error("Insufficient credits")]
    InsufficientCredits = 7013,

    #[error("Depositor already has credits for this market")]
    AlreadyDeposited = 7014,

    #[error("Market already collapsed")]
    AlreadyCollapsed = 7015,

    #[error("Too early to collapse")]
    CollapseTooEarly = 7016,

    #[error("Nothing to claim")]
    NothingToClaim = 7017,

    #[error("Leverage too high")]
    LeverageTooHigh = 7018,

    #[error("Invalid deposit amount")]
    InvalidDeposit = 7019,

    // Numeric failures (7020-7029)
    #[error("Arithmetic overflow")]
    ArithmeticOverflow = 7020,

    #[error("Division by zero")]
    DivisionByZero = 7021,

    #[error("Invalid credit weights")]
    InvalidWeights = 7022,

    #[error("Depositor not found")]
    DepositorNotFound = 7023,
}

impl PrintProgramError for QuantumMarketError {
    fn print<E>(&self) {
        msg!("Quantum Market Error: {}", self);
    }
}

impl From<QuantumMarketError> for ProgramError {
    fn from(e: QuantumMarketError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for QuantumMarketError {
    fn type_of() -> &'static str {
        "QuantumMarketError"
    }
}

/// Non-fatal condition attached to a successful trade result
///
/// Conditions are always surfaced to the caller so monitoring can track
/// solver precision and price-bound frequency; they never block the trade.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// Solver hit the iteration ceiling before meeting the error bound
    LowPrecisionConvergence,
    /// A price was clamped to the allowed band
    PriceBoundHit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_round_trip() {
        use num_traits::FromPrimitive;

        let err = QuantumMarketError::InsufficientCredits;
        let program_err: ProgramError = err.clone().into();
        assert_eq!(program_err, ProgramError::Custom(7013));
        assert_eq!(
            QuantumMarketError::from_u32(7013),
            Some(QuantumMarketError::InsufficientCredits)
        );
    }

    #[test]
    fn test_rejections_are_distinct() {
        let a: ProgramError = QuantumMarketError::AlreadyCollapsed.into();
        let b: ProgramError = QuantumMarketError::NothingToClaim.into();
        assert_ne!(a, b);
    }
}
