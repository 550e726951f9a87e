//! Pricing engine: state, implicit-equation solver and redistribution
//!
//! `execute_trade` is the one mutation path for a `PricingState`: it runs
//! the solver, rebalances the remaining outcomes and commits the result
//! atomically with the volume update.

pub mod redistribution;
pub mod solver;
pub mod state;

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::program_error::ProgramError;

use crate::error::{Condition, QuantumMarketError};
use crate::math::fixed_point::I64F64;
use crate::math::tables::NormalTables;

pub use redistribution::{redistribute, RedistributionResult};
pub use solver::{solve_new_price, SolveResult};
pub use state::PricingState;

/// Successful trade outcome returned to the caller
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct TradeReceipt {
    /// Price of the traded outcome after commit
    pub realized_price: I64F64,
    /// Full post-trade price vector
    pub prices: Vec<I64F64>,
    /// Solver iterations consumed
    pub iterations: u8,
    /// Non-fatal conditions raised while pricing
    pub conditions: Vec<Condition>,
}

/// Price a signed order against one outcome and commit the result
pub fn execute_trade(
    tables: &NormalTables,
    state: &mut PricingState,
    outcome: usize,
    order_size: I64F64,
    now: i64,
) -> Result<TradeReceipt, ProgramError> {
    state.ensure_tradeable()?;
    if outcome >= state.outcome_count as usize {
        return Err(QuantumMarketError::InvalidOutcome.into());
    }

    state.advance_time(now);

    let depth = state.effective_depth()?;
    let solved = solve_new_price(tables, state.price(outcome)?, order_size, depth)?;
    let rebalanced = redistribute(&state.prices, outcome, solved.price)?;

    // All fallible pricing work is done; commit
    state.prices = rebalanced.prices;
    state.record_volume(outcome, order_size)?;

    let mut conditions = Vec::new();
    if !solved.converged {
        conditions.push(Condition::LowPrecisionConvergence);
    }
    if solved.clamped || rebalanced.clamped {
        conditions.push(Condition::PriceBoundHit);
    }

    Ok(TradeReceipt {
        realized_price: state.price(outcome)?,
        prices: state.prices.clone(),
        iterations: solved.iterations,
        conditions,
    })
}
