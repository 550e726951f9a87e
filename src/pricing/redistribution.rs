//! Multi-outcome price redistribution
//!
//! After one outcome's price changes, every other outcome absorbs the
//! opposite move in proportion to its pre-trade price, then the vector is
//! clamped and renormalized so the sum-to-one invariant holds exactly.

use solana_program::program_error::ProgramError;

use crate::constants::{DEGENERATE_MASS_RAW, MAX_PRICE_RAW, MIN_PRICE_RAW};
use crate::error::QuantumMarketError;
use crate::math::fixed_point::I64F64;

/// Outcome of a redistribution pass
#[derive(Debug, Clone)]
pub struct RedistributionResult {
    /// Full post-trade price vector, summing to one exactly
    pub prices: Vec<I64F64>,
    /// Whether any price hit the allowed band
    pub clamped: bool,
}

/// Rebalance all other outcomes after outcome `target` moves to `new_price`
///
/// Pure with respect to the input slice; the caller commits the result.
pub fn redistribute(
    prices: &[I64F64],
    target: usize,
    new_price: I64F64,
) -> Result<RedistributionResult, ProgramError> {
    let n = prices.len();
    if target >= n {
        return Err(QuantumMarketError::InvalidOutcome.into());
    }

    let min_price = I64F64::from_raw(MIN_PRICE_RAW);
    let max_price = I64F64::from_raw(MAX_PRICE_RAW);

    let old_price = prices[target];
    let delta = new_price.checked_sub(old_price)?;
    let remaining_mass = I64F64::ONE.checked_sub(old_price)?;

    let mut next: Vec<I64F64> = prices.to_vec();
    next[target] = new_price;

    if remaining_mass < I64F64::from_raw(DEGENERATE_MASS_RAW) {
        // The target already holds nearly all probability mass, so a
        // proportional split has nothing to scale against
        let share = delta.checked_div(I64F64::from_num((n - 1) as i64))?;
        for (j, slot) in next.iter_mut().enumerate() {
            if j != target {
                *slot = slot.checked_sub(share)?;
            }
        }
    } else {
        for (j, slot) in next.iter_mut().enumerate() {
            if j != target {
                let shift = delta
                    .checked_mul(prices[j])?
                    .checked_div(remaining_mass)?;
                *slot = slot.checked_sub(shift)?;
            }
        }
    }

    // Clamp pass
    let mut clamped = false;
    for slot in next.iter_mut() {
        let bounded = (*slot).clamp(min_price, max_price);
        if bounded != *slot {
            clamped = true;
            *slot = bounded;
        }
    }

    // Clamping breaks the sum, so renormalize the whole vector
    if clamped {
        let sum = vector_sum(&next)?;
        if sum.is_zero() {
            return Err(QuantumMarketError::DivisionByZero.into());
        }
        for slot in next.iter_mut() {
            *slot = slot.checked_div(sum)?;
        }
        for slot in next.iter_mut() {
            *slot = (*slot).clamp(min_price, max_price);
        }
    }

    // Fold the rounding residue into an adjusted outcome so the sum is
    // exact, not merely close; the target keeps its solved price unless no
    // other entry has the headroom
    let sum = vector_sum(&next)?;
    let residue = I64F64::ONE.checked_sub(sum)?;
    if !residue.is_zero() {
        let candidate = extreme_index(&next, target, residue.is_negative());
        let adjusted = next[candidate].checked_add(residue)?;
        let index = if adjusted.raw >= MIN_PRICE_RAW && adjusted.raw <= MAX_PRICE_RAW {
            candidate
        } else {
            target
        };
        next[index] = next[index].checked_add(residue)?;
    }

    debug_assert_eq!(vector_sum(&next)?.raw, I64F64::ONE.raw);

    Ok(RedistributionResult {
        prices: next,
        clamped,
    })
}

fn vector_sum(prices: &[I64F64]) -> Result<I64F64, ProgramError> {
    let mut sum = I64F64::ZERO;
    for price in prices {
        sum = sum.checked_add(*price)?;
    }
    Ok(sum)
}

/// Largest (or smallest) entry other than the excluded one
fn extreme_index(prices: &[I64F64], excluded: usize, want_max: bool) -> usize {
    let mut index = if excluded == 0 { 1 } else { 0 };
    for (j, price) in prices.iter().enumerate() {
        if j == excluded {
            continue;
        }
        let better = if want_max {
            *price > prices[index]
        } else {
            *price < prices[index]
        };
        if better {
            index = j;
        }
    }
    index
}
