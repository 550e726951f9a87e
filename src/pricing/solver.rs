//! Newton-Raphson solver for the implicit pricing equation
//!
//! Given one outcome's price and a signed order size, finds the new
//! clearing price. The price p relates to the pool's inventory imbalance d
//! through p = Φ(d/s) with depth s = L·√(T-t); the reserve behind the
//! outcome is x(d) = d·(Φ(d/s) - 1) + s·φ(d/s), and a signed order of size
//! q moves it to x(d₀) - q. The root of
//!
//!   F(d) = d·(Φ(d/s) - 1) + s·φ(d/s) - x₁
//!
//! gives the post-trade imbalance. The analytic derivative collapses to
//! F'(d) = Φ(d/s) - 1, so every iteration costs one CDF and one PDF table
//! lookup plus fixed-point multiply/divide.

use solana_program::{msg, program_error::ProgramError};

use crate::constants::{
    DERIVATIVE_FLOOR_RAW, MAX_PRICE_RAW, MAX_SOLVER_ITERATIONS, MIN_PRICE_RAW,
    SOLVER_TOLERANCE_RAW,
};
use crate::math::fixed_point::I64F64;
use crate::math::table_lookup::{lookup_cdf, lookup_inverse_cdf, lookup_pdf, require_positive};
use crate::math::tables::NormalTables;

/// Result of one solver run
///
/// The solver is pure: persisting the price is the caller's job.
#[derive(Debug, Clone, Copy)]
pub struct SolveResult {
    /// New clearing price, already clamped into the allowed band
    pub price: I64F64,
    /// Iterations consumed, never above the hard ceiling
    pub iterations: u8,
    /// Residual at the returned root, in price units
    pub residual: I64F64,
    /// Whether the residual met the error bound
    pub converged: bool,
    /// Whether the price clamp was applied
    pub clamped: bool,
}

/// Solve for the new price of one outcome after a signed order
pub fn solve_new_price(
    tables: &NormalTables,
    current_price: I64F64,
    order_size: I64F64,
    depth: I64F64,
) -> Result<SolveResult, ProgramError> {
    let depth = require_positive(depth)?;

    let min_price = I64F64::from_raw(MIN_PRICE_RAW);
    let max_price = I64F64::from_raw(MAX_PRICE_RAW);

    if order_size.is_zero() {
        return Ok(SolveResult {
            price: current_price.clamp(min_price, max_price),
            iterations: 0,
            residual: I64F64::ZERO,
            converged: true,
            clamped: false,
        });
    }

    // Current state in the imbalance coordinate
    let z0 = lookup_inverse_cdf(tables, current_price)?;
    let pdf0 = lookup_pdf(tables, z0)?;
    let d0 = z0.checked_mul(depth)?;

    let reserve = d0
        .checked_mul(current_price.checked_sub(I64F64::ONE)?)?
        .checked_add(depth.checked_mul(pdf0)?)?;
    let target_reserve = reserve.checked_sub(order_size)?;

    // Initial guess: pre-trade price plus the first-order impact of the
    // order against the available depth
    let headroom = I64F64::ONE
        .checked_sub(current_price)?
        .max(I64F64::from_raw(MIN_PRICE_RAW));
    let impact = order_size
        .checked_mul(pdf0)?
        .checked_div(depth.checked_mul(headroom)?)?;
    let guess_price = current_price
        .checked_add(impact)?
        .clamp(min_price, max_price);

    let mut d = lookup_inverse_cdf(tables, guess_price)?.checked_mul(depth)?;

    // Keep iterates inside the tabulated z range
    let d_max = depth.checked_mul(I64F64::from_num(4))?;
    let d_min = d_max.checked_neg()?;

    let tolerance = I64F64::from_raw(SOLVER_TOLERANCE_RAW);
    let derivative_floor = I64F64::from_raw(DERIVATIVE_FLOOR_RAW);

    // Iterations count Newton steps; the stopping rule reads the residual
    // at every iterate, the fifth included
    let mut iterations = 0u8;
    let mut residual;
    let mut converged = false;

    loop {
        let z = d.checked_div(depth)?;
        let cdf = lookup_cdf(tables, z)?;
        let pdf = lookup_pdf(tables, z)?;

        let slope = cdf.checked_sub(I64F64::ONE)?;
        let f = d
            .checked_mul(slope)?
            .checked_add(depth.checked_mul(pdf)?)?
            .checked_sub(target_reserve)?;

        // Residual in price units so the bound is depth-independent
        residual = f.checked_div(depth)?;

        if residual.abs() < tolerance {
            converged = true;
            break;
        }

        if iterations >= MAX_SOLVER_ITERATIONS {
            break;
        }

        if slope.abs() < derivative_floor {
            msg!("Solver derivative vanished after {} iterations", iterations);
            break;
        }

        let step = f.checked_div(slope)?;
        d = d.checked_sub(step)?.clamp(d_min, d_max);
        iterations += 1;
    }

    if !converged {
        msg!(
            "Solver returned best estimate after {} iterations, residual {}",
            iterations,
            residual
        );
    }

    let solution = lookup_cdf(tables, d.checked_div(depth)?)?;
    let price = solution.clamp(min_price, max_price);
    let clamped = price != solution;

    Ok(SolveResult {
        price,
        iterations,
        residual,
        converged,
        clamped,
    })
}
