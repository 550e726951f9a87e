//! Table lookup and interpolation
//!
//! Linear interpolation over the precomputed Φ/φ grid, plus the inverse
//! CDF used to map a price back onto its z-score. Each lookup costs one
//! index computation and one interpolation in fixed point.

use solana_program::program_error::ProgramError;

use crate::error::QuantumMarketError;
use crate::math::fixed_point::I64F64;
use crate::math::tables::{NormalTables, TABLE_MIN_X, TABLE_SIZE, TABLE_STEP};

fn entry(table: &[u64], index: usize) -> I64F64 {
    I64F64::from_raw(table[index] as i128)
}

/// Index and interpolation fraction for a z value
///
/// Returns None when z lies outside the tabulated range.
fn table_position(z: I64F64) -> Result<Option<(usize, I64F64)>, ProgramError> {
    let min_z = I64F64::from_fraction(TABLE_MIN_X as i64, 100)?;
    let span = I64F64::from_num((TABLE_SIZE - 1) as i64);

    // Position on the grid in units of one step
    let position = z
        .checked_sub(min_z)?
        .checked_mul(I64F64::from_fraction(100, TABLE_STEP as i64)?)?;

    if position.is_negative() || position >= span {
        return Ok(None);
    }

    let index = position.to_num() as usize;
    let fraction = position.checked_sub(I64F64::from_num(index as i64))?;

    Ok(Some((index.min(TABLE_SIZE - 2), fraction)))
}

/// Look up CDF value Φ(z) with interpolation
pub fn lookup_cdf(tables: &NormalTables, z: I64F64) -> Result<I64F64, ProgramError> {
    let position = match table_position(z)? {
        Some(p) => p,
        None => {
            // Saturate to the boundary values so Φ stays monotonic
            return Ok(if z.is_negative() {
                entry(&tables.cdf, 0)
            } else {
                entry(&tables.cdf, TABLE_SIZE - 1)
            });
        }
    };

    interpolate(&tables.cdf, position)
}

/// Look up PDF value φ(z) with interpolation
pub fn lookup_pdf(tables: &NormalTables, z: I64F64) -> Result<I64F64, ProgramError> {
    let position = match table_position(z)? {
        Some(p) => p,
        None => return Ok(I64F64::ZERO),
    };

    interpolate(&tables.pdf, position)
}

fn interpolate(table: &[u64], (index, fraction): (usize, I64F64)) -> Result<I64F64, ProgramError> {
    let y0 = entry(table, index);
    let y1 = entry(table, index + 1);

    // Signed delta handles the decreasing half of the density
    let delta = y1.checked_sub(y0)?;
    y0.checked_add(delta.checked_mul(fraction)?)
}

/// Look up the quantile Φ⁻¹(p) by binary search over the CDF table
pub fn lookup_inverse_cdf(tables: &NormalTables, p: I64F64) -> Result<I64F64, ProgramError> {
    let lowest = entry(&tables.cdf, 0);
    let highest = entry(&tables.cdf, TABLE_SIZE - 1);

    if p <= lowest {
        return I64F64::from_fraction(TABLE_MIN_X as i64, 100);
    }
    if p >= highest {
        return I64F64::from_fraction((TABLE_MIN_X + (TABLE_SIZE as i32 - 1) * TABLE_STEP) as i64, 100);
    }

    // Smallest index whose CDF value is >= p
    let mut left = 0usize;
    let mut right = TABLE_SIZE - 1;
    while left < right {
        let mid = (left + right) / 2;
        if entry(&tables.cdf, mid) < p {
            left = mid + 1;
        } else {
            right = mid;
        }
    }

    let y0 = entry(&tables.cdf, left - 1);
    let y1 = entry(&tables.cdf, left);
    let delta = y1.checked_sub(y0)?;

    let fraction = if delta.is_zero() {
        I64F64::ZERO
    } else {
        p.checked_sub(y0)?.checked_div(delta)?
    };

    let base = I64F64::from_fraction((TABLE_MIN_X + (left as i32 - 1) * TABLE_STEP) as i64, 100)?;
    let step = I64F64::from_fraction(TABLE_STEP as i64, 100)?;

    base.checked_add(step.checked_mul(fraction)?)
}

/// Convenience guard for callers that require a strictly positive lookup
pub fn require_positive(value: I64F64) -> Result<I64F64, ProgramError> {
    if value.is_zero() || value.is_negative() {
        return Err(QuantumMarketError::DivisionByZero.into());
    }
    Ok(value)
}
