//! Precomputed CDF/PDF tables for the standard normal distribution
//!
//! 801 points from x = -4.0 to x = 4.0 with 0.01 step size. The tables are
//! process-wide, read-only and built once at first use; trade-time code
//! only ever performs lookups, never transcendental evaluation. Values are
//! generated deterministically in fixed point (Taylor series for exp and
//! erf), so every process builds bit-identical tables.

use lazy_static::lazy_static;
use solana_program::program_error::ProgramError;

use crate::math::fixed_point::I64F64;

/// Smallest tabulated x, in hundredths
pub const TABLE_MIN_X: i32 = -400;

/// Largest tabulated x, in hundredths
pub const TABLE_MAX_X: i32 = 400;

/// Step between entries, in hundredths
pub const TABLE_STEP: i32 = 1;

/// Number of table entries
pub const TABLE_SIZE: usize = ((TABLE_MAX_X - TABLE_MIN_X) / TABLE_STEP + 1) as usize;

/// Normal distribution tables
///
/// Entries are the low 64 raw bits of the 64.64 value; both Φ and φ stay
/// strictly below one over the tabulated range, so the integer part is
/// always zero.
#[derive(Debug, Clone)]
pub struct NormalTables {
    pub cdf: Vec<u64>,
    pub pdf: Vec<u64>,
}

lazy_static! {
    static ref NORMAL_TABLES: NormalTables =
        NormalTables::build().expect("normal table generation is total over the fixed grid");
}

/// Shared read-only tables, built on first access
pub fn normal_tables() -> &'static NormalTables {
    &NORMAL_TABLES
}

impl NormalTables {
    /// Generate both tables over the fixed grid
    pub fn build() -> Result<Self, ProgramError> {
        // 2π and 2/√π to 16 significant digits
        let two_pi = I64F64::from_fraction(6_283_185_307_179_586, 1_000_000_000_000_000)?;
        let inv_sqrt_2pi = I64F64::ONE.checked_div(two_pi.sqrt()?)?;
        let inv_sqrt_2 = I64F64::ONE.checked_div(I64F64::from_num(2).sqrt()?)?;
        let two_over_sqrt_pi = I64F64::from_fraction(1_128_379_167_095_513, 1_000_000_000_000_000)?;

        let mut cdf = Vec::with_capacity(TABLE_SIZE);
        let mut pdf = Vec::with_capacity(TABLE_SIZE);

        let half = I64F64::from_fraction(1, 2)?;
        let max_fractional = (1u128 << 64) - 1;

        for i in 0..TABLE_SIZE {
            let hundredths = TABLE_MIN_X + (i as i32) * TABLE_STEP;
            let x = I64F64::from_fraction(hundredths as i64, 100)?;

            // φ(x) = exp(-x²/2) / √(2π)
            let t = x.checked_mul(x)?.checked_mul(half)?;
            let gaussian = I64F64::ONE.checked_div(t.exp()?)?;
            let density = inv_sqrt_2pi.checked_mul(gaussian)?;

            // Φ(x) = (1 + erf(x/√2)) / 2
            let u = x.checked_mul(inv_sqrt_2)?;
            let erf_u = erf(u, two_over_sqrt_pi)?;
            let cumulative = I64F64::ONE
                .checked_add(erf_u)?
                .checked_mul(half)?
                .clamp(I64F64::ZERO, I64F64::ONE);

            pdf.push(density.raw.unsigned_abs().min(max_fractional) as u64);
            cdf.push(cumulative.raw.unsigned_abs().min(max_fractional) as u64);
        }

        Ok(Self { cdf, pdf })
    }
}

/// Error function via its alternating Taylor series
///
/// erf(u) = 2/√π · Σ (-1)ⁿ u^(2n+1) / (n! (2n+1)), accurate over the
/// |u| ≤ 4/√2 range the tables need.
fn erf(u: I64F64, two_over_sqrt_pi: I64F64) -> Result<I64F64, ProgramError> {
    let u_abs = u.abs();
    let u_sq = u_abs.checked_mul(u_abs)?;

    // power carries u^(2n+1)/n!, the 1/(2n+1) factor is applied per term
    let mut power = u_abs;
    let mut sum = u_abs;

    for n in 1..=64i64 {
        power = power.checked_mul(u_sq)?.checked_div(I64F64::from_num(n))?;
        let term = power.checked_div(I64F64::from_num(2 * n + 1))?;

        if term.is_zero() {
            break;
        }

        if n % 2 == 1 {
            sum = sum.checked_sub(term)?;
        } else {
            sum = sum.checked_add(term)?;
        }
    }

    let magnitude = two_over_sqrt_pi
        .checked_mul(sum)?
        .clamp(I64F64::ZERO, I64F64::ONE);

    if u.is_negative() {
        magnitude.checked_neg()
    } else {
        Ok(magnitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ONE_RAW;

    fn table_value(raw: u64) -> I64F64 {
        I64F64::from_raw(raw as i128)
    }

    fn close_to(value: I64F64, target_num: i64, target_den: i64, tolerance_den: i64) -> bool {
        let target = I64F64::from_fraction(target_num, target_den).unwrap();
        let tolerance = I64F64::from_fraction(1, tolerance_den).unwrap();
        value.checked_sub(target).unwrap().abs() < tolerance
    }

    #[test]
    fn test_table_constants() {
        assert_eq!(TABLE_SIZE, 801);
        let tables = normal_tables();
        assert_eq!(tables.cdf.len(), TABLE_SIZE);
        assert_eq!(tables.pdf.len(), TABLE_SIZE);
    }

    #[test]
    fn test_center_values() {
        let tables = normal_tables();

        // Φ(0) = 0.5 exactly
        assert_eq!(tables.cdf[400] as i128, ONE_RAW / 2);

        // φ(0) = 0.3989422804...
        assert!(close_to(
            table_value(tables.pdf[400]),
            3_989_422_804,
            10_000_000_000,
            1_000_000
        ));
    }

    #[test]
    fn test_reference_points() {
        let tables = normal_tables();

        // Φ(1) = 0.8413447, index 500
        assert!(close_to(table_value(tables.cdf[500]), 8_413_447, 10_000_000, 1_000_000));
        // Φ(-1) = 0.1586553, index 300
        assert!(close_to(table_value(tables.cdf[300]), 1_586_553, 10_000_000, 1_000_000));
        // φ(1) = 0.2419707, symmetric at index 300 and 500
        assert!(close_to(table_value(tables.pdf[500]), 2_419_707, 10_000_000, 1_000_000));
        assert_eq!(tables.pdf[500], tables.pdf[300]);
        // Φ(4) = 0.9999683
        assert!(close_to(table_value(tables.cdf[800]), 9_999_683, 10_000_000, 1_000_000));
    }

    #[test]
    fn test_cdf_is_monotonic() {
        let tables = normal_tables();
        for i in 1..TABLE_SIZE {
            assert!(tables.cdf[i] > tables.cdf[i - 1], "non-monotonic at {}", i);
        }
    }

    #[test]
    fn test_symmetry() {
        let tables = normal_tables();
        for i in 0..TABLE_SIZE {
            let mirrored = TABLE_SIZE - 1 - i;
            // Φ(x) + Φ(-x) = 1 within a couple of ulps
            let sum = tables.cdf[i] as i128 + tables.cdf[mirrored] as i128;
            assert!((sum - ONE_RAW).abs() <= 4, "asymmetric cdf at {}", i);
            // φ is even
            let diff = tables.pdf[i] as i128 - tables.pdf[mirrored] as i128;
            assert!(diff.abs() <= 4, "asymmetric pdf at {}", i);
        }
    }
}
