//! Per-market pricing state
//!
//! One record per market: depth parameter, time tracking and the price and
//! volume vectors the solver and redistribution mutate on every trade.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::program_error::ProgramError;

use crate::constants::{MAX_OUTCOMES, MIN_OUTCOMES, MIN_TIME_TO_EXPIRY_RAW};
use crate::error::QuantumMarketError;
use crate::math::fixed_point::I64F64;

/// Mutable pricing record for one market
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct PricingState {
    /// Arena key
    pub market_id: u64,
    /// Market depth L; larger means lower price impact per unit traded
    pub liquidity_parameter: I64F64,
    /// Premium growth control as expiry approaches
    pub lvr_beta: I64F64,
    pub initial_time: i64,
    pub current_time: i64,
    pub expiry_time: i64,
    pub outcome_count: u8,
    /// Prices in [0.001, 0.999], summing to one
    pub prices: Vec<I64F64>,
    /// Monotonically non-decreasing traded-size accumulators
    pub volumes: Vec<I64F64>,
    /// Set once the market settles; no further mutation is accepted
    pub settled: bool,
}

impl PricingState {
    pub fn new(
        market_id: u64,
        outcome_count: u8,
        liquidity_parameter: I64F64,
        initial_time: i64,
        expiry_time: i64,
        lvr_beta: I64F64,
    ) -> Result<Self, ProgramError> {
        if !(MIN_OUTCOMES..=MAX_OUTCOMES).contains(&outcome_count) {
            return Err(QuantumMarketError::InvalidOutcomeCount.into());
        }
        if liquidity_parameter.is_zero() || liquidity_parameter.is_negative() {
            return Err(QuantumMarketError::InvalidLiquidityParameter.into());
        }
        if expiry_time <= initial_time {
            return Err(QuantumMarketError::InvalidExpiry.into());
        }
        if lvr_beta.is_negative() {
            return Err(QuantumMarketError::InvalidInput.into());
        }

        let n = outcome_count as usize;
        let uniform = I64F64::from_fraction(1, n as i64)?;

        // The last outcome absorbs the rounding residue so the vector sums
        // to one exactly
        let mut prices = vec![uniform; n];
        let mut partial = I64F64::ZERO;
        for price in prices.iter().take(n - 1) {
            partial = partial.checked_add(*price)?;
        }
        prices[n - 1] = I64F64::ONE.checked_sub(partial)?;

        Ok(Self {
            market_id,
            liquidity_parameter,
            lvr_beta,
            initial_time,
            current_time: initial_time,
            expiry_time,
            outcome_count,
            prices,
            volumes: vec![I64F64::ZERO; n],
            settled: false,
        })
    }

    /// Move the clock forward; time never runs backwards
    pub fn advance_time(&mut self, now: i64) {
        if now > self.current_time {
            self.current_time = now;
        }
    }

    /// Remaining time, floored so √(T-t) never degenerates
    pub fn time_to_expiry(&self) -> I64F64 {
        let remaining = self.expiry_time.saturating_sub(self.current_time).max(0);
        I64F64::from_num(remaining).max(I64F64::from_raw(MIN_TIME_TO_EXPIRY_RAW))
    }

    /// Time span the market was created with
    pub fn initial_time_to_expiry(&self) -> I64F64 {
        let span = self.expiry_time.saturating_sub(self.initial_time).max(0);
        I64F64::from_num(span).max(I64F64::from_raw(MIN_TIME_TO_EXPIRY_RAW))
    }

    /// Depth the solver prices against: L·√(T-t), tightened by the
    /// loss-versus-rebalancing premium as expiry approaches
    pub fn effective_depth(&self) -> Result<I64F64, ProgramError> {
        let tau = self.time_to_expiry();
        let tau0 = self.initial_time_to_expiry();

        let base = self.liquidity_parameter.checked_mul(tau.sqrt()?)?;

        let elapsed = tau0
            .checked_sub(tau)?
            .checked_div(tau0)?
            .clamp(I64F64::ZERO, I64F64::ONE);
        let widening = I64F64::ONE.checked_add(self.lvr_beta.checked_mul(elapsed)?)?;

        base.checked_div(widening)
    }

    pub fn price(&self, outcome: usize) -> Result<I64F64, ProgramError> {
        self.prices
            .get(outcome)
            .copied()
            .ok_or(QuantumMarketError::InvalidOutcome.into())
    }

    /// Accumulate traded size; volumes only ever grow
    pub fn record_volume(&mut self, outcome: usize, size: I64F64) -> Result<(), ProgramError> {
        let slot = self
            .volumes
            .get_mut(outcome)
            .ok_or::<ProgramError>(QuantumMarketError::InvalidOutcome.into())?;
        *slot = slot.checked_add(size.abs())?;
        Ok(())
    }

    /// Freeze the record; called when the hosting market settles
    pub fn freeze(&mut self) {
        self.settled = true;
    }

    pub fn ensure_tradeable(&self) -> Result<(), ProgramError> {
        if self.settled {
            return Err(QuantumMarketError::MarketSettled.into());
        }
        Ok(())
    }

    /// Sum of the price vector, for invariant checks
    pub fn price_sum(&self) -> Result<I64F64, ProgramError> {
        let mut sum = I64F64::ZERO;
        for price in &self.prices {
            sum = sum.checked_add(*price)?;
        }
        Ok(sum)
    }
}

/// Tolerance for the sum-to-one invariant: one rounding unit per outcome
pub fn sum_tolerance(outcome_count: u8) -> i128 {
    outcome_count as i128
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ONE_RAW;

    fn state(n: u8) -> PricingState {
        PricingState::new(1, n, I64F64::from_num(1000), 0, 10, I64F64::ZERO).unwrap()
    }

    #[test]
    fn test_uniform_creation_sums_to_one() {
        for n in [2u8, 3, 7, 64] {
            let s = state(n);
            assert_eq!(s.price_sum().unwrap().raw, ONE_RAW, "n={}", n);
            assert_eq!(s.prices.len(), n as usize);
            assert_eq!(s.volumes.len(), n as usize);
        }
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(PricingState::new(1, 1, I64F64::from_num(10), 0, 10, I64F64::ZERO).is_err());
        assert!(PricingState::new(1, 65, I64F64::from_num(10), 0, 10, I64F64::ZERO).is_err());
        assert!(PricingState::new(1, 2, I64F64::ZERO, 0, 10, I64F64::ZERO).is_err());
        assert!(PricingState::new(1, 2, I64F64::from_num(-5), 0, 10, I64F64::ZERO).is_err());
        assert!(PricingState::new(1, 2, I64F64::from_num(10), 10, 10, I64F64::ZERO).is_err());
        assert!(
            PricingState::new(1, 2, I64F64::from_num(10), 0, 10, I64F64::from_num(-1)).is_err()
        );
    }

    #[test]
    fn test_time_is_monotonic() {
        let mut s = state(2);
        s.advance_time(4);
        assert_eq!(s.current_time, 4);
        s.advance_time(2);
        assert_eq!(s.current_time, 4);
    }

    #[test]
    fn test_time_to_expiry_floor() {
        let mut s = state(2);
        s.advance_time(50);
        let tau = s.time_to_expiry();
        assert_eq!(tau.raw, MIN_TIME_TO_EXPIRY_RAW);
    }

    #[test]
    fn test_effective_depth_shrinks_near_expiry() {
        let mut s = state(2);
        s.lvr_beta = I64F64::from_num(2);

        let fresh = s.effective_depth().unwrap();
        s.advance_time(9);
        let late = s.effective_depth().unwrap();

        // Depth shrinks both from √τ decay and from the widening premium
        assert!(late < fresh);

        let mut flat = state(2);
        flat.advance_time(9);
        let without_premium = flat.effective_depth().unwrap();
        assert!(late < without_premium);
    }

    #[test]
    fn test_volumes_accumulate_absolute_size() {
        let mut s = state(2);
        s.record_volume(0, I64F64::from_num(100)).unwrap();
        s.record_volume(0, I64F64::from_num(-40)).unwrap();
        assert_eq!(s.volumes[0].to_num(), 140);
        assert!(s.record_volume(5, I64F64::ONE).is_err());
    }

    #[test]
    fn test_frozen_market_rejects_trades() {
        let mut s = state(2);
        assert!(s.ensure_tradeable().is_ok());
        s.freeze();
        assert_eq!(
            s.ensure_tradeable().unwrap_err(),
            QuantumMarketError::MarketSettled.into()
        );
    }

    #[test]
    fn test_borsh_round_trip() {
        let s = state(3);
        let bytes = s.try_to_vec().unwrap();
        let decoded = PricingState::try_from_slice(&bytes).unwrap();
        assert_eq!(decoded, s);
    }
}
