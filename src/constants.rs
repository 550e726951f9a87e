//! Global constants for the quantum market engine
//!
//! Central location for all engine-wide constants

/// Fractional bits of the 64.64 fixed-point representation
pub const FRACTION_BITS: u32 = 64;

/// Raw value of 1.0 in 64.64 format
pub const ONE_RAW: i128 = 1i128 << FRACTION_BITS;

/// Minimum outcome count per market
pub const MIN_OUTCOMES: u8 = 2;

/// Maximum outcome count per market
pub const MAX_OUTCOMES: u8 = 64;

/// Maximum proposals sharing one pool of phantom liquidity
pub const MAX_PROPOSALS: usize = 10;

/// Maximum leverage accepted on a quantum trade
pub const MAX_QUANTUM_LEVERAGE: u8 = 10;

/// Hard ceiling on solver iterations per trade
pub const MAX_SOLVER_ITERATIONS: u8 = 5;

/// Solver residual bound, 1e-8 in 64.64 format
pub const SOLVER_TOLERANCE_RAW: i128 = ONE_RAW / 100_000_000;

/// Derivative floor below which a Newton step is abandoned
pub const DERIVATIVE_FLOOR_RAW: i128 = ONE_RAW / 1_000_000;

/// Lower price bound, 0.001 in 64.64 format
pub const MIN_PRICE_RAW: i128 = ONE_RAW / 1000;

/// Upper price bound, 0.999 in 64.64 format
pub const MAX_PRICE_RAW: i128 = 999 * (ONE_RAW / 1000);

/// Floor on remaining time to expiry, 0.001 time units
pub const MIN_TIME_TO_EXPIRY_RAW: i128 = ONE_RAW / 1000;

/// Probability mass below which proportional redistribution degenerates
/// to an equal split
pub const DEGENERATE_MASS_RAW: i128 = ONE_RAW / 1000;

/// Basis point denominator
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Sliding window, in time units, watched by the volatility lock
pub const VOLATILITY_WINDOW_UNITS: i64 = 8;

/// Price spread within the window that locks a proposal
pub const VOLATILITY_LOCK_THRESHOLD_BPS: u64 = 500;

/// Upper bound on retained price-history points per proposal
pub const PRICE_HISTORY_CAPACITY: usize = 32;

/// Composite collapse scoring weights
pub const COMPOSITE_PROBABILITY_WEIGHT_BPS: u64 = 5000;
pub const COMPOSITE_VOLUME_WEIGHT_BPS: u64 = 3000;
pub const COMPOSITE_TRADERS_WEIGHT_BPS: u64 = 2000;
