//! Quantum prediction-market pricing and settlement engine
//!
//! A computational core for multi-outcome prediction markets backed by
//! phantom liquidity. The hosting settlement layer owns accounts, storage
//! and authorization; this crate owns the pricing math (an implicit-equation
//! Newton solver over precomputed normal-distribution tables), multi-outcome
//! price redistribution, the quantum market collapse state machine and the
//! phantom-credit ledger.

pub mod constants;
pub mod engine;
pub mod error;
pub mod events;
pub mod math;
pub mod pricing;
pub mod quantum;

pub use engine::{MarketArena, ProposalSpec};
pub use error::{Condition, QuantumMarketError};
pub use math::fixed_point::I64F64;
pub use pricing::TradeReceipt;
pub use quantum::market::{CollapseRule, MarketPhase};
