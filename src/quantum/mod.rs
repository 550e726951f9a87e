//! Quantum markets: phantom liquidity, collapse and settlement
//!
//! A quantum market runs several proposals against one another on credit
//! carved from a single deposit; collapse picks the surviving proposal and
//! converts unused credit into refunds.

pub mod collapse;
pub mod credits;
pub mod market;
pub mod trading;

pub use collapse::{select_winner, snapshot_metrics, ProposalMetrics};
pub use credits::{CreditLedger, CreditUsage, QuantumCredits};
pub use market::{CollapseRule, MarketPhase, Proposal, QuantumMarket, RefundEntry};
pub use trading::place_quantum_trade;
