//! Event logging for the quantum market engine
//!
//! Lifecycle events are borsh-serialized and logged with a bs58 payload so
//! the hosting layer can index them without re-deriving state.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{msg, pubkey::Pubkey};

/// Event type discriminator
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq)]
pub enum EventType {
    MarketCreated = 1,
    TradeExecuted = 2,
    CreditsIssued = 3,
    QuantumTradeExecuted = 4,
    ProposalLocked = 5,
    MarketCollapsed = 6,
    RefundProcessed = 7,
    MarketSettled = 8,
}

/// Emit an event to the log stream
pub fn emit_event<T: BorshSerialize>(event_type: EventType, event_data: &T) {
    msg!("QUANTUM_ENGINE_EVENT");
    msg!("TYPE:{:?}", event_type);

    if let Ok(data) = event_data.try_to_vec() {
        msg!("DATA:{}", bs58::encode(&data).into_string());
    }
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone)]
pub struct MarketCreated {
    pub market_id: u64,
    pub outcome_count: u8,
    pub expiry_time: i64,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone)]
pub struct TradeExecuted {
    pub market_id: u64,
    pub outcome: u8,
    pub price_raw: i128,
    pub iterations: u8,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone)]
pub struct CreditsIssued {
    pub market_id: u64,
    pub depositor: Pubkey,
    pub deposit: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone)]
pub struct QuantumTradeExecuted {
    pub market_id: u64,
    pub depositor: Pubkey,
    pub proposal_index: u8,
    pub amount: u64,
    pub leverage: u8,
    pub price_raw: i128,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone)]
pub struct ProposalLocked {
    pub market_id: u64,
    pub proposal_index: u8,
    pub timestamp: i64,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone)]
pub struct MarketCollapsed {
    pub market_id: u64,
    pub winner_index: u8,
    pub timestamp: i64,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone)]
pub struct RefundProcessed {
    pub market_id: u64,
    pub depositor: Pubkey,
    pub refund_amount: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone)]
pub struct MarketSettled {
    pub market_id: u64,
    pub refund_count: u32,
}
