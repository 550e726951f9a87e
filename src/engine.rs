//! Market arena and operation surface
//!
//! The hosting settlement layer drives the engine through the operations
//! here. State lives in arenas keyed by stable market ids; every record is
//! mutated only through these entry points, and the `&mut self` receivers
//! give the at-most-one-writer discipline the engine assumes. Time and
//! authorization decisions are consumed as plain arguments, never read
//! from an ambient source.

use std::collections::BTreeMap;

use solana_program::{program_error::ProgramError, pubkey::Pubkey};

use crate::error::QuantumMarketError;
use crate::events::{
    emit_event, CreditsIssued, EventType, MarketCollapsed, MarketCreated, MarketSettled,
    RefundProcessed, TradeExecuted,
};
use crate::math::fixed_point::I64F64;
use crate::math::tables::normal_tables;
use crate::pricing::{execute_trade, PricingState, TradeReceipt};
use crate::quantum::collapse::{select_winner, snapshot_metrics};
use crate::quantum::credits::CreditLedger;
use crate::quantum::market::{CollapseRule, Proposal, QuantumMarket};
use crate::quantum::trading::place_quantum_trade;

/// Parameters for one proposal of a new quantum market
#[derive(Debug, Clone, Copy)]
pub struct ProposalSpec {
    pub outcome_count: u8,
    pub liquidity_parameter: I64F64,
    pub expiry_time: i64,
    pub lvr_beta: I64F64,
    /// Outcome scored as the proposal's probability at collapse
    pub target_outcome: u8,
}

/// All engine state, owned by the hosting layer
#[derive(Debug, Default)]
pub struct MarketArena {
    markets: BTreeMap<u64, PricingState>,
    quantum_markets: BTreeMap<u64, QuantumMarket>,
    ledger: CreditLedger,
    next_market_id: u64,
}

impl MarketArena {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_market_id += 1;
        self.next_market_id
    }

    /// Create a plain multi-outcome market
    pub fn create_market(
        &mut self,
        outcome_count: u8,
        liquidity_parameter: I64F64,
        expiry_time: i64,
        now: i64,
        lvr_beta: I64F64,
    ) -> Result<u64, ProgramError> {
        let market_id = self.allocate_id();
        let state = PricingState::new(
            market_id,
            outcome_count,
            liquidity_parameter,
            now,
            expiry_time,
            lvr_beta,
        )?;
        self.markets.insert(market_id, state);

        emit_event(
            EventType::MarketCreated,
            &MarketCreated {
                market_id,
                outcome_count,
                expiry_time,
            },
        );
        Ok(market_id)
    }

    pub fn market(&self, market_id: u64) -> Result<&PricingState, ProgramError> {
        self.markets
            .get(&market_id)
            .ok_or(QuantumMarketError::MarketNotFound.into())
    }

    /// Trade on a plain market; order size is bounded by the caller
    pub fn trade(
        &mut self,
        market_id: u64,
        outcome_index: u8,
        order_size: I64F64,
        now: i64,
    ) -> Result<TradeReceipt, ProgramError> {
        let state = self
            .markets
            .get_mut(&market_id)
            .ok_or::<ProgramError>(QuantumMarketError::MarketNotFound.into())?;

        let receipt = execute_trade(
            normal_tables(),
            state,
            outcome_index as usize,
            order_size,
            now,
        )?;

        emit_event(
            EventType::TradeExecuted,
            &TradeExecuted {
                market_id,
                outcome: outcome_index,
                price_raw: receipt.realized_price.raw,
                iterations: receipt.iterations,
            },
        );
        Ok(receipt)
    }

    /// Create a quantum market from per-proposal parameters
    pub fn create_quantum_market(
        &mut self,
        collapse_rule: CollapseRule,
        proposal_specs: &[ProposalSpec],
        settlement_time: i64,
        now: i64,
    ) -> Result<u64, ProgramError> {
        let market_id = self.allocate_id();

        let mut proposals = Vec::with_capacity(proposal_specs.len());
        for spec in proposal_specs {
            let pricing = PricingState::new(
                market_id,
                spec.outcome_count,
                spec.liquidity_parameter,
                now,
                spec.expiry_time,
                spec.lvr_beta,
            )?;
            proposals.push(Proposal::new(pricing, spec.target_outcome)?);
        }

        let market = QuantumMarket::new(market_id, collapse_rule, proposals, settlement_time)?;
        self.quantum_markets.insert(market_id, market);

        emit_event(
            EventType::MarketCreated,
            &MarketCreated {
                market_id,
                outcome_count: proposal_specs.len() as u8,
                expiry_time: settlement_time,
            },
        );
        Ok(market_id)
    }

    pub fn quantum_market(&self, market_id: u64) -> Result<&QuantumMarket, ProgramError> {
        self.quantum_markets
            .get(&market_id)
            .ok_or(QuantumMarketError::MarketNotFound.into())
    }

    fn quantum_market_mut(&mut self, market_id: u64) -> Result<&mut QuantumMarket, ProgramError> {
        self.quantum_markets
            .get_mut(&market_id)
            .ok_or(QuantumMarketError::MarketNotFound.into())
    }

    /// Convert a one-time deposit into phantom credits, split equally
    pub fn issue_credits(
        &mut self,
        market_id: u64,
        depositor: Pubkey,
        deposit: u64,
    ) -> Result<Vec<u64>, ProgramError> {
        let market = self.quantum_market(market_id)?;
        market.ensure_active()?;
        let proposal_count = market.proposal_count();

        let record = self
            .ledger
            .issue(market_id, depositor, deposit, proposal_count)?;
        let allotment = record.credits_per_proposal.clone();

        emit_event(
            EventType::CreditsIssued,
            &CreditsIssued {
                market_id,
                depositor,
                deposit,
            },
        );
        Ok(allotment)
    }

    /// Weighted variant of credit issuance
    pub fn issue_credits_weighted(
        &mut self,
        market_id: u64,
        depositor: Pubkey,
        deposit: u64,
        weights_bps: &[u16],
    ) -> Result<Vec<u64>, ProgramError> {
        let market = self.quantum_market(market_id)?;
        market.ensure_active()?;
        if weights_bps.len() != market.proposal_count() {
            return Err(QuantumMarketError::InvalidWeights.into());
        }

        let record = self
            .ledger
            .issue_weighted(market_id, depositor, deposit, weights_bps)?;
        let allotment = record.credits_per_proposal.clone();

        emit_event(
            EventType::CreditsIssued,
            &CreditsIssued {
                market_id,
                depositor,
                deposit,
            },
        );
        Ok(allotment)
    }

    pub fn credits(
        &self,
        market_id: u64,
        depositor: &Pubkey,
    ) -> Result<&crate::quantum::credits::QuantumCredits, ProgramError> {
        self.ledger.record(market_id, depositor)
    }

    /// Credit-backed trade on one proposal
    #[allow(clippy::too_many_arguments)]
    pub fn place_quantum_trade(
        &mut self,
        market_id: u64,
        depositor: Pubkey,
        proposal_index: u8,
        outcome_index: u8,
        amount: u64,
        leverage: u8,
        direction: bool,
        now: i64,
    ) -> Result<TradeReceipt, ProgramError> {
        let market = self
            .quantum_markets
            .get_mut(&market_id)
            .ok_or::<ProgramError>(QuantumMarketError::MarketNotFound.into())?;

        place_quantum_trade(
            normal_tables(),
            market,
            &mut self.ledger,
            depositor,
            proposal_index,
            outcome_index,
            amount,
            leverage,
            direction,
            now,
        )
    }

    /// Administrative lock of one proposal; authorization is the caller's
    pub fn lock_proposal(&mut self, market_id: u64, proposal_index: u8) -> Result<(), ProgramError> {
        let market = self.quantum_market_mut(market_id)?;
        market.ensure_active()?;
        market.proposal_mut(proposal_index)?.locked = true;
        Ok(())
    }

    /// Administrative unlock of one proposal
    pub fn unlock_proposal(
        &mut self,
        market_id: u64,
        proposal_index: u8,
    ) -> Result<(), ProgramError> {
        let market = self.quantum_market_mut(market_id)?;
        market.ensure_active()?;
        market.proposal_mut(proposal_index)?.locked = false;
        Ok(())
    }

    /// Run the collapse: pick the winner and fix every depositor's refund
    ///
    /// `authorized` reflects an authorization decision already made by the
    /// caller; it permits collapse before the settlement time.
    pub fn trigger_collapse(
        &mut self,
        market_id: u64,
        now: i64,
        authorized: bool,
    ) -> Result<u8, ProgramError> {
        let market = self
            .quantum_markets
            .get_mut(&market_id)
            .ok_or::<ProgramError>(QuantumMarketError::MarketNotFound.into())?;

        market.begin_collapse(now, authorized)?;

        let metrics = snapshot_metrics(market)?;
        let winner = select_winner(market.collapse_rule, &metrics)?;
        market.set_winner(winner)?;

        let refunds = self.ledger.compute_refunds_for_market(market_id)?;
        let market = self.quantum_market_mut(market_id)?;
        for (depositor, amount) in refunds {
            if amount > 0 {
                market.push_refund(depositor, amount);
            }
        }

        emit_event(
            EventType::MarketCollapsed,
            &MarketCollapsed {
                market_id,
                winner_index: winner,
                timestamp: now,
            },
        );

        // A market with nothing to refund settles immediately
        if market.try_settle() {
            let refund_count = market.refund_queue.len() as u32;
            emit_event(
                EventType::MarketSettled,
                &MarketSettled {
                    market_id,
                    refund_count,
                },
            );
        }

        Ok(winner)
    }

    /// Pay out one depositor's refund, at most once
    pub fn claim_refund(
        &mut self,
        market_id: u64,
        depositor: &Pubkey,
    ) -> Result<u64, ProgramError> {
        // Claims only exist once the winner is fixed
        self.quantum_market(market_id)?;

        let amount = self.ledger.record_mut(market_id, depositor)?.claim()?;

        let market = self.quantum_market_mut(market_id)?;
        market.mark_refund_paid(depositor)?;

        emit_event(
            EventType::RefundProcessed,
            &RefundProcessed {
                market_id,
                depositor: *depositor,
                refund_amount: amount,
            },
        );

        if market.try_settle() {
            let refund_count = market.refund_queue.len() as u32;
            emit_event(
                EventType::MarketSettled,
                &MarketSettled {
                    market_id,
                    refund_count,
                },
            );
        }

        Ok(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantum::market::MarketPhase;

    fn spec(liquidity: i64) -> ProposalSpec {
        ProposalSpec {
            outcome_count: 2,
            liquidity_parameter: I64F64::from_num(liquidity),
            expiry_time: 100,
            lvr_beta: I64F64::ZERO,
            target_outcome: 0,
        }
    }

    fn quantum_arena() -> (MarketArena, u64) {
        let mut arena = MarketArena::new();
        let id = arena
            .create_quantum_market(
                CollapseRule::MaxProbability,
                &[spec(10_000), spec(10_000), spec(10_000)],
                100,
                0,
            )
            .unwrap();
        (arena, id)
    }

    #[test]
    fn test_plain_market_lifecycle() {
        let mut arena = MarketArena::new();
        let id = arena
            .create_market(2, I64F64::from_num(1000), 10, 0, I64F64::ZERO)
            .unwrap();

        let receipt = arena.trade(id, 0, I64F64::from_num(100), 1).unwrap();
        assert!(receipt.realized_price > I64F64::from_fraction(1, 2).unwrap());

        assert!(arena.market(id).is_ok());
        assert!(arena.market(id + 1).is_err());
    }

    #[test]
    fn test_ids_are_stable_and_distinct() {
        let mut arena = MarketArena::new();
        let a = arena
            .create_market(2, I64F64::from_num(1000), 10, 0, I64F64::ZERO)
            .unwrap();
        let b = arena
            .create_quantum_market(CollapseRule::MaxVolume, &[spec(1000)], 10, 0)
            .unwrap();
        assert_ne!(a, b);
        assert!(arena.market(a).is_ok());
        assert!(arena.quantum_market(b).is_ok());
    }

    #[test]
    fn test_issue_credits_once() {
        let (mut arena, id) = quantum_arena();
        let alice = Pubkey::new_unique();

        let allotment = arena.issue_credits(id, alice, 900).unwrap();
        assert_eq!(allotment, vec![300, 300, 300]);

        assert_eq!(
            arena.issue_credits(id, alice, 100).unwrap_err(),
            QuantumMarketError::AlreadyDeposited.into()
        );
    }

    #[test]
    fn test_weighted_issue_validates_length() {
        let (mut arena, id) = quantum_arena();
        let alice = Pubkey::new_unique();

        assert_eq!(
            arena
                .issue_credits_weighted(id, alice, 900, &[5000, 5000])
                .unwrap_err(),
            QuantumMarketError::InvalidWeights.into()
        );

        let allotment = arena
            .issue_credits_weighted(id, alice, 900, &[5000, 3000, 2000])
            .unwrap();
        assert_eq!(allotment, vec![450, 270, 180]);
    }

    #[test]
    fn test_collapse_and_refund_flow() {
        let (mut arena, id) = quantum_arena();
        let alice = Pubkey::new_unique();
        arena.issue_credits(id, alice, 900).unwrap();

        // Sell proposal 0 down, buy proposal 1 up; proposal 1 ends with
        // the highest target price
        arena
            .place_quantum_trade(id, alice, 0, 0, 300, 1, false, 1)
            .unwrap();
        arena
            .place_quantum_trade(id, alice, 1, 0, 100, 1, true, 2)
            .unwrap();

        let winner = arena.trigger_collapse(id, 100, false).unwrap();
        assert_eq!(winner, 1);
        assert_eq!(arena.quantum_market(id).unwrap().phase, MarketPhase::Collapsed);

        // Unused on the winner plus the untouched proposal; the 300 spent
        // on losing proposal 0 is forfeit
        let refund = arena.claim_refund(id, &alice).unwrap();
        assert_eq!(refund, (300 - 100) + 300);

        assert_eq!(
            arena.claim_refund(id, &alice).unwrap_err(),
            QuantumMarketError::NothingToClaim.into()
        );
        assert_eq!(arena.quantum_market(id).unwrap().phase, MarketPhase::Settled);
    }

    #[test]
    fn test_collapse_gating_and_single_fire() {
        let (mut arena, id) = quantum_arena();

        assert_eq!(
            arena.trigger_collapse(id, 10, false).unwrap_err(),
            QuantumMarketError::CollapseTooEarly.into()
        );

        arena.trigger_collapse(id, 10, true).unwrap();
        assert_eq!(
            arena.trigger_collapse(id, 100, true).unwrap_err(),
            QuantumMarketError::AlreadyCollapsed.into()
        );
    }

    #[test]
    fn test_trades_rejected_after_collapse() {
        let (mut arena, id) = quantum_arena();
        let alice = Pubkey::new_unique();
        arena.issue_credits(id, alice, 900).unwrap();

        arena.trigger_collapse(id, 100, false).unwrap();

        assert_eq!(
            arena
                .place_quantum_trade(id, alice, 0, 0, 100, 1, true, 101)
                .unwrap_err(),
            QuantumMarketError::MarketNotActive.into()
        );
        assert_eq!(
            arena.issue_credits(id, Pubkey::new_unique(), 100).unwrap_err(),
            QuantumMarketError::MarketNotActive.into()
        );
    }

    #[test]
    fn test_admin_lock_and_unlock() {
        let (mut arena, id) = quantum_arena();
        let alice = Pubkey::new_unique();
        arena.issue_credits(id, alice, 900).unwrap();

        arena.lock_proposal(id, 2).unwrap();
        assert_eq!(
            arena
                .place_quantum_trade(id, alice, 2, 0, 50, 1, true, 1)
                .unwrap_err(),
            QuantumMarketError::ProposalLocked.into()
        );

        arena.unlock_proposal(id, 2).unwrap();
        arena
            .place_quantum_trade(id, alice, 2, 0, 50, 1, true, 1)
            .unwrap();
    }

    #[test]
    fn test_settlement_without_depositors() {
        let (mut arena, id) = quantum_arena();
        arena.trigger_collapse(id, 100, false).unwrap();
        assert_eq!(arena.quantum_market(id).unwrap().phase, MarketPhase::Settled);
    }

    #[test]
    fn test_claim_before_collapse_rejected() {
        let (mut arena, id) = quantum_arena();
        let alice = Pubkey::new_unique();
        arena.issue_credits(id, alice, 900).unwrap();

        assert_eq!(
            arena.claim_refund(id, &alice).unwrap_err(),
            QuantumMarketError::NothingToClaim.into()
        );
    }
}
