//! Phantom-credit ledger
//!
//! One deposit backs trades across every proposal in a quantum market.
//! The ledger is the only writer of credit records: issuance splits the
//! deposit, reservation commits slices of it to trades, and collapse
//! converts the unused remainder into a refund.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{program_error::ProgramError, pubkey::Pubkey};

use crate::constants::BPS_DENOMINATOR;
use crate::error::QuantumMarketError;

/// One committed slice of a proposal's credit allotment
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq)]
pub struct CreditUsage {
    pub proposal_index: u8,
    pub amount: u64,
    pub leverage: u8,
}

/// Per-depositor credit record for one quantum market
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct QuantumCredits {
    pub depositor: Pubkey,
    pub market_id: u64,
    /// The single deposit backing every proposal
    pub initial_deposit: u64,
    /// Allotment per proposal; sums to the deposit exactly
    pub credits_per_proposal: Vec<u64>,
    /// Trade commitments, append-only
    pub used_credits: Vec<CreditUsage>,
    pub refund_amount: u64,
    pub refund_computed: bool,
    pub refund_claimed: bool,
}

impl QuantumCredits {
    /// Split a deposit equally across proposals
    ///
    /// The integer remainder goes one unit at a time to the lowest-indexed
    /// proposals so the allotment sums to the deposit exactly.
    pub fn new(
        depositor: Pubkey,
        market_id: u64,
        deposit: u64,
        proposal_count: usize,
    ) -> Result<Self, ProgramError> {
        if deposit == 0 {
            return Err(QuantumMarketError::InvalidDeposit.into());
        }
        if proposal_count == 0 {
            return Err(QuantumMarketError::InvalidProposalCount.into());
        }

        let base = deposit / proposal_count as u64;
        let remainder = (deposit % proposal_count as u64) as usize;

        let credits_per_proposal = (0..proposal_count)
            .map(|i| if i < remainder { base + 1 } else { base })
            .collect();

        Ok(Self {
            depositor,
            market_id,
            initial_deposit: deposit,
            credits_per_proposal,
            used_credits: Vec::new(),
            refund_amount: 0,
            refund_computed: false,
            refund_claimed: false,
        })
    }

    /// Split a deposit by basis-point weights summing to 10000
    pub fn new_weighted(
        depositor: Pubkey,
        market_id: u64,
        deposit: u64,
        weights_bps: &[u16],
    ) -> Result<Self, ProgramError> {
        if deposit == 0 {
            return Err(QuantumMarketError::InvalidDeposit.into());
        }
        if weights_bps.is_empty() || weights_bps.len() > crate::constants::MAX_PROPOSALS {
            return Err(QuantumMarketError::InvalidProposalCount.into());
        }

        let weight_sum: u64 = weights_bps.iter().map(|w| *w as u64).sum();
        if weight_sum != BPS_DENOMINATOR {
            return Err(QuantumMarketError::InvalidWeights.into());
        }

        let mut credits_per_proposal: Vec<u64> = weights_bps
            .iter()
            .map(|w| ((deposit as u128 * *w as u128) / BPS_DENOMINATOR as u128) as u64)
            .collect();

        // Truncation shortfall lands one unit at a time from the front
        let assigned: u64 = credits_per_proposal.iter().sum();
        let mut shortfall = deposit - assigned;
        let mut i = 0;
        while shortfall > 0 {
            credits_per_proposal[i % weights_bps.len()] += 1;
            shortfall -= 1;
            i += 1;
        }

        Ok(Self {
            depositor,
            market_id,
            initial_deposit: deposit,
            credits_per_proposal,
            used_credits: Vec::new(),
            refund_amount: 0,
            refund_computed: false,
            refund_claimed: false,
        })
    }

    /// Credits already committed to one proposal
    pub fn used_for(&self, proposal_index: u8) -> u64 {
        self.used_credits
            .iter()
            .filter(|u| u.proposal_index == proposal_index)
            .map(|u| u.amount)
            .sum()
    }

    /// Uncommitted allotment remaining on one proposal
    pub fn remaining_for(&self, proposal_index: u8) -> Result<u64, ProgramError> {
        let allotted = self
            .credits_per_proposal
            .get(proposal_index as usize)
            .copied()
            .ok_or::<ProgramError>(QuantumMarketError::ProposalNotFound.into())?;
        Ok(allotted - self.used_for(proposal_index))
    }

    /// Commit part of a proposal's allotment to a trade
    pub fn reserve(
        &mut self,
        proposal_index: u8,
        amount: u64,
        leverage: u8,
    ) -> Result<(), ProgramError> {
        if amount == 0 {
            return Err(QuantumMarketError::InvalidInput.into());
        }

        let remaining = self.remaining_for(proposal_index)?;
        if amount > remaining {
            return Err(QuantumMarketError::InsufficientCredits.into());
        }

        self.used_credits.push(CreditUsage {
            proposal_index,
            amount,
            leverage,
        });
        Ok(())
    }

    /// Unused credits across every proposal
    pub fn total_unused(&self) -> Result<u64, ProgramError> {
        let mut total = 0u64;
        for i in 0..self.credits_per_proposal.len() {
            total = total
                .checked_add(self.remaining_for(i as u8)?)
                .ok_or::<ProgramError>(QuantumMarketError::ArithmeticOverflow.into())?;
        }
        Ok(total)
    }

    /// Fix the refund at collapse: the unused remainder everywhere is
    /// protected; credits used on any proposal stay committed, which on a
    /// losing proposal means forfeit to the pool
    pub fn compute_refund(&mut self) -> Result<u64, ProgramError> {
        if !self.refund_computed {
            self.refund_amount = self.total_unused()?;
            self.refund_computed = true;
        }
        Ok(self.refund_amount)
    }

    /// Pay out at most once
    pub fn claim(&mut self) -> Result<u64, ProgramError> {
        if !self.refund_computed || self.refund_claimed || self.refund_amount == 0 {
            return Err(QuantumMarketError::NothingToClaim.into());
        }
        self.refund_claimed = true;
        Ok(self.refund_amount)
    }
}

/// Credit records for all depositors, keyed by market and depositor
#[derive(Debug, Clone, Default)]
pub struct CreditLedger {
    records: BTreeMap<(u64, Pubkey), QuantumCredits>,
}

impl CreditLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a record from a one-time deposit, equal split
    pub fn issue(
        &mut self,
        market_id: u64,
        depositor: Pubkey,
        deposit: u64,
        proposal_count: usize,
    ) -> Result<&QuantumCredits, ProgramError> {
        self.insert(QuantumCredits::new(
            depositor,
            market_id,
            deposit,
            proposal_count,
        )?)
    }

    /// Create a record from a one-time deposit, weighted split
    pub fn issue_weighted(
        &mut self,
        market_id: u64,
        depositor: Pubkey,
        deposit: u64,
        weights_bps: &[u16],
    ) -> Result<&QuantumCredits, ProgramError> {
        self.insert(QuantumCredits::new_weighted(
            depositor,
            market_id,
            deposit,
            weights_bps,
        )?)
    }

    fn insert(&mut self, record: QuantumCredits) -> Result<&QuantumCredits, ProgramError> {
        let key = (record.market_id, record.depositor);
        if self.records.contains_key(&key) {
            return Err(QuantumMarketError::AlreadyDeposited.into());
        }
        Ok(self.records.entry(key).or_insert(record))
    }

    pub fn record(
        &self,
        market_id: u64,
        depositor: &Pubkey,
    ) -> Result<&QuantumCredits, ProgramError> {
        self.records
            .get(&(market_id, *depositor))
            .ok_or(QuantumMarketError::DepositorNotFound.into())
    }

    pub fn record_mut(
        &mut self,
        market_id: u64,
        depositor: &Pubkey,
    ) -> Result<&mut QuantumCredits, ProgramError> {
        self.records
            .get_mut(&(market_id, *depositor))
            .ok_or(QuantumMarketError::DepositorNotFound.into())
    }

    /// Fix refunds for every depositor in a market; returns the queue
    /// entries in depositor order
    pub fn compute_refunds_for_market(
        &mut self,
        market_id: u64,
    ) -> Result<Vec<(Pubkey, u64)>, ProgramError> {
        let mut refunds = Vec::new();

        for ((id, depositor), record) in self.records.iter_mut() {
            if *id != market_id {
                continue;
            }
            let amount = record.compute_refund()?;
            refunds.push((*depositor, amount));
        }

        Ok(refunds)
    }
}
