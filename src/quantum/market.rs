//! Quantum market state machine
//!
//! Groups up to ten proposals sharing one pool of phantom liquidity and
//! walks them through the collapse lifecycle. Phases only ever move
//! forward: Active, PreCollapse, Collapsing, Collapsed, Settled.

use std::collections::BTreeSet;

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{msg, program_error::ProgramError, pubkey::Pubkey};

use crate::constants::{
    BPS_DENOMINATOR, MAX_PROPOSALS, PRICE_HISTORY_CAPACITY, VOLATILITY_LOCK_THRESHOLD_BPS,
    VOLATILITY_WINDOW_UNITS,
};
use crate::error::QuantumMarketError;
use crate::math::fixed_point::I64F64;
use crate::pricing::PricingState;

/// Lifecycle phase of a quantum market
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketPhase {
    Active,
    PreCollapse,
    Collapsing,
    Collapsed,
    Settled,
}

/// Winner selection rule applied at collapse
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapseRule {
    MaxProbability,
    MaxVolume,
    MaxTraders,
    /// 0.5 probability + 0.3 volume + 0.2 traders, each normalized
    /// against the maximum across proposals
    WeightedComposite,
}

/// One observed price, kept for the volatility lock
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub time: i64,
    pub price: I64F64,
}

/// One proposal competing inside a quantum market
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct Proposal {
    pub pricing: PricingState,
    /// Outcome scored as this proposal's probability at collapse
    pub target_outcome: u8,
    /// Cumulative deposited trade size
    pub volume: u64,
    /// Unique traders seen on this proposal
    pub traders: BTreeSet<Pubkey>,
    /// Rejecting new trades while set
    pub locked: bool,
    /// Recent target-outcome prices inside the volatility window
    pub price_history: Vec<PricePoint>,
}

impl Proposal {
    pub fn new(pricing: PricingState, target_outcome: u8) -> Result<Self, ProgramError> {
        if target_outcome >= pricing.outcome_count {
            return Err(QuantumMarketError::InvalidOutcome.into());
        }

        Ok(Self {
            pricing,
            target_outcome,
            volume: 0,
            traders: BTreeSet::new(),
            locked: false,
            price_history: Vec::new(),
        })
    }

    /// Current price of the scored outcome
    pub fn target_price(&self) -> Result<I64F64, ProgramError> {
        self.pricing.price(self.target_outcome as usize)
    }

    pub fn unique_traders(&self) -> u64 {
        self.traders.len() as u64
    }

    /// Record a committed trade's bookkeeping
    pub fn note_trade(
        &mut self,
        trader: Pubkey,
        amount: u64,
        now: i64,
        price: I64F64,
    ) -> Result<(), ProgramError> {
        self.volume = self
            .volume
            .checked_add(amount)
            .ok_or::<ProgramError>(QuantumMarketError::ArithmeticOverflow.into())?;
        self.traders.insert(trader);

        self.price_history.push(PricePoint { time: now, price });
        let cutoff = now.saturating_sub(VOLATILITY_WINDOW_UNITS);
        self.price_history.retain(|p| p.time >= cutoff);
        if self.price_history.len() > PRICE_HISTORY_CAPACITY {
            let excess = self.price_history.len() - PRICE_HISTORY_CAPACITY;
            self.price_history.drain(..excess);
        }

        Ok(())
    }

    /// Whether recent price movement exceeds the lock threshold
    pub fn volatility_exceeded(&self) -> bool {
        let mut lowest: Option<I64F64> = None;
        let mut highest: Option<I64F64> = None;

        for point in &self.price_history {
            lowest = Some(lowest.map_or(point.price, |l| l.min(point.price)));
            highest = Some(highest.map_or(point.price, |h| h.max(point.price)));
        }

        let (low, high) = match (lowest, highest) {
            (Some(l), Some(h)) => (l, h),
            _ => return false,
        };

        if low.is_zero() || low.is_negative() {
            return false;
        }

        // (high - low) / low > threshold, compared in cross-multiplied form
        let spread = high.saturating_sub(low);
        let scaled_spread = spread.checked_mul(I64F64::from_num(BPS_DENOMINATOR as i64));
        let scaled_floor = low.checked_mul(I64F64::from_num(VOLATILITY_LOCK_THRESHOLD_BPS as i64));

        match (scaled_spread, scaled_floor) {
            (Ok(s), Ok(f)) => s > f,
            _ => true,
        }
    }
}

/// Refund owed to one depositor, populated at collapse
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct RefundEntry {
    pub depositor: Pubkey,
    pub amount: u64,
    pub paid: bool,
}

/// One phantom-liquidity market group
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct QuantumMarket {
    pub market_id: u64,
    pub phase: MarketPhase,
    pub collapse_rule: CollapseRule,
    pub proposals: Vec<Proposal>,
    /// Time at which collapse may fire without an external signal
    pub settlement_time: i64,
    /// Written exactly once, at the Collapsing to Collapsed transition
    pub winner_index: Option<u8>,
    /// Append-only; drained by refund claims
    pub refund_queue: Vec<RefundEntry>,
}

impl QuantumMarket {
    pub fn new(
        market_id: u64,
        collapse_rule: CollapseRule,
        proposals: Vec<Proposal>,
        settlement_time: i64,
    ) -> Result<Self, ProgramError> {
        if proposals.is_empty() || proposals.len() > MAX_PROPOSALS {
            return Err(QuantumMarketError::InvalidProposalCount.into());
        }

        Ok(Self {
            market_id,
            phase: MarketPhase::Active,
            collapse_rule,
            proposals,
            settlement_time,
            winner_index: None,
            refund_queue: Vec::new(),
        })
    }

    pub fn proposal(&self, index: u8) -> Result<&Proposal, ProgramError> {
        self.proposals
            .get(index as usize)
            .ok_or(QuantumMarketError::ProposalNotFound.into())
    }

    pub fn proposal_mut(&mut self, index: u8) -> Result<&mut Proposal, ProgramError> {
        self.proposals
            .get_mut(index as usize)
            .ok_or(QuantumMarketError::ProposalNotFound.into())
    }

    pub fn proposal_count(&self) -> usize {
        self.proposals.len()
    }

    pub fn ensure_active(&self) -> Result<(), ProgramError> {
        if self.phase != MarketPhase::Active {
            return Err(QuantumMarketError::MarketNotActive.into());
        }
        Ok(())
    }

    /// Active to Collapsing, gated by time or an authorized signal
    ///
    /// PreCollapse exists so observers can distinguish "no more trades"
    /// from "winner computation in flight"; the engine passes through it
    /// without yielding.
    pub fn begin_collapse(&mut self, now: i64, authorized: bool) -> Result<(), ProgramError> {
        match self.phase {
            MarketPhase::Active => {}
            MarketPhase::Collapsed | MarketPhase::Settled => {
                return Err(QuantumMarketError::AlreadyCollapsed.into());
            }
            _ => return Err(QuantumMarketError::MarketNotActive.into()),
        }

        if now < self.settlement_time && !authorized {
            return Err(QuantumMarketError::CollapseTooEarly.into());
        }

        self.phase = MarketPhase::PreCollapse;
        msg!("Market {} entering collapse", self.market_id);
        self.phase = MarketPhase::Collapsing;

        Ok(())
    }

    /// One-time winner write; Collapsing to Collapsed
    pub fn set_winner(&mut self, index: u8) -> Result<(), ProgramError> {
        if self.winner_index.is_some() {
            return Err(QuantumMarketError::AlreadyCollapsed.into());
        }
        if self.phase != MarketPhase::Collapsing {
            return Err(QuantumMarketError::MarketNotActive.into());
        }
        if (index as usize) >= self.proposals.len() {
            return Err(QuantumMarketError::ProposalNotFound.into());
        }

        self.winner_index = Some(index);
        self.phase = MarketPhase::Collapsed;

        // Nothing trades after collapse
        for proposal in &mut self.proposals {
            proposal.pricing.freeze();
        }

        msg!("Market {} collapsed to proposal {}", self.market_id, index);
        Ok(())
    }

    pub fn push_refund(&mut self, depositor: Pubkey, amount: u64) {
        self.refund_queue.push(RefundEntry {
            depositor,
            amount,
            paid: false,
        });
    }

    /// Mark the depositor's queued refund paid; Collapsed to Settled once
    /// the queue is drained
    pub fn mark_refund_paid(&mut self, depositor: &Pubkey) -> Result<(), ProgramError> {
        let entry = self
            .refund_queue
            .iter_mut()
            .find(|e| e.depositor == *depositor && !e.paid)
            .ok_or::<ProgramError>(QuantumMarketError::NothingToClaim.into())?;
        entry.paid = true;
        Ok(())
    }

    /// True when settlement completed on this call
    pub fn try_settle(&mut self) -> bool {
        if self.phase != MarketPhase::Collapsed {
            return false;
        }
        if self.refund_queue.iter().all(|e| e.paid) {
            self.phase = MarketPhase::Settled;
            msg!("Market {} settled", self.market_id);
            return true;
        }
        false
    }
}
