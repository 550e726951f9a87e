//! Winner selection at collapse
//!
//! Scoring runs over a read-only snapshot of per-proposal metrics taken
//! once the market has left Active, so trades can no longer move the
//! inputs while the winner is computed. Every rule is a branch of one
//! match; ties fall through a fixed chain so selection is deterministic.

use solana_program::program_error::ProgramError;

use crate::constants::{
    BPS_DENOMINATOR, COMPOSITE_PROBABILITY_WEIGHT_BPS, COMPOSITE_TRADERS_WEIGHT_BPS,
    COMPOSITE_VOLUME_WEIGHT_BPS,
};
use crate::error::QuantumMarketError;
use crate::math::fixed_point::I64F64;
use crate::quantum::market::{CollapseRule, QuantumMarket};

/// Frozen per-proposal inputs to winner selection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProposalMetrics {
    pub probability: I64F64,
    pub volume: u64,
    pub traders: u64,
}

/// Snapshot every proposal's scoring inputs
pub fn snapshot_metrics(market: &QuantumMarket) -> Result<Vec<ProposalMetrics>, ProgramError> {
    let mut metrics = Vec::with_capacity(market.proposal_count());

    for proposal in &market.proposals {
        metrics.push(ProposalMetrics {
            probability: proposal.target_price()?,
            volume: proposal.volume,
            traders: proposal.unique_traders(),
        });
    }

    Ok(metrics)
}

/// Pick the winning proposal index under the given rule
pub fn select_winner(rule: CollapseRule, metrics: &[ProposalMetrics]) -> Result<u8, ProgramError> {
    if metrics.is_empty() {
        return Err(QuantumMarketError::InvalidProposalCount.into());
    }

    let winner = match rule {
        CollapseRule::MaxProbability => {
            // Ascending scan keeps the lowest index on ties
            let mut best = 0usize;
            for (i, m) in metrics.iter().enumerate().skip(1) {
                if m.probability > metrics[best].probability {
                    best = i;
                }
            }
            best
        }
        CollapseRule::MaxVolume => pick_with_tie_chain(metrics, |m| m.volume),
        CollapseRule::MaxTraders => pick_with_tie_chain(metrics, |m| m.traders),
        CollapseRule::WeightedComposite => {
            let scores = composite_scores(metrics)?;
            let mut best = 0usize;
            for i in 1..metrics.len() {
                if scores[i] > scores[best]
                    || (scores[i] == scores[best]
                        && metrics[i].probability > metrics[best].probability)
                {
                    best = i;
                }
            }
            best
        }
    };

    Ok(winner as u8)
}

/// Highest primary metric; ties break to the highest probability, then the
/// lowest index
fn pick_with_tie_chain(metrics: &[ProposalMetrics], key: impl Fn(&ProposalMetrics) -> u64) -> usize {
    let mut best = 0usize;
    for (i, m) in metrics.iter().enumerate().skip(1) {
        let primary = key(m);
        let best_primary = key(&metrics[best]);

        if primary > best_primary
            || (primary == best_primary && m.probability > metrics[best].probability)
        {
            best = i;
        }
    }
    best
}

/// Composite score per proposal, each term normalized against its maximum
fn composite_scores(metrics: &[ProposalMetrics]) -> Result<Vec<I64F64>, ProgramError> {
    let probability_weight =
        I64F64::from_fraction(COMPOSITE_PROBABILITY_WEIGHT_BPS as i64, BPS_DENOMINATOR as i64)?;
    let volume_weight =
        I64F64::from_fraction(COMPOSITE_VOLUME_WEIGHT_BPS as i64, BPS_DENOMINATOR as i64)?;
    let traders_weight =
        I64F64::from_fraction(COMPOSITE_TRADERS_WEIGHT_BPS as i64, BPS_DENOMINATOR as i64)?;

    let max_probability = metrics
        .iter()
        .map(|m| m.probability)
        .fold(I64F64::ZERO, I64F64::max);
    let max_volume = metrics.iter().map(|m| m.volume).max().unwrap_or(0);
    let max_traders = metrics.iter().map(|m| m.traders).max().unwrap_or(0);

    let mut scores = Vec::with_capacity(metrics.len());
    for m in metrics {
        let probability_term = if max_probability.is_zero() {
            I64F64::ZERO
        } else {
            m.probability.checked_div(max_probability)?
        };
        let volume_term = normalized(m.volume, max_volume)?;
        let traders_term = normalized(m.traders, max_traders)?;

        let score = probability_weight
            .checked_mul(probability_term)?
            .checked_add(volume_weight.checked_mul(volume_term)?)?
            .checked_add(traders_weight.checked_mul(traders_term)?)?;
        scores.push(score);
    }

    Ok(scores)
}

fn normalized(value: u64, max: u64) -> Result<I64F64, ProgramError> {
    if max == 0 {
        return Ok(I64F64::ZERO);
    }
    I64F64::from_num(value.min(i64::MAX as u64) as i64)
        .checked_div(I64F64::from_num(max.min(i64::MAX as u64) as i64))
}
