//! Quantum trading façade
//!
//! Validates phase, lock and credit availability, prices the order through
//! the solver and redistribution, then commits the credit usage and
//! proposal bookkeeping together with the price update.

use solana_program::{program_error::ProgramError, pubkey::Pubkey};

use crate::constants::MAX_QUANTUM_LEVERAGE;
use crate::error::QuantumMarketError;
use crate::events::{emit_event, EventType, ProposalLocked, QuantumTradeExecuted};
use crate::math::fixed_point::I64F64;
use crate::math::tables::NormalTables;
use crate::pricing::{execute_trade, TradeReceipt};
use crate::quantum::credits::CreditLedger;
use crate::quantum::market::QuantumMarket;

/// Place a credit-backed trade on one proposal of a quantum market
#[allow(clippy::too_many_arguments)]
pub fn place_quantum_trade(
    tables: &NormalTables,
    market: &mut QuantumMarket,
    ledger: &mut CreditLedger,
    depositor: Pubkey,
    proposal_index: u8,
    outcome_index: u8,
    amount: u64,
    leverage: u8,
    direction: bool,
    now: i64,
) -> Result<TradeReceipt, ProgramError> {
    market.ensure_active()?;

    let market_id = market.market_id;
    let proposal = market.proposal(proposal_index)?;
    if proposal.locked {
        return Err(QuantumMarketError::ProposalLocked.into());
    }

    if amount == 0 {
        return Err(QuantumMarketError::InvalidInput.into());
    }
    if leverage == 0 || leverage > MAX_QUANTUM_LEVERAGE {
        return Err(QuantumMarketError::LeverageTooHigh.into());
    }

    // Credit availability before any mutation; the reserve after pricing
    // cannot fail once this holds
    let remaining = ledger
        .record(market_id, &depositor)?
        .remaining_for(proposal_index)?;
    if amount > remaining {
        return Err(QuantumMarketError::InsufficientCredits.into());
    }

    // Effective order size: amount scaled by leverage, signed by direction
    let notional = (amount as u128)
        .checked_mul(leverage as u128)
        .filter(|n| *n <= i64::MAX as u128)
        .ok_or::<ProgramError>(QuantumMarketError::ArithmeticOverflow.into())?;
    let mut order_size = I64F64::from_num(notional as i64);
    if !direction {
        order_size = order_size.checked_neg()?;
    }

    let proposal = market.proposal_mut(proposal_index)?;
    let receipt = execute_trade(
        tables,
        &mut proposal.pricing,
        outcome_index as usize,
        order_size,
        now,
    )?;

    // Commit the credit usage and proposal bookkeeping
    ledger
        .record_mut(market_id, &depositor)?
        .reserve(proposal_index, amount, leverage)?;

    let proposal = market.proposal_mut(proposal_index)?;
    proposal.note_trade(depositor, amount, now, receipt.realized_price)?;

    if proposal.volatility_exceeded() && !proposal.locked {
        proposal.locked = true;
        emit_event(
            EventType::ProposalLocked,
            &ProposalLocked {
                market_id,
                proposal_index,
                timestamp: now,
            },
        );
    }

    emit_event(
        EventType::QuantumTradeExecuted,
        &QuantumTradeExecuted {
            market_id,
            depositor,
            proposal_index,
            amount,
            leverage,
            price_raw: receipt.realized_price.raw,
        },
    );

    Ok(receipt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ONE_RAW;
    use crate::math::tables::normal_tables;
    use crate::pricing::PricingState;
    use crate::quantum::market::{CollapseRule, Proposal};

    fn build_market(liquidity: i64) -> QuantumMarket {
        let proposals = (0..3)
            .map(|i| {
                let pricing =
                    PricingState::new(i, 2, I64F64::from_num(liquidity), 0, 100, I64F64::ZERO)
                        .unwrap();
                Proposal::new(pricing, 0).unwrap()
            })
            .collect();
        QuantumMarket::new(5, CollapseRule::MaxProbability, proposals, 100).unwrap()
    }

    fn funded_ledger(market: &QuantumMarket, depositor: Pubkey, deposit: u64) -> CreditLedger {
        let mut ledger = CreditLedger::new();
        ledger
            .issue(market.market_id, depositor, deposit, market.proposal_count())
            .unwrap();
        ledger
    }

    #[test]
    fn test_trade_updates_prices_and_credits() {
        let tables = normal_tables();
        let mut market = build_market(10_000);
        let alice = Pubkey::new_unique();
        let mut ledger = funded_ledger(&market, alice, 900);

        let receipt = place_quantum_trade(
            tables, &mut market, &mut ledger, alice, 0, 0, 100, 2, true, 1,
        )
        .unwrap();

        // Leveraged buy pushed the target outcome up
        assert!(receipt.realized_price > I64F64::from_fraction(1, 2).unwrap());
        assert_eq!(receipt.prices.iter().map(|p| p.raw).sum::<i128>(), ONE_RAW);

        let record = ledger.record(5, &alice).unwrap();
        assert_eq!(record.used_for(0), 100);
        assert_eq!(record.remaining_for(0).unwrap(), 200);

        let proposal = market.proposal(0).unwrap();
        assert_eq!(proposal.volume, 100);
        assert_eq!(proposal.unique_traders(), 1);
    }

    #[test]
    fn test_insufficient_credits_rejected_without_mutation() {
        let tables = normal_tables();
        let mut market = build_market(10_000);
        let alice = Pubkey::new_unique();
        let mut ledger = funded_ledger(&market, alice, 900);

        let prices_before = market.proposal(0).unwrap().pricing.prices.clone();
        let err = place_quantum_trade(
            tables, &mut market, &mut ledger, alice, 0, 0, 301, 1, true, 1,
        )
        .unwrap_err();

        assert_eq!(err, QuantumMarketError::InsufficientCredits.into());
        assert_eq!(market.proposal(0).unwrap().pricing.prices, prices_before);
        assert_eq!(market.proposal(0).unwrap().volume, 0);
        assert!(ledger.record(5, &alice).unwrap().used_credits.is_empty());
    }

    #[test]
    fn test_leverage_multiplies_price_impact() {
        let tables = normal_tables();
        let alice = Pubkey::new_unique();

        let mut plain = build_market(10_000);
        let mut ledger_a = funded_ledger(&plain, alice, 900);
        let flat = place_quantum_trade(
            tables, &mut plain, &mut ledger_a, alice, 0, 0, 100, 1, true, 1,
        )
        .unwrap();

        let mut levered = build_market(10_000);
        let mut ledger_b = funded_ledger(&levered, alice, 900);
        let boosted = place_quantum_trade(
            tables, &mut levered, &mut ledger_b, alice, 0, 0, 100, 10, true, 1,
        )
        .unwrap();

        assert!(boosted.realized_price > flat.realized_price);
        // Both consumed the same 100 credits
        assert_eq!(ledger_a.record(5, &alice).unwrap().used_for(0), 100);
        assert_eq!(ledger_b.record(5, &alice).unwrap().used_for(0), 100);
    }

    #[test]
    fn test_direction_signs_the_order() {
        let tables = normal_tables();
        let alice = Pubkey::new_unique();

        let mut market = build_market(10_000);
        let mut ledger = funded_ledger(&market, alice, 900);
        let receipt = place_quantum_trade(
            tables, &mut market, &mut ledger, alice, 1, 0, 100, 1, false, 1,
        )
        .unwrap();

        assert!(receipt.realized_price < I64F64::from_fraction(1, 2).unwrap());
    }

    #[test]
    fn test_leverage_bounds() {
        let tables = normal_tables();
        let mut market = build_market(10_000);
        let alice = Pubkey::new_unique();
        let mut ledger = funded_ledger(&market, alice, 900);

        for bad in [0u8, MAX_QUANTUM_LEVERAGE + 1] {
            let err = place_quantum_trade(
                tables, &mut market, &mut ledger, alice, 0, 0, 100, bad, true, 1,
            )
            .unwrap_err();
            assert_eq!(err, QuantumMarketError::LeverageTooHigh.into());
        }
    }

    #[test]
    fn test_unknown_depositor_rejected() {
        let tables = normal_tables();
        let mut market = build_market(10_000);
        let alice = Pubkey::new_unique();
        let stranger = Pubkey::new_unique();
        let mut ledger = funded_ledger(&market, alice, 900);

        let err = place_quantum_trade(
            tables, &mut market, &mut ledger, stranger, 0, 0, 100, 1, true, 1,
        )
        .unwrap_err();
        assert_eq!(err, QuantumMarketError::DepositorNotFound.into());
    }

    #[test]
    fn test_volatile_proposal_locks_itself() {
        let tables = normal_tables();
        // Thin depth so a modest order moves the price past the threshold
        let mut market = build_market(50);
        let alice = Pubkey::new_unique();
        let mut ledger = funded_ledger(&market, alice, 900);

        place_quantum_trade(
            tables, &mut market, &mut ledger, alice, 0, 0, 20, 1, true, 1,
        )
        .unwrap();
        place_quantum_trade(
            tables, &mut market, &mut ledger, alice, 0, 0, 20, 5, true, 2,
        )
        .unwrap();

        assert!(market.proposal(0).unwrap().locked);

        let err = place_quantum_trade(
            tables, &mut market, &mut ledger, alice, 0, 0, 10, 1, true, 3,
        )
        .unwrap_err();
        assert_eq!(err, QuantumMarketError::ProposalLocked.into());

        // Sibling proposals keep trading
        place_quantum_trade(
            tables, &mut market, &mut ledger, alice, 1, 0, 10, 1, true, 3,
        )
        .unwrap();
    }

    #[test]
    fn test_inactive_market_rejects_trades() {
        let tables = normal_tables();
        let mut market = build_market(10_000);
        let alice = Pubkey::new_unique();
        let mut ledger = funded_ledger(&market, alice, 900);

        market.begin_collapse(100, false).unwrap();
        market.set_winner(0).unwrap();

        let err = place_quantum_trade(
            tables, &mut market, &mut ledger, alice, 0, 0, 100, 1, true, 101,
        )
        .unwrap_err();
        assert_eq!(err, QuantumMarketError::MarketNotActive.into());
    }
}
