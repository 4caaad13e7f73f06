//! # Claimable Balance Scenarios
//!
//! Genesis balances owned by a key, claimed whole or, when vesting, in
//! installments no more than a day apart.

#[cfg(test)]
mod tests {
    use ledger_chain::domain::BalanceObject;
    use ledger_chain::evaluator::VESTING_CLAIM_INTERVAL;
    use ledger_chain::test_utils::*;
    use ledger_chain::{ChainError, GenesisClaimableBalance};
    use shared_types::{AccountId, BalanceClaimOperation, BalanceId, Operation};

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    const CLAIMABLE: i64 = 10_000;
    const VESTING_SECONDS: u32 = 10 * VESTING_CLAIM_INTERVAL;

    /// Chain with one balance owned by the `treasury` key.
    fn chain_with_balance(vesting: Option<u32>) -> (TestChain, BalanceId) {
        let mut chain = TestChain::try_with_genesis(|genesis| {
            genesis.initial_claimable_balances.push(GenesisClaimableBalance {
                owner: key_for("treasury").public_key(),
                amount: CLAIMABLE,
                vesting_duration_seconds: vesting,
            });
        })
        .unwrap();
        chain.add_key("treasury");
        let balance = chain.db.index::<BalanceObject>().unwrap().iter().next().unwrap().id;
        (chain, balance)
    }

    fn claim(chain: &TestChain, to: AccountId, balance: BalanceId, amount: i64) -> Operation {
        BalanceClaimOperation {
            fee: core(0),
            deposit_to_account: to,
            balance_to_claim: balance,
            balance_owner_key: chain.key("treasury").public_key(),
            total_claimed: core(amount),
        }
        .into()
    }

    /// Produces a single block `secs` after the head.
    fn advance(chain: &mut TestChain, secs: u32) {
        let when = chain.head_time().saturating_add(secs);
        chain.db.generate_block(when).unwrap();
    }

    // =========================================================================
    // PLAIN BALANCES
    // =========================================================================

    #[test]
    fn test_full_claim_moves_balance() {
        let (mut chain, balance) = chain_with_balance(None);
        let alice = chain.account("alice");
        let op = claim(&chain, alice, balance, CLAIMABLE);
        chain.push(&["treasury"], vec![op]).unwrap();

        assert_eq!(chain.balance(alice), FUNDING + CLAIMABLE);
        assert!(chain.db.find::<BalanceObject>(balance).is_none());
    }

    #[test]
    fn test_partial_claim_of_plain_balance_rejected() {
        let (mut chain, balance) = chain_with_balance(None);
        let alice = chain.account("alice");
        let op = claim(&chain, alice, balance, CLAIMABLE / 2);
        let err = chain.push(&["treasury"], vec![op]).unwrap_err();
        assert!(matches!(err.root(), ChainError::InvalidBalanceClaim(reason) if reason.contains("full balance")));
        assert_eq!(chain.balance(alice), FUNDING);
    }

    #[test]
    fn test_claim_needs_owner_key() {
        let (mut chain, balance) = chain_with_balance(None);
        let alice = chain.account("alice");
        let op = claim(&chain, alice, balance, CLAIMABLE);
        let err = chain.push(&["alice"], vec![op]).unwrap_err();
        assert!(matches!(err.root(), ChainError::MissingOtherAuthority));
    }

    #[test]
    fn test_balance_claimed_only_once_per_transaction() {
        let (mut chain, balance) = chain_with_balance(None);
        let (alice, bob) = (chain.account("alice"), chain.account("bob"));
        let ops = vec![
            claim(&chain, alice, balance, CLAIMABLE),
            claim(&chain, bob, balance, CLAIMABLE),
        ];
        let err = chain.push(&["treasury"], ops).unwrap_err();
        assert!(matches!(err, ChainError::Operation { index: 1, .. }));
        assert!(chain.db.find::<BalanceObject>(balance).is_some());
    }

    // =========================================================================
    // VESTING BALANCES
    // =========================================================================

    #[test]
    fn test_nothing_vested_at_genesis() {
        let (mut chain, balance) = chain_with_balance(Some(VESTING_SECONDS));
        let alice = chain.account("alice");
        let op = claim(&chain, alice, balance, 1);
        let err = chain.push(&["treasury"], vec![op]).unwrap_err();
        assert!(matches!(err.root(), ChainError::InvalidBalanceClaim(_)));
    }

    #[test]
    fn test_vested_share_claimable_in_installments() {
        let (mut chain, balance) = chain_with_balance(Some(VESTING_SECONDS));
        let alice = chain.account("alice");
        advance(&mut chain, 2 * VESTING_CLAIM_INTERVAL);
        let vested = CLAIMABLE / 5;

        let op = claim(&chain, alice, balance, vested + 1);
        let err = chain.push(&["treasury"], vec![op]).unwrap_err();
        assert!(matches!(err.root(), ChainError::InvalidBalanceClaim(_)));

        let op = claim(&chain, alice, balance, vested);
        chain.push(&["treasury"], vec![op]).unwrap();
        assert_eq!(chain.balance(alice), FUNDING + vested);
        let left = chain.db.get::<BalanceObject>(balance).unwrap();
        assert_eq!(left.balance.amount, CLAIMABLE - vested);

        // the next installment must wait a day
        chain.produce_block();
        let op = claim(&chain, alice, balance, 1);
        let err = chain.push(&["treasury"], vec![op]).unwrap_err();
        assert!(matches!(err.root(), ChainError::InvalidBalanceClaim(_)));

        advance(&mut chain, VESTING_CLAIM_INTERVAL);
        let op = claim(&chain, alice, balance, CLAIMABLE / 10);
        chain.push(&["treasury"], vec![op]).unwrap();
    }

    #[test]
    fn test_fully_vested_claim_removes_object() {
        let (mut chain, balance) = chain_with_balance(Some(VESTING_SECONDS));
        let alice = chain.account("alice");
        advance(&mut chain, VESTING_SECONDS);
        let op = claim(&chain, alice, balance, CLAIMABLE);
        chain.push(&["treasury"], vec![op]).unwrap();
        assert!(chain.db.find::<BalanceObject>(balance).is_none());
        assert_eq!(chain.balance(alice), FUNDING + CLAIMABLE);
    }
}
