//! # Transaction Pipeline Scenarios
//!
//! All-or-nothing application, replay protection and fee accounting.

#[cfg(test)]
mod tests {
    use ledger_chain::domain::{AssetDynamicDataObject, TransactionHistoryObject};
    use ledger_chain::test_utils::*;
    use ledger_chain::{ChainError, SkipFlags};
    use shared_types::{
        AccountId, Asset, FeeSchedule, Operation, ProtocolError, TransferOperation, CORE_ASSET,
    };

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    fn transfer(from: AccountId, to: AccountId, amount: i64) -> Operation {
        TransferOperation {
            fee: core(0),
            from,
            to,
            amount: core(amount),
            memo: None,
        }
        .into()
    }

    fn history_len(chain: &TestChain) -> usize {
        chain.db.index::<TransactionHistoryObject>().unwrap().len()
    }

    // =========================================================================
    // ATOMICITY
    // =========================================================================

    #[test]
    fn test_failing_second_operation_leaves_no_trace() {
        let mut chain = TestChain::new();
        let (alice, bob) = (chain.account("alice"), chain.account("bob"));
        let image_before = chain.db.objects().export_image().unwrap();

        let ops = vec![transfer(alice, bob, 100), transfer(alice, bob, FUNDING)];
        let err = chain.push(&["alice"], ops).unwrap_err();

        assert!(matches!(err, ChainError::Operation { index: 1, .. }));
        assert!(matches!(err.root(), ChainError::InsufficientBalance { .. }));
        assert_eq!(chain.balance(alice), FUNDING);
        assert_eq!(chain.balance(bob), FUNDING);
        assert_eq!(chain.db.objects().export_image().unwrap(), image_before);
        assert!(chain.db.pending_transactions().is_empty());
    }

    #[test]
    fn test_later_operation_sees_earlier_effects() {
        let mut chain = TestChain::new();
        let (alice, bob, carol) = (chain.account("alice"), chain.account("bob"), chain.account("carol"));
        // bob can only forward alice's coins after receiving them
        let ops = vec![transfer(alice, bob, FUNDING), transfer(bob, carol, 2 * FUNDING)];
        chain.push(&["alice", "bob"], ops).unwrap();
        assert_eq!(chain.balance(alice), 0);
        assert_eq!(chain.balance(bob), 0);
        assert_eq!(chain.balance(carol), 3 * FUNDING);
    }

    #[test]
    fn test_transfer_to_self_fails_validation() {
        let mut chain = TestChain::new();
        let alice = chain.account("alice");
        let err = chain.push(&["alice"], vec![transfer(alice, alice, 100)]).unwrap_err();
        match err {
            ChainError::Protocol(ProtocolError::InvalidOperation { operation, reason }) => {
                assert_eq!(operation, "transfer");
                assert_eq!(reason, "from != to");
            }
            other => panic!("expected validation failure, got {other}"),
        }
        assert_eq!(chain.balance(alice), FUNDING);
    }

    #[test]
    fn test_clear_pending_reverts_effects() {
        let mut chain = TestChain::new();
        let (alice, bob) = (chain.account("alice"), chain.account("bob"));
        chain.push(&["alice"], vec![transfer(alice, bob, 10)]).unwrap();
        assert_eq!(chain.balance(bob), FUNDING + 10);

        chain.db.clear_pending().unwrap();
        assert_eq!(chain.balance(bob), FUNDING);
        assert!(chain.db.pending_transactions().is_empty());
    }

    // =========================================================================
    // REPLAY PROTECTION
    // =========================================================================

    #[test]
    fn test_duplicate_rejected_before_and_after_inclusion() {
        let mut chain = TestChain::new();
        let (alice, bob) = (chain.account("alice"), chain.account("bob"));
        let trx = chain.sign(&["alice"], vec![transfer(alice, bob, 10)]);

        chain.db.push_transaction(trx.clone()).unwrap();
        let err = chain.db.push_transaction(trx.clone()).unwrap_err();
        assert!(matches!(err, ChainError::DuplicateTransaction(_)));

        chain.produce_block();
        let err = chain.db.push_transaction(trx).unwrap_err();
        assert!(matches!(err, ChainError::DuplicateTransaction(_)));
        assert_eq!(chain.balance(bob), FUNDING + 10);
    }

    #[test]
    fn test_history_forgotten_after_expiration() {
        let mut chain = TestChain::new();
        let (alice, bob) = (chain.account("alice"), chain.account("bob"));
        chain.push(&["alice"], vec![transfer(alice, bob, 10)]).unwrap();
        chain.produce_block();
        assert_eq!(history_len(&chain), 1);

        let interval = chain.db.parameters().unwrap().block_interval;
        let blocks = TRANSACTION_LIFETIME / u32::from(interval) + 2;
        for _ in 0..blocks {
            chain.produce_block();
        }
        assert_eq!(history_len(&chain), 0);
    }

    #[test]
    fn test_unknown_reference_block_rejected() {
        let mut chain = TestChain::new();
        let (alice, bob) = (chain.account("alice"), chain.account("bob"));
        let mut trx = chain.transaction(vec![transfer(alice, bob, 10)]);
        trx.ref_block_prefix ^= 0xdead_beef;
        let signed = chain.sign_transaction(&["alice"], trx);
        let err = chain.db.push_transaction(signed).unwrap_err();
        assert!(matches!(err, ChainError::TaposMismatch { .. }));
    }

    #[test]
    fn test_expiration_window() {
        let mut chain = TestChain::new();
        let (alice, bob) = (chain.account("alice"), chain.account("bob"));
        chain.produce_block();
        let now = chain.head_time();

        let mut trx = chain.transaction(vec![transfer(alice, bob, 10)]);
        trx.set_expiration(now.saturating_sub(1));
        let err = chain.db.push_transaction(chain.sign_transaction(&["alice"], trx)).unwrap_err();
        assert!(matches!(err, ChainError::Expired { .. }));

        let max = chain.db.parameters().unwrap().maximum_time_until_expiration;
        let mut trx = chain.transaction(vec![transfer(alice, bob, 10)]);
        trx.set_expiration(now.saturating_add(max + 1));
        let err = chain.db.push_transaction(chain.sign_transaction(&["alice"], trx)).unwrap_err();
        assert!(matches!(err, ChainError::ExpirationTooFar { .. }));
    }

    // =========================================================================
    // SIGNATURES
    // =========================================================================

    #[test]
    fn test_tampered_signature_rejected() {
        let mut chain = TestChain::new();
        let (alice, bob) = (chain.account("alice"), chain.account("bob"));
        let mut trx = chain.sign(&["alice"], vec![transfer(alice, bob, 10)]);
        trx.signatures[0].signature.0[0] ^= 0x01;
        let err = chain.db.push_transaction(trx).unwrap_err();
        assert!(matches!(err, ChainError::InvalidSignature(_)));
    }

    #[test]
    fn test_signature_over_other_chain_rejected() {
        let mut chain = TestChain::new();
        let other = TestChain::try_with_genesis(|genesis| genesis.core_symbol = "OTHER".into()).unwrap();
        let (alice, bob) = (chain.account("alice"), chain.account("bob"));
        let trx = other.sign_transaction(&["alice"], chain.transaction(vec![transfer(alice, bob, 10)]));
        let err = chain.db.push_transaction(trx).unwrap_err();
        assert!(matches!(err, ChainError::InvalidSignature(_)));
    }

    #[test]
    fn test_skipped_signatures_accept_unsigned() {
        let mut chain = TestChain::new();
        let (alice, bob) = (chain.account("alice"), chain.account("bob"));
        let trx = chain.sign(&[], vec![transfer(alice, bob, 10)]);
        let err = chain.db.push_transaction(trx.clone()).unwrap_err();
        assert!(matches!(err.root(), ChainError::MissingAuthority { .. }));

        chain
            .db
            .with_skip_flags(SkipFlags::SKIP_TRANSACTION_SIGNATURES, |db| db.push_transaction(trx))
            .unwrap();
        assert_eq!(chain.balance(bob), FUNDING + 10);
    }

    // =========================================================================
    // FEES
    // =========================================================================

    #[test]
    fn test_zero_fee_rejected_under_schedule() {
        let mut chain = TestChain::with_fees(FeeSchedule::default());
        let (alice, bob) = (chain.account("alice"), chain.account("bob"));
        let err = chain.push(&["alice"], vec![transfer(alice, bob, 10)]).unwrap_err();
        assert!(matches!(err.root(), ChainError::InsufficientFee { .. }));
    }

    #[test]
    fn test_fee_charged_to_payer_and_accumulated() {
        let mut chain = TestChain::with_fees(FeeSchedule::default());
        let (alice, bob) = (chain.account("alice"), chain.account("bob"));
        let core_data = chain.asset_data(CORE_ASSET);
        let before = chain.db.get::<AssetDynamicDataObject>(core_data).unwrap().accumulated_fees;

        let mut op = transfer(alice, bob, 10);
        let fee = chain.set_fee(&mut op, CORE_ASSET);
        assert!(fee.amount > 0);
        chain.push(&["alice"], vec![op]).unwrap();

        assert_eq!(chain.balance(alice), FUNDING - 10 - fee.amount);
        assert_eq!(chain.balance(bob), FUNDING + 10);
        let after = chain.db.get::<AssetDynamicDataObject>(core_data).unwrap().accumulated_fees;
        assert_eq!(after - before, fee.amount);
    }

    #[test]
    fn test_fee_counts_against_balance() {
        let mut chain = TestChain::with_fees(FeeSchedule::default());
        let (alice, bob) = (chain.account("alice"), chain.account("bob"));
        // the whole balance leaves nothing for the fee
        let err = chain
            .push_with_fees(&["alice"], vec![transfer(alice, bob, FUNDING)])
            .unwrap_err();
        assert!(matches!(err.root(), ChainError::InsufficientBalance { .. }));
        assert_eq!(chain.balance(alice), FUNDING);
    }

    #[test]
    fn test_overpaid_fee_is_kept() {
        let mut chain = TestChain::with_fees(FeeSchedule::default());
        let (alice, bob) = (chain.account("alice"), chain.account("bob"));
        let mut op = transfer(alice, bob, 10);
        let fee = chain.set_fee(&mut op, CORE_ASSET);
        if let Operation::Transfer(payload) = &mut op {
            payload.fee = Asset::core(fee.amount * 2);
        }
        chain.push(&["alice"], vec![op]).unwrap();
        assert_eq!(chain.balance(alice), FUNDING - 10 - fee.amount * 2);
    }

    // =========================================================================
    // DETERMINISM
    // =========================================================================

    #[test]
    fn test_same_block_yields_same_state() {
        let mut producer = TestChain::new();
        let mut follower = TestChain::new();
        let (alice, bob, carol) = (producer.account("alice"), producer.account("bob"), producer.account("carol"));
        producer.push(&["alice"], vec![transfer(alice, bob, 5)]).unwrap();
        producer.push(&["bob"], vec![transfer(bob, carol, 7)]).unwrap();
        let block = producer.produce_block();

        follower.db.push_block(block).unwrap();
        assert_eq!(
            producer.db.objects().export_image().unwrap(),
            follower.db.objects().export_image().unwrap()
        );
    }
}
