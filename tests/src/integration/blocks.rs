//! # Block Pipeline Scenarios
//!
//! Production, popping, fork switches and replay, each checked against
//! balances and the exported object image.

#[cfg(test)]
mod tests {
    use ledger_chain::test_utils::*;
    use ledger_chain::{ChainError, SkipFlags};
    use proptest::prelude::*;
    use shared_types::{AccountId, Operation, SignedBlock, TransferOperation};

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

    /// Produces `count` blocks, each carrying one alice -> bob transfer.
    fn produce_transfers(chain: &mut TestChain, count: usize) -> Vec<SignedBlock> {
        let (alice, bob) = (chain.account("alice"), chain.account("bob"));
        (0..count)
            .map(|_| {
                chain.push(&["alice"], vec![transfer(alice, bob, 1)]).unwrap();
                chain.produce_block()
            })
            .collect()
    }

    // =========================================================================
    // PRODUCTION AND POP
    // =========================================================================

    #[test]
    fn test_produced_block_carries_pending() {
        let mut chain = TestChain::new();
        let (alice, bob) = (chain.account("alice"), chain.account("bob"));
        chain.push(&["alice"], vec![transfer(alice, bob, 10)]).unwrap();
        chain.push(&["bob"], vec![transfer(bob, alice, 3)]).unwrap();

        let block = chain.produce_block();
        assert_eq!(block.transactions.len(), 2);
        assert_eq!(block.block_num(), 1);
        assert_eq!(chain.db.head_block_num().unwrap(), 1);
        assert_eq!(chain.db.head_block_id().unwrap(), block.id().unwrap());
        assert!(chain.db.pending_transactions().is_empty());
        assert_eq!(chain.balance(bob), FUNDING + 7);
    }

    #[test]
    fn test_pop_block_restores_previous_state() {
        let mut chain = TestChain::new();
        let (alice, bob) = (chain.account("alice"), chain.account("bob"));
        chain.produce_block();
        let image = chain.db.objects().export_image().unwrap();
        let head = chain.db.head_block_id().unwrap();

        chain.push(&["alice"], vec![transfer(alice, bob, 10)]).unwrap();
        let block = chain.produce_block();
        let popped = chain.db.pop_block().unwrap();

        assert_eq!(popped, block);
        assert_eq!(chain.db.head_block_id().unwrap(), head);
        assert_eq!(chain.balance(bob), FUNDING);
        assert_eq!(chain.db.objects().export_image().unwrap(), image);
    }

    #[test]
    fn test_pop_past_history_fails() {
        let mut chain = TestChain::new();
        let err = chain.db.pop_block().unwrap_err();
        assert!(matches!(err, ChainError::NothingToPop));

        produce_transfers(&mut chain, 2);
        chain.db.pop_block().unwrap();
        chain.db.pop_block().unwrap();
        assert!(matches!(chain.db.pop_block(), Err(ChainError::NothingToPop)));
        assert_eq!(chain.db.head_block_num().unwrap(), 0);
        assert!(!chain.db.is_halted());
    }

    #[test]
    fn test_pending_survives_foreign_block() {
        let mut producer = TestChain::new();
        let mut node = TestChain::new();
        let (alice, bob, carol) = (node.account("alice"), node.account("bob"), node.account("carol"));
        node.push(&["carol"], vec![transfer(carol, bob, 4)]).unwrap();

        producer.push(&["alice"], vec![transfer(alice, bob, 10)]).unwrap();
        let block = producer.produce_block();
        node.db.push_block(block).unwrap();

        assert_eq!(node.db.pending_transactions().len(), 1);
        assert_eq!(node.balance(bob), FUNDING + 14);
    }

    // =========================================================================
    // REJECTED BLOCKS
    // =========================================================================

    #[test]
    fn test_unlinkable_block_rejected() {
        let mut producer = TestChain::new();
        let mut node = TestChain::new();
        let blocks = produce_transfers(&mut producer, 2);

        let err = node.db.push_block(blocks[1].clone()).unwrap_err();
        assert!(matches!(err, ChainError::UnlinkableBlock { .. }));
        assert_eq!(node.db.head_block_num().unwrap(), 0);
        assert!(!node.db.is_halted());
    }

    #[test]
    fn test_merkle_mismatch_rejected() {
        let mut producer = TestChain::new();
        let mut node = TestChain::new();
        let mut block = produce_transfers(&mut producer, 1).remove(0);
        block.header.transaction_merkle_root[0] ^= 0xff;
        let image = node.db.objects().export_image().unwrap();

        let err = node.db.push_block(block).unwrap_err();
        assert!(matches!(err, ChainError::MerkleMismatch));
        assert_eq!(node.db.objects().export_image().unwrap(), image);
    }

    #[test]
    fn test_block_with_invalid_transaction_leaves_no_trace() {
        let mut producer = TestChain::new();
        let mut node = TestChain::new();
        let (alice, bob) = (producer.account("alice"), producer.account("bob"));
        producer.push(&["alice"], vec![transfer(alice, bob, 10)]).unwrap();
        let mut block = producer.produce_block();
        block.transactions.push(node.sign(&["alice"], vec![transfer(alice, bob, 2 * FUNDING)]));
        block.header.transaction_merkle_root = block.calculate_merkle_root().unwrap();

        let err = node.db.push_block(block).unwrap_err();
        assert!(matches!(err, ChainError::BlockTransaction { block_num: 1, index: 1, .. }));
        assert_eq!(node.balance(bob), FUNDING);
        assert_eq!(node.db.head_block_num().unwrap(), 0);
    }

    // =========================================================================
    // FORK SWITCH
    // =========================================================================

    #[test]
    fn test_switch_to_longer_fork() {
        let mut chain = TestChain::new();
        let mut rival = TestChain::new();
        let (alice, bob, carol) = (chain.account("alice"), chain.account("bob"), chain.account("carol"));

        chain.push(&["alice"], vec![transfer(alice, bob, 10)]).unwrap();
        chain.produce_block();
        rival.push(&["alice"], vec![transfer(alice, carol, 20)]).unwrap();
        let branch = vec![rival.produce_block(), rival.produce_block()];

        chain.db.switch_fork(branch.clone()).unwrap();
        assert_eq!(chain.db.head_block_id().unwrap(), branch[1].id().unwrap());
        assert_eq!(chain.balance(carol), FUNDING + 20);
        // the orphaned transfer is pending again
        assert_eq!(chain.db.pending_transactions().len(), 1);
        assert_eq!(chain.balance(bob), FUNDING + 10);
    }

    #[test]
    fn test_failed_fork_restores_old_branch() {
        let mut chain = TestChain::new();
        let mut rival = TestChain::new();
        let (alice, bob, carol) = (chain.account("alice"), chain.account("bob"), chain.account("carol"));

        chain.push(&["alice"], vec![transfer(alice, bob, 10)]).unwrap();
        let ours = chain.produce_block();
        let image = chain.db.objects().export_image().unwrap();

        rival.push(&["alice"], vec![transfer(alice, carol, 20)]).unwrap();
        let first = rival.produce_block();
        let mut second = rival.produce_block();
        second.header.transaction_merkle_root[0] ^= 0xff;

        let err = chain.db.switch_fork(vec![first, second]).unwrap_err();
        assert!(matches!(err, ChainError::MerkleMismatch));
        assert_eq!(chain.db.head_block_id().unwrap(), ours.id().unwrap());
        assert_eq!(chain.balance(carol), FUNDING);
        assert_eq!(chain.db.objects().export_image().unwrap(), image);
    }

    #[test]
    fn test_unrestorable_old_branch_halts() {
        let mut chain = TestChain::new();
        let mut producer = TestChain::new();
        let mut rival = TestChain::new();
        let (alice, bob, carol) = (chain.account("alice"), chain.account("bob"), chain.account("carol"));

        // accepted only because merkle checks were skipped at the time
        producer.push(&["alice"], vec![transfer(alice, bob, 10)]).unwrap();
        let mut ours = producer.produce_block();
        ours.header.transaction_merkle_root[0] ^= 0xff;
        chain
            .db
            .with_skip_flags(SkipFlags::SKIP_MERKLE_CHECK, |db| db.push_block(ours))
            .unwrap();

        rival.push(&["alice"], vec![transfer(alice, carol, 20)]).unwrap();
        let first = rival.produce_block();
        let mut second = rival.produce_block();
        second.header.transaction_merkle_root[0] ^= 0xff;

        let err = chain.db.switch_fork(vec![first, second]).unwrap_err();
        assert!(matches!(err, ChainError::Inconsistent(_)));
        assert!(chain.db.is_halted());
        assert!(matches!(chain.db.pop_block(), Err(ChainError::Halted(_))));
    }

    #[test]
    fn test_unknown_fork_point_rejected() {
        let mut chain = TestChain::new();
        let mut rival = TestChain::new();
        let blocks = produce_transfers(&mut rival, 3);
        let err = chain.db.switch_fork(blocks[2..].to_vec()).unwrap_err();
        assert!(matches!(err, ChainError::UnknownForkPoint(_)));
    }

    // =========================================================================
    // REPLAY
    // =========================================================================

    #[test]
    fn test_replay_reaches_same_state() {
        let mut producer = TestChain::new();
        let blocks = produce_transfers(&mut producer, 3);

        let mut node = TestChain::new();
        node.db.replay_blocks(&blocks, SkipFlags::empty()).unwrap();
        assert_eq!(
            node.db.objects().export_image().unwrap(),
            producer.db.objects().export_image().unwrap()
        );
        // replayed blocks are not undoable
        assert!(matches!(node.db.pop_block(), Err(ChainError::NothingToPop)));

        // the chain continues normally afterwards
        produce_transfers(&mut node, 1);
        node.db.pop_block().unwrap();
        assert_eq!(node.db.head_block_num().unwrap(), 3);
    }

    #[test]
    fn test_replay_with_checks_skipped() {
        let mut producer = TestChain::new();
        let blocks = produce_transfers(&mut producer, 3);
        let bob = producer.account("bob");

        let mut node = TestChain::new();
        node.db.replay_blocks(&blocks, SkipFlags::replay()).unwrap();
        assert_eq!(node.db.head_block_id().unwrap(), producer.db.head_block_id().unwrap());
        assert_eq!(node.balance(bob), producer.balance(bob));
    }

    #[test]
    fn test_failed_replay_halts() {
        let mut producer = TestChain::new();
        let mut blocks = produce_transfers(&mut producer, 2);
        blocks.swap(0, 1);

        let mut node = TestChain::new();
        let err = node.db.replay_blocks(&blocks, SkipFlags::replay()).unwrap_err();
        assert!(matches!(err, ChainError::UnlinkableBlock { .. }));
        assert!(node.db.is_halted());
        assert!(matches!(node.db.push_block(blocks[0].clone()), Err(ChainError::Halted(_))));
    }

    // =========================================================================
    // PROPERTIES
    // =========================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_pop_undoes_any_block(amounts in prop::collection::vec(1i64..1_000, 1..8)) {
            let mut chain = TestChain::new();
            let (alice, bob) = (chain.account("alice"), chain.account("bob"));
            chain.produce_block();
            let image = chain.db.objects().export_image().unwrap();

            for amount in &amounts {
                // equal amounts would repeat a transaction id
                let _ = chain.push(&["alice"], vec![transfer(alice, bob, *amount)]);
            }
            chain.produce_block();
            chain.db.pop_block().unwrap();
            prop_assert_eq!(chain.db.objects().export_image().unwrap(), image);
        }
    }
}
