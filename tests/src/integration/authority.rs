//! # Authority Scenarios
//!
//! Weighted thresholds over keys and accounts, as seen by real
//! transactions.

#[cfg(test)]
mod tests {
    use ledger_chain::test_utils::*;
    use ledger_chain::ChainError;
    use shared_types::{
        AccountCreateOperation, AccountId, Authority, Operation, PublicKey, TransferOperation,
        COMMITTEE_ACCOUNT,
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

    /// Registers `name` with `active` as both authorities and funds it.
    fn register(chain: &mut TestChain, name: &str, active: Authority) -> AccountId {
        let alice = chain.account("alice");
        let op = AccountCreateOperation {
            fee: core(0),
            registrar: alice,
            name: name.to_string(),
            owner: active.clone(),
            active,
            memo_key: PublicKey::default(),
        };
        chain.push(&["alice"], vec![op.into()]).unwrap();
        let account = chain.account(name);
        chain.push(&["alice"], vec![transfer(alice, account, 1_000)]).unwrap();
        account
    }

    fn two_of_two(chain: &mut TestChain) -> AccountId {
        let key_a = chain.add_key("key-a").public_key();
        let key_b = chain.add_key("key-b").public_key();
        chain.add_key("key-c");
        let authority = Authority::new(2).with_key(key_a, 1).with_key(key_b, 1);
        register(chain, "multisig", authority)
    }

    // =========================================================================
    // KEY THRESHOLDS
    // =========================================================================

    #[test]
    fn test_one_of_two_keys_is_not_enough() {
        let mut chain = TestChain::new();
        let multisig = two_of_two(&mut chain);
        let bob = chain.account("bob");
        let err = chain.push(&["key-a"], vec![transfer(multisig, bob, 10)]).unwrap_err();
        assert!(matches!(err.root(), ChainError::MissingAuthority { account, .. } if *account == multisig));
        assert_eq!(chain.balance(multisig), 1_000);
    }

    #[test]
    fn test_both_keys_satisfy_threshold() {
        let mut chain = TestChain::new();
        let multisig = two_of_two(&mut chain);
        let bob = chain.account("bob");
        chain.push(&["key-a", "key-b"], vec![transfer(multisig, bob, 10)]).unwrap();
        assert_eq!(chain.balance(multisig), 990);
    }

    #[test]
    fn test_unrelated_extra_signature_rejected() {
        let mut chain = TestChain::new();
        let multisig = two_of_two(&mut chain);
        let bob = chain.account("bob");
        let key_c = chain.key("key-c").public_key();
        let err = chain
            .push(&["key-a", "key-b", "key-c"], vec![transfer(multisig, bob, 10)])
            .unwrap_err();
        assert!(matches!(err, ChainError::IrrelevantSignature(key) if key == key_c));
        assert_eq!(chain.balance(multisig), 1_000);
    }

    #[test]
    fn test_same_key_twice_rejected() {
        let mut chain = TestChain::new();
        let (alice, bob) = (chain.account("alice"), chain.account("bob"));
        let err = chain.push(&["alice", "alice"], vec![transfer(alice, bob, 10)]).unwrap_err();
        assert!(matches!(err, ChainError::DuplicateSignature(_)));
    }

    #[test]
    fn test_owner_key_satisfies_active() {
        let mut chain = TestChain::new();
        let (alice, bob) = (chain.account("alice"), chain.account("bob"));
        chain.push(&["alice-owner"], vec![transfer(alice, bob, 10)]).unwrap();
        assert_eq!(chain.balance(bob), FUNDING + 10);
    }

    // =========================================================================
    // ACCOUNT DELEGATION
    // =========================================================================

    #[test]
    fn test_account_authority_delegates_to_member() {
        let mut chain = TestChain::new();
        let alice = chain.account("alice");
        let shared = register(&mut chain, "shared", Authority::single_account(alice));
        let bob = chain.account("bob");
        chain.push(&["alice"], vec![transfer(shared, bob, 10)]).unwrap();
        assert_eq!(chain.balance(shared), 990);
    }

    #[test]
    fn test_weighted_mix_of_keys_and_accounts() {
        let mut chain = TestChain::new();
        let (alice, bob) = (chain.account("alice"), chain.account("bob"));
        let key_a = chain.add_key("key-a").public_key();
        let authority = Authority::new(3)
            .with_key(key_a, 1)
            .with_account(alice, 1)
            .with_account(bob, 2);
        let mixed = register(&mut chain, "mixed", authority);

        let err = chain.push(&["key-a", "alice"], vec![transfer(mixed, bob, 1)]).unwrap_err();
        assert!(matches!(err.root(), ChainError::MissingAuthority { .. }));
        chain.push(&["key-a", "bob"], vec![transfer(mixed, bob, 1)]).unwrap();
    }

    #[test]
    fn test_nesting_beyond_depth_rejected() {
        let mut chain = TestChain::new();
        let alice = chain.account("alice");
        let bob = chain.account("bob");
        let first = register(&mut chain, "first", Authority::single_account(alice));
        let second = register(&mut chain, "second", Authority::single_account(first));
        let third = register(&mut chain, "third", Authority::single_account(second));
        assert_eq!(chain.db.parameters().unwrap().max_authority_depth, 2);

        chain.push(&["alice"], vec![transfer(second, bob, 1)]).unwrap();
        let err = chain.push(&["alice"], vec![transfer(third, bob, 1)]).unwrap_err();
        assert!(matches!(err.root(), ChainError::AuthorityDepthExceeded { max_depth: 2 }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_oversized_authority_rejected() {
        let mut chain = TestChain::new();
        let limit = chain.db.parameters().unwrap().maximum_authority_membership;
        let mut authority = Authority::new(1);
        for i in 0..=limit {
            let key = chain.add_key(&format!("member-{i}")).public_key();
            authority = authority.with_key(key, 1);
        }
        let op = AccountCreateOperation {
            fee: core(0),
            registrar: chain.account("alice"),
            name: "crowd".into(),
            owner: authority.clone(),
            active: authority,
            memo_key: PublicKey::default(),
        };
        let err = chain.push(&["alice"], vec![op.into()]).unwrap_err();
        assert!(matches!(err.root(), ChainError::AuthorityTooLarge { .. }));
    }

    // =========================================================================
    // COMMITTEE
    // =========================================================================

    #[test]
    fn test_committee_acts_only_through_proposals() {
        let mut chain = TestChain::new();
        let bob = chain.account("bob");
        let err = chain
            .push(&["committee"], vec![transfer(COMMITTEE_ACCOUNT, bob, 1)])
            .unwrap_err();
        assert!(matches!(err.root(), ChainError::CommitteeOutsideProposal));
    }
}
