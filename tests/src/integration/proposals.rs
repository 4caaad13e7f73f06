//! # Proposal Scenarios
//!
//! Proposed transactions collecting approvals, review periods, expiry and
//! committee parameter changes.

#[cfg(test)]
mod tests {
    use ledger_chain::domain::ProposalObject;
    use ledger_chain::test_utils::*;
    use ledger_chain::ChainError;
    use shared_types::{
        AccountId, CommitteeMemberUpdateGlobalParametersOperation, Operation,
        ProposalCreateOperation, ProposalDeleteOperation, ProposalId, ProposalUpdateOperation,
        TimePointSec, TransferOperation, COMMITTEE_ACCOUNT,
    };
    use std::collections::BTreeSet;

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    const LIFETIME: u32 = 1_000;

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

    /// Alice proposes `ops`; returns the new proposal and its expiration.
    fn propose(
        chain: &mut TestChain,
        ops: Vec<Operation>,
        lifetime: u32,
        review: Option<u32>,
    ) -> (ProposalId, TimePointSec) {
        let expiration_time = chain.head_time().saturating_add(lifetime);
        let op = ProposalCreateOperation {
            fee: core(0),
            fee_paying_account: chain.account("alice"),
            expiration_time,
            proposed_ops: ops,
            review_period_seconds: review,
        };
        chain.push(&["alice"], vec![op.into()]).unwrap();
        let proposals = chain.db.index::<ProposalObject>().unwrap();
        let id = proposals.iter().map(|proposal| proposal.id).max().unwrap();
        (id, expiration_time)
    }

    fn approve(chain: &mut TestChain, name: &str, proposal: ProposalId) -> Result<(), ChainError> {
        let account = chain.account(name);
        let op = ProposalUpdateOperation {
            fee: core(0),
            fee_paying_account: account,
            proposal,
            active_approvals_to_add: [account].into(),
            ..Default::default()
        };
        chain.push(&[name], vec![op.into()]).map(|_| ())
    }

    fn exists(chain: &TestChain, proposal: ProposalId) -> bool {
        chain.db.find::<ProposalObject>(proposal).is_some()
    }

    // =========================================================================
    // APPROVAL AND EXECUTION
    // =========================================================================

    #[test]
    fn test_executes_once_approved() {
        let mut chain = TestChain::new();
        let (bob, carol) = (chain.account("bob"), chain.account("carol"));
        let (proposal, _) = propose(&mut chain, vec![transfer(bob, carol, 100)], LIFETIME, None);
        assert_eq!(chain.balance(carol), FUNDING);

        approve(&mut chain, "bob", proposal).unwrap();
        assert_eq!(chain.balance(carol), FUNDING + 100);
        assert!(!exists(&chain, proposal));
    }

    #[test]
    fn test_waits_for_every_required_account() {
        let mut chain = TestChain::new();
        let (bob, carol, dave) = (chain.account("bob"), chain.account("carol"), chain.account("dave"));
        let ops = vec![transfer(bob, dave, 10), transfer(carol, dave, 20)];
        let (proposal, _) = propose(&mut chain, ops, LIFETIME, None);

        approve(&mut chain, "bob", proposal).unwrap();
        assert!(exists(&chain, proposal));
        assert_eq!(chain.balance(dave), FUNDING);

        approve(&mut chain, "carol", proposal).unwrap();
        assert!(!exists(&chain, proposal));
        assert_eq!(chain.balance(dave), FUNDING + 30);
    }

    #[test]
    fn test_failed_execution_keeps_proposal() {
        let mut chain = TestChain::new();
        let (bob, carol) = (chain.account("bob"), chain.account("carol"));
        let (proposal, _) = propose(&mut chain, vec![transfer(bob, carol, 2 * FUNDING)], LIFETIME, None);

        // the approval itself succeeds
        approve(&mut chain, "bob", proposal).unwrap();
        let stored = chain.db.get::<ProposalObject>(proposal).unwrap();
        assert!(!stored.fail_reason.is_empty());
        assert!(stored.available_active_approvals.contains(&bob));
        assert_eq!(chain.balance(bob), FUNDING);
    }

    #[test]
    fn test_approval_runs_proposal_after_rest_of_transaction() {
        let mut chain = TestChain::new();
        let (alice, bob, carol, dave) = (
            chain.account("alice"),
            chain.account("bob"),
            chain.account("carol"),
            chain.account("dave"),
        );
        let (proposal, _) = propose(&mut chain, vec![transfer(bob, carol, FUNDING)], LIFETIME, None);

        // the approval and a transfer spending the same funds
        let approval = ProposalUpdateOperation {
            fee: core(0),
            fee_paying_account: bob,
            proposal,
            active_approvals_to_add: [bob].into(),
            ..Default::default()
        };
        chain
            .push(&["bob"], vec![approval.into(), transfer(bob, dave, FUNDING)])
            .unwrap();

        assert!(!chain.db.is_halted());
        assert_eq!(chain.balance(dave), 2 * FUNDING);
        assert_eq!(chain.balance(carol), FUNDING);
        let stored = chain.db.get::<ProposalObject>(proposal).unwrap();
        assert!(!stored.fail_reason.is_empty());

        chain.push(&["alice"], vec![transfer(alice, carol, 5)]).unwrap();
        assert_eq!(chain.balance(carol), FUNDING + 5);
    }

    #[test]
    fn test_approval_then_delete_in_one_transaction() {
        let mut chain = TestChain::new();
        let (bob, carol) = (chain.account("bob"), chain.account("carol"));
        let (proposal, _) = propose(&mut chain, vec![transfer(bob, carol, 100)], LIFETIME, None);

        let approval = ProposalUpdateOperation {
            fee: core(0),
            fee_paying_account: bob,
            proposal,
            active_approvals_to_add: [bob].into(),
            ..Default::default()
        };
        let delete = ProposalDeleteOperation {
            fee: core(0),
            fee_paying_account: bob,
            using_owner_authority: false,
            proposal,
        };
        chain.push(&["bob"], vec![approval.into(), delete.into()]).unwrap();
        assert!(!exists(&chain, proposal));
        assert_eq!(chain.balance(carol), FUNDING);
    }

    #[test]
    fn test_approval_needs_approver_signature() {
        let mut chain = TestChain::new();
        let (bob, carol) = (chain.account("bob"), chain.account("carol"));
        let (proposal, _) = propose(&mut chain, vec![transfer(bob, carol, 100)], LIFETIME, None);
        let op = ProposalUpdateOperation {
            fee: core(0),
            fee_paying_account: chain.account("alice"),
            proposal,
            active_approvals_to_add: [bob].into(),
            ..Default::default()
        };
        let err = chain.push(&["alice"], vec![op.into()]).unwrap_err();
        assert!(matches!(err.root(), ChainError::MissingAuthority { account, .. } if *account == bob));
        assert!(exists(&chain, proposal));
    }

    #[test]
    fn test_lifetime_limits() {
        let mut chain = TestChain::new();
        let (bob, carol) = (chain.account("bob"), chain.account("carol"));
        let max = chain.db.parameters().unwrap().maximum_proposal_lifetime;
        let op = ProposalCreateOperation {
            fee: core(0),
            fee_paying_account: chain.account("alice"),
            expiration_time: chain.head_time().saturating_add(max + 1),
            proposed_ops: vec![transfer(bob, carol, 1)],
            review_period_seconds: None,
        };
        let err = chain.push(&["alice"], vec![op.into()]).unwrap_err();
        assert!(matches!(err.root(), ChainError::InvalidProposal(_)));
    }

    // =========================================================================
    // REVIEW PERIOD AND EXPIRY
    // =========================================================================

    #[test]
    fn test_review_period_defers_execution_to_expiry() {
        let mut chain = TestChain::new();
        let (bob, carol) = (chain.account("bob"), chain.account("carol"));
        let (proposal, expiration) =
            propose(&mut chain, vec![transfer(bob, carol, 100)], LIFETIME, Some(100));

        approve(&mut chain, "bob", proposal).unwrap();
        assert!(exists(&chain, proposal));
        assert_eq!(chain.balance(carol), FUNDING);

        chain.db.generate_block(expiration).unwrap();
        assert!(!exists(&chain, proposal));
        assert_eq!(chain.balance(carol), FUNDING + 100);
    }

    #[test]
    fn test_no_new_approvals_during_review() {
        let mut chain = TestChain::new();
        let (bob, carol) = (chain.account("bob"), chain.account("carol"));
        let (proposal, expiration) =
            propose(&mut chain, vec![transfer(bob, carol, 100)], LIFETIME, Some(100));

        chain.db.generate_block(expiration.saturating_sub(50)).unwrap();
        let err = approve(&mut chain, "bob", proposal).unwrap_err();
        assert!(matches!(err.root(), ChainError::InvalidProposal(_)));

        chain.db.generate_block(expiration).unwrap();
        assert!(!exists(&chain, proposal));
        assert_eq!(chain.balance(carol), FUNDING);
    }

    #[test]
    fn test_unapproved_proposal_expires() {
        let mut chain = TestChain::new();
        let (bob, carol) = (chain.account("bob"), chain.account("carol"));
        let (proposal, expiration) = propose(&mut chain, vec![transfer(bob, carol, 100)], LIFETIME, None);

        chain.db.generate_block(expiration.saturating_sub(1)).unwrap();
        assert!(exists(&chain, proposal));
        chain.produce_block();
        assert!(!exists(&chain, proposal));
        assert_eq!(chain.balance(carol), FUNDING);
    }

    // =========================================================================
    // DELETION
    // =========================================================================

    #[test]
    fn test_required_account_may_delete() {
        let mut chain = TestChain::new();
        let (alice, bob, carol) = (chain.account("alice"), chain.account("bob"), chain.account("carol"));
        let (proposal, _) = propose(&mut chain, vec![transfer(bob, carol, 100)], LIFETIME, None);

        let by_proposer = ProposalDeleteOperation {
            fee: core(0),
            fee_paying_account: alice,
            using_owner_authority: false,
            proposal,
        };
        let err = chain.push(&["alice"], vec![by_proposer.into()]).unwrap_err();
        assert!(matches!(err.root(), ChainError::Unauthorized { .. }));

        let by_bob = ProposalDeleteOperation {
            fee: core(0),
            fee_paying_account: bob,
            using_owner_authority: false,
            proposal,
        };
        chain.push(&["bob"], vec![by_bob.into()]).unwrap();
        assert!(!exists(&chain, proposal));
    }

    // =========================================================================
    // COMMITTEE PARAMETERS
    // =========================================================================

    #[test]
    fn test_parameter_change_only_through_proposal() {
        let mut chain = TestChain::new();
        let op = CommitteeMemberUpdateGlobalParametersOperation {
            fee: core(0),
            new_parameters: chain.db.parameters().unwrap().clone(),
        };
        let err = chain.push(&["committee"], vec![op.into()]).unwrap_err();
        assert!(matches!(err.root(), ChainError::CommitteeOutsideProposal));
    }

    #[test]
    fn test_committee_proposal_needs_review_period() {
        let mut chain = TestChain::new();
        let review = chain.db.parameters().unwrap().committee_proposal_review_period;
        let op = ProposalCreateOperation {
            fee: core(0),
            fee_paying_account: chain.account("alice"),
            expiration_time: chain.head_time().saturating_add(2 * review),
            proposed_ops: vec![CommitteeMemberUpdateGlobalParametersOperation {
                fee: core(0),
                new_parameters: chain.db.parameters().unwrap().clone(),
            }
            .into()],
            review_period_seconds: Some(review - 1),
        };
        let err = chain.push(&["alice"], vec![op.into()]).unwrap_err();
        assert!(matches!(err.root(), ChainError::InvalidProposal(_)));
    }

    #[test]
    fn test_committee_parameters_apply_after_proposal_block() {
        let mut chain = TestChain::new();
        let mut parameters = chain.db.parameters().unwrap().clone();
        let old_size = parameters.maximum_transaction_size;
        parameters.maximum_transaction_size = old_size * 2;
        let review = parameters.committee_proposal_review_period;

        let update = CommitteeMemberUpdateGlobalParametersOperation {
            fee: core(0),
            new_parameters: parameters,
        };
        let (proposal, expiration) =
            propose(&mut chain, vec![update.into()], review + 3_600, Some(review));

        // the committee authority is a single key
        let committee_key = chain.key("committee").public_key();
        let op = ProposalUpdateOperation {
            fee: core(0),
            fee_paying_account: chain.account("alice"),
            proposal,
            key_approvals_to_add: [committee_key].into(),
            ..Default::default()
        };
        chain.push(&["alice", "committee"], vec![op.into()]).unwrap();
        assert!(exists(&chain, proposal));
        assert_eq!(
            chain.db.get::<ProposalObject>(proposal).unwrap().required_active_approvals,
            BTreeSet::from([COMMITTEE_ACCOUNT])
        );

        // executed at expiry, effective from the following block on
        chain.db.generate_block(expiration).unwrap();
        assert!(!exists(&chain, proposal));
        assert_eq!(chain.db.parameters().unwrap().maximum_transaction_size, old_size);
        assert!(chain.db.global_properties().unwrap().pending_parameters.is_some());

        chain.produce_block();
        assert_eq!(chain.db.parameters().unwrap().maximum_transaction_size, old_size * 2);
        assert!(chain.db.global_properties().unwrap().pending_parameters.is_none());
    }
}
