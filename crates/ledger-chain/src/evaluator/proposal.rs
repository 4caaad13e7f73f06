//! Proposals: transactions stored on chain until enough approvals collect.

use super::{EvalContext, Evaluator};
use crate::database::Database;
use crate::domain::ProposalObject;
use crate::errors::ChainError;
use shared_types::{
    OperationResult, ProposalCreateOperation, ProposalDeleteOperation, ProposalUpdateOperation,
    RequiredAuthorities, Transaction, TypedId, COMMITTEE_ACCOUNT,
};
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Default)]
pub struct ProposalCreateEvaluator {
    proposed: Transaction,
    required: RequiredAuthorities,
}

impl Evaluator for ProposalCreateEvaluator {
    type Operation = ProposalCreateOperation;

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>, op: &ProposalCreateOperation) -> Result<(), ChainError> {
        let now = ctx.now()?;
        let params = ctx.parameters()?;
        if op.expiration_time <= now {
            return Err(ChainError::InvalidProposal(format!(
                "expiration {} is not after head time {now}",
                op.expiration_time
            )));
        }
        let lifetime = op.expiration_time.seconds_since(now);
        if lifetime > params.maximum_proposal_lifetime {
            return Err(ChainError::InvalidProposal(format!(
                "lifetime of {lifetime}s exceeds {}s",
                params.maximum_proposal_lifetime
            )));
        }
        if let Some(review) = op.review_period_seconds {
            if review >= lifetime {
                return Err(ChainError::InvalidProposal(format!(
                    "review period of {review}s does not fit in a lifetime of {lifetime}s"
                )));
            }
        }

        let mut required = RequiredAuthorities::default();
        for proposed in &op.proposed_ops {
            proposed.required_authorities(&mut required);
        }
        if !required.other.is_empty() {
            return Err(ChainError::InvalidProposal(
                "proposed operations may only require account authorities".into(),
            ));
        }
        if required.active.contains(&COMMITTEE_ACCOUNT) || required.owner.contains(&COMMITTEE_ACCOUNT) {
            let minimum = params.committee_proposal_review_period;
            match op.review_period_seconds {
                Some(review) if review >= minimum => {}
                _ => {
                    return Err(ChainError::InvalidProposal(format!(
                        "committee proposals need a review period of at least {minimum}s"
                    )))
                }
            }
        }

        let proposed = Transaction {
            expiration: op.expiration_time,
            operations: op.proposed_ops.clone(),
            ..Transaction::default()
        };
        proposed.validate()?;
        self.proposed = proposed;
        self.required = required;
        Ok(())
    }

    fn apply(&mut self, db: &mut Database, op: &ProposalCreateOperation) -> Result<OperationResult, ChainError> {
        let required = std::mem::take(&mut self.required);
        let proposed = std::mem::take(&mut self.proposed);
        // owner approval covers active, so an owner requirement is not
        // listed twice
        let required_active: BTreeSet<_> = required.active.difference(&required.owner).copied().collect();
        let proposal = db.create::<ProposalObject>(|id| ProposalObject {
            id,
            proposer: op.fee_paying_account,
            expiration_time: op.expiration_time,
            review_period_time: op
                .review_period_seconds
                .map(|review| op.expiration_time.saturating_sub(review)),
            proposed_transaction: proposed,
            required_active_approvals: required_active,
            available_active_approvals: BTreeSet::new(),
            required_owner_approvals: required.owner,
            available_owner_approvals: BTreeSet::new(),
            available_key_approvals: BTreeSet::new(),
            fail_reason: String::new(),
        })?;
        debug!(proposal = %proposal.id, proposer = %op.fee_paying_account, "Proposal created");
        Ok(OperationResult::ObjectId(proposal.id.object_id()))
    }
}

/// Adds and removes approvals. A proposal that ends up authorized and has
/// no review period is executed after the rest of the transaction.
#[derive(Debug, Default)]
pub struct ProposalUpdateEvaluator;

impl Evaluator for ProposalUpdateEvaluator {
    type Operation = ProposalUpdateOperation;

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>, op: &ProposalUpdateOperation) -> Result<(), ChainError> {
        let proposal = ctx.proposal(op.proposal)?;
        let now = ctx.now()?;
        if let Some(review_start) = proposal.review_period_time {
            let adds = !op.active_approvals_to_add.is_empty() || !op.owner_approvals_to_add.is_empty();
            if now >= review_start && adds {
                return Err(ChainError::InvalidProposal(format!(
                    "{} is in its review period and takes no new approvals",
                    proposal.id
                )));
            }
        }
        for account in &op.active_approvals_to_remove {
            if !proposal.available_active_approvals.contains(account) {
                return Err(ChainError::InvalidProposal(format!(
                    "{account} has no active approval on {} to remove",
                    proposal.id
                )));
            }
        }
        for account in &op.owner_approvals_to_remove {
            if !proposal.available_owner_approvals.contains(account) {
                return Err(ChainError::InvalidProposal(format!(
                    "{account} has no owner approval on {} to remove",
                    proposal.id
                )));
            }
        }
        for key in &op.key_approvals_to_remove {
            if !proposal.available_key_approvals.contains(key) {
                return Err(ChainError::InvalidProposal(format!(
                    "key {key} has no approval on {} to remove",
                    proposal.id
                )));
            }
        }
        Ok(())
    }

    fn apply(&mut self, db: &mut Database, op: &ProposalUpdateOperation) -> Result<OperationResult, ChainError> {
        db.modify::<ProposalObject>(op.proposal, |proposal| {
            proposal.available_active_approvals.extend(&op.active_approvals_to_add);
            proposal.available_owner_approvals.extend(&op.owner_approvals_to_add);
            proposal.available_key_approvals.extend(&op.key_approvals_to_add);
            for account in &op.active_approvals_to_remove {
                proposal.available_active_approvals.remove(account);
            }
            for account in &op.owner_approvals_to_remove {
                proposal.available_owner_approvals.remove(account);
            }
            for key in &op.key_approvals_to_remove {
                proposal.available_key_approvals.remove(key);
            }
        })?;

        // execution waits until every operation of this transaction applied
        db.queue_proposal(op.proposal);
        Ok(OperationResult::Void)
    }
}

#[derive(Debug, Default)]
pub struct ProposalDeleteEvaluator;

impl Evaluator for ProposalDeleteEvaluator {
    type Operation = ProposalDeleteOperation;

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>, op: &ProposalDeleteOperation) -> Result<(), ChainError> {
        let proposal = ctx.proposal(op.proposal)?;
        let required = if op.using_owner_authority {
            &proposal.required_owner_approvals
        } else {
            &proposal.required_active_approvals
        };
        if !required.contains(&op.fee_paying_account) {
            return Err(ChainError::Unauthorized {
                account: op.fee_paying_account,
                object: op.proposal.object_id(),
            });
        }
        ctx.state.effects.consume(op.proposal)
    }

    fn apply(&mut self, db: &mut Database, op: &ProposalDeleteOperation) -> Result<OperationResult, ChainError> {
        db.remove::<ProposalObject>(op.proposal)?;
        Ok(OperationResult::Void)
    }
}
