//! Proposal execution and expiry.

use super::Database;
use crate::domain::{ProposalObject, ProposalsByExpiration, SignState, TransactionEvaluationState};
use crate::errors::ChainError;
use shared_types::{OperationResult, ProposalId, Transaction};
use tracing::{debug, warn};

impl Database {
    /// Whether the approvals collected so far satisfy every authority the
    /// proposed transaction needs.
    pub fn is_authorized_to_execute(&self, proposal: &ProposalObject) -> Result<bool, ChainError> {
        let max_depth = self.parameters()?.max_authority_depth;
        let mut sign_state = SignState::new(proposal.available_key_approvals.iter().copied(), max_depth)
            .with_approvals(
                proposal.available_active_approvals.iter().copied(),
                proposal.available_owner_approvals.iter().copied(),
            );
        let required = proposal.proposed_transaction.required_authorities();
        match sign_state.verify(&required, self, true) {
            Ok(()) => Ok(true),
            Err(err) if err.is_fatal() => Err(err),
            Err(_) => Ok(false),
        }
    }

    /// Evaluates and applies the proposed transaction in a nested session,
    /// then removes the proposal. On failure the session is undone and the
    /// proposal stays.
    pub(crate) fn push_proposal(&mut self, id: ProposalId) -> Result<Vec<OperationResult>, ChainError> {
        let limit = self.config.max_proposal_nesting;
        if self.proposal_depth >= limit {
            return Err(ChainError::ProposalNestingTooDeep {
                depth: self.proposal_depth + 1,
                limit,
            });
        }
        let proposed = self.get::<ProposalObject>(id)?.proposed_transaction.clone();

        self.proposal_depth += 1;
        let session = self.objects.start_undo_session(true);
        let result = self.execute_proposed(id, &proposed);
        self.proposal_depth -= 1;
        self.close_session(session, result.is_ok())?;

        if result.is_ok() {
            debug!(proposal = %id, operations = proposed.operations.len(), "Proposal executed");
        }
        result
    }

    fn execute_proposed(&mut self, id: ProposalId, proposed: &Transaction) -> Result<Vec<OperationResult>, ChainError> {
        let mut state = TransactionEvaluationState::proposed(self.skip_flags);
        let prepared = self.evaluate_operations(&mut state, &proposed.operations)?;
        let results = self.apply_operations(prepared, &proposed.operations)?;
        // the proposed operations may have deleted it
        if self.find::<ProposalObject>(id).is_some() {
            self.remove::<ProposalObject>(id)?;
        }
        self.execute_queued_proposals()?;
        Ok(results)
    }

    /// Marks a proposal for execution after the current operation list.
    pub(crate) fn queue_proposal(&mut self, id: ProposalId) {
        if !self.queued_proposals.contains(&id) {
            self.queued_proposals.push(id);
        }
    }

    /// Executes every queued proposal that still exists, has no review
    /// period and is authorized. Each runs in its own nested session; a
    /// failure is recorded on the proposal and does not affect the
    /// transaction that approved it.
    pub(crate) fn execute_queued_proposals(&mut self) -> Result<(), ChainError> {
        for id in std::mem::take(&mut self.queued_proposals) {
            let Some(proposal) = self.find::<ProposalObject>(id) else {
                continue;
            };
            if proposal.review_period_time.is_some() || !self.is_authorized_to_execute(proposal)? {
                continue;
            }
            match self.push_proposal(id) {
                Ok(_) => {}
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!(proposal = %id, error = %err, "Authorized proposal failed to execute");
                    let reason = err.to_string();
                    self.modify::<ProposalObject>(id, |proposal| proposal.fail_reason = reason)?;
                }
            }
        }
        Ok(())
    }

    /// Runs at the end of each block: an expired proposal is executed one
    /// last time if authorized, then removed either way.
    pub(crate) fn clear_expired_proposals(&mut self) -> Result<(), ChainError> {
        let now = self.head_block_time()?;
        loop {
            let next = self
                .secondary::<ProposalObject, ProposalsByExpiration>()?
                .first()
                .filter(|(expiration, _)| *expiration <= now)
                .map(|(_, id)| *id);
            let Some(id) = next else {
                return Ok(());
            };

            if self.is_authorized_to_execute(self.get(id)?)? {
                match self.push_proposal(id) {
                    Ok(_) => continue,
                    Err(err) if err.is_fatal() => return Err(err),
                    Err(err) => {
                        warn!(proposal = %id, error = %err, "Expiring proposal failed to execute");
                    }
                }
            }
            self.remove::<ProposalObject>(id)?;
        }
    }
}
