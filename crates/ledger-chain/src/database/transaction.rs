//! Transaction pipeline.
//!
//! ```text
//! validate → dupe check → TaPoS → expiration → signatures
//!   → evaluate every operation (authority, fee, rules)
//!   → unused signature check
//!   → apply every operation → record for dupe check
//! ```
//!
//! Each transaction runs in its own undo session, so a failure at any
//! step leaves no trace.

use super::Database;
use crate::domain::{
    BlockSummaryId, BlockSummaryObject, HistoryByExpiration, HistoryById, SignState, SkipFlags,
    TransactionEvaluationState, TransactionHistoryObject,
};
use crate::errors::ChainError;
use crate::evaluator::{self, EvalContext, PreparedOperation};
use ledger_telemetry::{
    time_histogram, OPERATIONS_APPLIED, TRANSACTIONS_APPLIED, TRANSACTIONS_REJECTED,
    TRANSACTION_APPLY_SECONDS,
};
use shared_types::{
    codec, Operation, OperationResult, ProcessedTransaction, RequiredAuthorities,
    SignedTransaction, Transaction, TransactionId,
};
use std::collections::BTreeSet;
use tracing::debug;

impl Database {
    /// Applies `trx` on top of the pending state and keeps it for the next
    /// block.
    pub fn push_transaction(&mut self, trx: SignedTransaction) -> Result<ProcessedTransaction, ChainError> {
        self.ensure_running()?;
        if self.pending_session.is_none() {
            self.pending_session = Some(self.objects.start_undo_session(true));
        }
        let processed = self.apply_transaction(&trx, self.skip_flags)?;
        self.pending.push(processed.clone());
        Ok(processed)
    }

    /// Drops every pending transaction and its effects.
    pub fn clear_pending(&mut self) -> Result<(), ChainError> {
        self.pending.clear();
        match self.pending_session.take() {
            Some(session) => self.close_session(session, false),
            None => Ok(()),
        }
    }

    /// Runs the full pipeline for one transaction. Either every operation
    /// takes effect or none does. Callers hold the pending or block
    /// session the transaction merges into.
    pub(crate) fn apply_transaction(
        &mut self,
        trx: &SignedTransaction,
        skip: SkipFlags,
    ) -> Result<ProcessedTransaction, ChainError> {
        self.ensure_running()?;
        let _timer = time_histogram!(TRANSACTION_APPLY_SECONDS);
        let session = self.objects.start_undo_session(true);
        let result = self.apply_transaction_inner(trx, skip);
        self.close_session(session, result.is_ok())?;

        match result {
            Ok(processed) => {
                TRANSACTIONS_APPLIED.inc();
                Ok(processed)
            }
            Err(err) => {
                TRANSACTIONS_REJECTED.with_label_values(&[err.kind().as_str()]).inc();
                if err.is_fatal() {
                    self.halt(&err);
                } else {
                    debug!(kind = err.kind().as_str(), error = %err, "Transaction rejected");
                }
                Err(err)
            }
        }
    }

    fn apply_transaction_inner(
        &mut self,
        trx: &SignedTransaction,
        skip: SkipFlags,
    ) -> Result<ProcessedTransaction, ChainError> {
        let transaction = &trx.transaction;
        let (max_size, max_depth) = {
            let params = self.parameters()?;
            (params.maximum_transaction_size, params.max_authority_depth)
        };

        if !skip.contains(SkipFlags::SKIP_VALIDATE) {
            transaction.validate()?;
            let size = codec::packed_size(trx)?;
            if size > u64::from(max_size) {
                return Err(ChainError::TransactionTooLarge { size, limit: max_size });
            }
        }

        let trx_id = trx.id()?;
        let record_history = !skip.contains(SkipFlags::SKIP_TRANSACTION_DUPE_CHECK);
        if record_history && self.is_known_transaction(&trx_id)? {
            return Err(ChainError::DuplicateTransaction(hex::encode(trx_id)));
        }
        self.check_reference(transaction, skip)?;

        let sign_state = self.verify_signatures(trx, skip, max_depth)?;
        let mut state = TransactionEvaluationState::new(sign_state, skip);
        let prepared = self.evaluate_operations(&mut state, &transaction.operations)?;
        if state.check_authorities {
            if let Some(key) = state.sign_state.unused_keys().next() {
                return Err(ChainError::IrrelevantSignature(key));
            }
        }
        state.operation_results = self.apply_operations(prepared, &transaction.operations)?;
        self.execute_queued_proposals()?;

        if record_history {
            self.create::<TransactionHistoryObject>(|id| TransactionHistoryObject {
                id,
                trx_id,
                expiration: transaction.expiration,
            })?;
        }
        debug!(
            trx_id = %hex::encode(trx_id),
            operations = transaction.operations.len(),
            "Transaction applied"
        );
        Ok(ProcessedTransaction {
            signed: trx.clone(),
            operation_results: state.operation_results,
        })
    }

    fn is_known_transaction(&self, trx_id: &TransactionId) -> Result<bool, ChainError> {
        Ok(self
            .secondary::<TransactionHistoryObject, HistoryById>()?
            .find(trx_id)
            .is_some())
    }

    /// TaPoS and expiration. Expiration is always checked.
    fn check_reference(&self, transaction: &Transaction, skip: SkipFlags) -> Result<(), ChainError> {
        let now = self.head_block_time()?;
        if !skip.contains(SkipFlags::SKIP_TAPOS_CHECK) {
            let summary =
                self.find::<BlockSummaryObject>(BlockSummaryId(u64::from(transaction.ref_block_num)));
            let linked = summary.is_some_and(|summary| {
                summary.block_id.ref_prefix() == transaction.ref_block_prefix
            });
            if !linked {
                return Err(ChainError::TaposMismatch {
                    ref_block_num: transaction.ref_block_num,
                    ref_block_prefix: transaction.ref_block_prefix,
                });
            }
        }

        if transaction.expiration < now {
            return Err(ChainError::Expired {
                expiration: transaction.expiration,
                now,
            });
        }
        let max = now.saturating_add(self.parameters()?.maximum_time_until_expiration);
        if transaction.expiration > max {
            return Err(ChainError::ExpirationTooFar {
                expiration: transaction.expiration,
                max,
            });
        }
        Ok(())
    }

    /// Checks every signature against the chain-bound digest and returns
    /// the signing keys.
    fn verify_signatures(
        &self,
        trx: &SignedTransaction,
        skip: SkipFlags,
        max_depth: u8,
    ) -> Result<SignState, ChainError> {
        if skip.contains(SkipFlags::SKIP_TRANSACTION_SIGNATURES) {
            return Ok(SignState::new(std::iter::empty(), max_depth));
        }
        let digest = trx.transaction.digest(&self.chain_id)?;
        let mut keys = BTreeSet::new();
        for signature in &trx.signatures {
            if !keys.insert(signature.key) {
                return Err(ChainError::DuplicateSignature(signature.key));
            }
            if !self.verifier.verify(&signature.key, &digest, &signature.signature) {
                return Err(ChainError::InvalidSignature(signature.key));
            }
        }
        Ok(SignState::new(keys, max_depth))
    }

    /// Evaluate phase of every operation, in order. Nothing is written.
    pub(crate) fn evaluate_operations(
        &self,
        state: &mut TransactionEvaluationState,
        operations: &[Operation],
    ) -> Result<Vec<PreparedOperation>, ChainError> {
        operations
            .iter()
            .enumerate()
            .map(|(index, op)| {
                self.evaluate_operation(state, op)
                    .map_err(|source| ChainError::Operation {
                        index,
                        operation: op.name(),
                        source: Box::new(source),
                    })
            })
            .collect()
    }

    fn evaluate_operation(
        &self,
        state: &mut TransactionEvaluationState,
        op: &Operation,
    ) -> Result<PreparedOperation, ChainError> {
        if state.check_authorities {
            let mut required = RequiredAuthorities::default();
            op.required_authorities(&mut required);
            state
                .sign_state
                .verify(&required, self, state.is_proposed_trx)?;
        }
        let mut ctx = EvalContext::new(self, state);
        evaluator::evaluate(&mut ctx, op)
    }

    /// Apply phase. Evaluation already accepted every operation, so any
    /// error here is fatal.
    pub(crate) fn apply_operations(
        &mut self,
        prepared: Vec<PreparedOperation>,
        operations: &[Operation],
    ) -> Result<Vec<OperationResult>, ChainError> {
        let mut results = Vec::with_capacity(operations.len());
        for (index, (prepared, op)) in prepared.into_iter().zip(operations).enumerate() {
            let result = match prepared.apply(self, op) {
                Ok(result) => result,
                Err(source) => {
                    self.queued_proposals.clear();
                    return Err(ChainError::ApplyFailed {
                        index,
                        operation: op.name(),
                        source: Box::new(source),
                    });
                }
            };
            OPERATIONS_APPLIED.with_label_values(&[op.name()]).inc();
            results.push(result);
        }
        Ok(results)
    }

    /// Forgets dupe-check records of transactions that expired.
    pub(crate) fn clear_expired_transactions(&mut self) -> Result<(), ChainError> {
        let now = self.head_block_time()?;
        let expired: Vec<_> = self
            .secondary::<TransactionHistoryObject, HistoryByExpiration>()?
            .iter()
            .take_while(|(expiration, _)| *expiration < now)
            .map(|(_, id)| *id)
            .collect();
        for id in expired {
            self.remove::<TransactionHistoryObject>(id)?;
        }
        Ok(())
    }
}
