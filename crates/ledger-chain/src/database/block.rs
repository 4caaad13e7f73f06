//! Block pipeline: push, pop, fork switch, production and replay.

use super::Database;
use crate::domain::{
    block_summary_id, BlockSummaryObject, DynamicGlobalPropertyId, DynamicGlobalPropertyObject,
    GlobalPropertyId, GlobalPropertyObject, LimitOrderObject, OrdersByExpiration, SkipFlags,
};
use crate::errors::ChainError;
use crate::ports::BlockClock;
use ledger_telemetry::{BLOCKS_APPLIED, BLOCKS_POPPED};
use shared_types::{
    codec, BlockHeader, BlockId, ProcessedTransaction, SignedBlock, SignedTransaction, TimePointSec,
    TransactionId,
};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

impl Database {
    /// Applies a block on top of the head. Pending transactions are set
    /// aside for the block and re-applied afterwards, minus those the block
    /// included.
    pub fn push_block(&mut self, block: SignedBlock) -> Result<(), ChainError> {
        self.ensure_running()?;
        let pending = std::mem::take(&mut self.pending);
        self.clear_pending()?;

        let result = self.apply_block_in_session(&block);
        if !self.is_halted() {
            let included = transaction_ids(std::slice::from_ref(&block));
            self.repush(pending.into_iter().map(|p| p.signed), &included);
        }
        result
    }

    fn apply_block_in_session(&mut self, block: &SignedBlock) -> Result<(), ChainError> {
        let session = self.objects.start_undo_session(true);
        match self.apply_block(block, self.skip_flags) {
            Ok(()) => {
                if let Err(err) = self.objects.commit_session(session) {
                    let err = ChainError::from(err);
                    self.halt(&err);
                    return Err(err);
                }
                if self.objects.undo_enabled() {
                    self.recent_blocks.push_back(block.clone());
                }
                while self.recent_blocks.len() > self.config.max_undo_history {
                    self.recent_blocks.pop_front();
                }
                self.update_gauges();
                info!(
                    block_num = block.block_num(),
                    transactions = block.transactions.len(),
                    "Block applied"
                );
                Ok(())
            }
            Err(err) => {
                self.close_session(session, false)?;
                if err.is_fatal() {
                    self.halt(&err);
                } else {
                    warn!(block_num = block.block_num(), error = %err, "Block rejected");
                }
                Err(err)
            }
        }
    }

    /// Applies `block` without opening a session of its own.
    pub fn apply_block(&mut self, block: &SignedBlock, skip: SkipFlags) -> Result<(), ChainError> {
        self.ensure_running()?;
        let block_num = block.block_num();
        let (head_id, head_time) = {
            let head = self.dynamic_global_properties()?;
            (head.head_block_id, head.time)
        };
        if block.header.previous != head_id {
            return Err(ChainError::UnlinkableBlock {
                head: head_id,
                previous: block.header.previous,
            });
        }
        if block.header.timestamp <= head_time {
            return Err(ChainError::InvalidBlockTimestamp {
                timestamp: block.header.timestamp,
                head_time,
            });
        }
        if !skip.contains(SkipFlags::SKIP_MERKLE_CHECK)
            && block.calculate_merkle_root()? != block.header.transaction_merkle_root
        {
            return Err(ChainError::MerkleMismatch);
        }
        if !skip.contains(SkipFlags::SKIP_BLOCK_SIZE_CHECK) {
            let size = codec::packed_size(block)?;
            let limit = self.parameters()?.maximum_block_size;
            if size > u64::from(limit) {
                return Err(ChainError::BlockTooLarge { size, limit });
            }
        }

        // transactions see the previous head time
        for (index, trx) in block.transactions.iter().enumerate() {
            self.apply_transaction(trx, skip)
                .map_err(|source| ChainError::BlockTransaction {
                    block_num,
                    index,
                    source: Box::new(source),
                })?;
        }

        let block_id = block.id()?;
        self.modify::<DynamicGlobalPropertyObject>(DynamicGlobalPropertyId(0), |head| {
            head.head_block_number = block_num;
            head.head_block_id = block_id;
            head.time = block.header.timestamp;
        })?;
        self.update_block_summary(block_num, block_id)?;
        self.apply_pending_parameters(block_num)?;
        self.clear_expired_transactions()?;
        self.clear_expired_proposals()?;
        self.clear_expired_orders()?;
        BLOCKS_APPLIED.inc();
        Ok(())
    }

    fn update_block_summary(&mut self, block_num: u32, block_id: BlockId) -> Result<(), ChainError> {
        let slot = block_summary_id(block_num);
        if self.find::<BlockSummaryObject>(slot).is_some() {
            self.modify::<BlockSummaryObject>(slot, |summary| summary.block_id = block_id)?;
            return Ok(());
        }
        let next = self.index::<BlockSummaryObject>()?.next_id();
        if next != slot {
            return Err(ChainError::Inconsistent(format!(
                "block summary {slot} out of sequence, next free is {next}"
            )));
        }
        self.create::<BlockSummaryObject>(|id| BlockSummaryObject { id, block_id })?;
        Ok(())
    }

    fn apply_pending_parameters(&mut self, block_num: u32) -> Result<(), ChainError> {
        let Some(parameters) = self.global_properties()?.pending_parameters.clone() else {
            return Ok(());
        };
        self.modify::<GlobalPropertyObject>(GlobalPropertyId(0), |global| {
            global.parameters = parameters;
            global.pending_parameters = None;
        })?;
        info!(block_num, "Chain parameters updated");
        Ok(())
    }

    /// Cancels orders whose expiration has passed and refunds the sellers.
    fn clear_expired_orders(&mut self) -> Result<(), ChainError> {
        let now = self.head_block_time()?;
        let expired: Vec<_> = self
            .secondary::<LimitOrderObject, OrdersByExpiration>()?
            .up_to(&now)
            .map(|(_, id)| *id)
            .collect();
        for id in expired {
            let order = self.remove::<LimitOrderObject>(id)?;
            self.credit(order.seller, order.amount_for_sale())?;
            debug!(order = %id, seller = %order.seller, "Expired order refunded");
        }
        Ok(())
    }

    /// Undoes the head block. Pending transactions are dropped.
    pub fn pop_block(&mut self) -> Result<SignedBlock, ChainError> {
        self.ensure_running()?;
        self.clear_pending()?;
        let block = self.recent_blocks.pop_back().ok_or(ChainError::NothingToPop)?;
        if let Err(err) = self.objects.undo_last_revision() {
            let err = ChainError::from(err);
            self.halt(&err);
            return Err(err);
        }
        let head = self.head_block_id()?;
        if head != block.header.previous {
            let err = ChainError::Inconsistent(format!(
                "popped block {} but head is now {head}",
                block.block_num()
            ));
            self.halt(&err);
            return Err(err);
        }
        BLOCKS_POPPED.inc();
        self.update_gauges();
        debug!(block_num = block.block_num(), "Block popped");
        Ok(block)
    }

    /// Replaces the blocks after `branch[0].previous` with `branch`. If a
    /// block of the new branch fails, the old branch is restored and the
    /// error returned. Transactions of the abandoned blocks return to
    /// pending, ahead of those that were already pending.
    pub fn switch_fork(&mut self, branch: Vec<SignedBlock>) -> Result<(), ChainError> {
        self.ensure_running()?;
        let Some(first) = branch.first() else {
            return Ok(());
        };
        let fork_point = first.header.previous;
        let reachable = self.head_block_id()? == fork_point
            || self.recent_blocks.iter().any(|block| block.header.previous == fork_point);
        if !reachable {
            return Err(ChainError::UnknownForkPoint(fork_point));
        }

        let pending = std::mem::take(&mut self.pending);
        self.clear_pending()?;
        let mut popped = Vec::new();
        while self.head_block_id()? != fork_point {
            popped.push(self.pop_block()?);
        }
        // oldest first
        popped.reverse();

        let mut failure = None;
        for (applied, block) in branch.iter().enumerate() {
            if let Err(err) = self.push_block(block.clone()) {
                warn!(
                    block_num = block.block_num(),
                    error = %err,
                    "Fork branch rejected, restoring previous branch"
                );
                failure = Some((applied, err));
                break;
            }
        }

        if let Some((applied, err)) = failure {
            for _ in 0..applied {
                self.pop_block()?;
            }
            for block in popped {
                let block_num = block.block_num();
                if let Err(restore) = self.push_block(block) {
                    let err = ChainError::Inconsistent(format!(
                        "block {block_num} of the previous branch could not be restored: {restore}"
                    ));
                    self.halt(&err);
                    return Err(err);
                }
            }
            self.repush(pending.into_iter().map(|p| p.signed), &BTreeSet::new());
            return Err(err);
        }

        let included = transaction_ids(&branch);
        let orphaned: Vec<_> = popped.into_iter().flat_map(|block| block.transactions).collect();
        let head = self.head_block_id()?;
        info!(
            fork_point = %fork_point,
            head = %head,
            orphaned = orphaned.len(),
            "Switched to fork"
        );
        let resubmitted = orphaned
            .into_iter()
            .chain(pending.into_iter().map(|p| p.signed));
        self.repush(resubmitted, &included);
        Ok(())
    }

    /// Re-applies transactions as pending, skipping those in `exclude`.
    /// Those that no longer apply are dropped.
    fn repush(
        &mut self,
        transactions: impl Iterator<Item = SignedTransaction>,
        exclude: &BTreeSet<TransactionId>,
    ) {
        for trx in transactions {
            let Ok(id) = trx.id() else { continue };
            if exclude.contains(&id) {
                continue;
            }
            if let Err(err) = self.push_transaction(trx) {
                debug!(trx_id = %hex::encode(id), error = %err, "Dropped pending transaction");
            }
        }
    }

    /// Builds a block at `when` from the pending transactions that still
    /// apply and fit, then pushes it.
    pub fn generate_block(&mut self, when: TimePointSec) -> Result<SignedBlock, ChainError> {
        self.ensure_running()?;
        let (head_id, head_time) = {
            let head = self.dynamic_global_properties()?;
            (head.head_block_id, head.time)
        };
        if when <= head_time {
            return Err(ChainError::InvalidBlockTimestamp {
                timestamp: when,
                head_time,
            });
        }
        let max_block_size = u64::from(self.parameters()?.maximum_block_size);

        let pending = std::mem::take(&mut self.pending);
        self.clear_pending()?;
        let mut block = SignedBlock {
            header: BlockHeader {
                previous: head_id,
                timestamp: when,
                transaction_merkle_root: [0; 32],
            },
            transactions: Vec::new(),
        };

        if !self.objects.undo_enabled() {
            self.pending = pending;
            return Err(ChainError::Inconsistent(
                "block production needs undo enabled".into(),
            ));
        }
        let header_size = codec::packed_size(&block)?;
        let trial = self.objects.start_undo_session(true);
        let selected = self.select_transactions(&pending, header_size, max_block_size);
        self.close_session(trial, false)?;
        block.transactions = selected;
        block.header.transaction_merkle_root = block.calculate_merkle_root()?;

        self.pending = pending;
        self.push_block(block.clone())?;
        Ok(block)
    }

    /// Applies pending transactions in order inside the caller's trial
    /// session, keeping those that succeed while the block stays in size.
    fn select_transactions(
        &mut self,
        pending: &[ProcessedTransaction],
        mut block_size: u64,
        max_block_size: u64,
    ) -> Vec<SignedTransaction> {
        let mut selected = Vec::new();
        for processed in pending {
            let Ok(size) = codec::packed_size(&processed.signed) else {
                continue;
            };
            if block_size + size > max_block_size {
                continue;
            }
            match self.apply_transaction(&processed.signed, self.skip_flags) {
                Ok(_) => {
                    block_size += size;
                    selected.push(processed.signed.clone());
                }
                Err(err) => debug!(error = %err, "Pending transaction left out of block"),
            }
            if self.is_halted() {
                break;
            }
        }
        selected
    }

    /// Block at the next slot of `clock`.
    pub fn generate_next_block(&mut self, clock: &dyn BlockClock) -> Result<SignedBlock, ChainError> {
        let head_time = self.head_block_time()?;
        let interval = self.parameters()?.block_interval;
        self.generate_block(clock.next_block_time(head_time, interval))
    }

    /// Applies already validated blocks with undo disabled. The blocks can
    /// no longer be popped afterwards.
    pub fn replay_blocks(&mut self, blocks: &[SignedBlock], skip: SkipFlags) -> Result<(), ChainError> {
        self.ensure_running()?;
        self.clear_pending()?;
        self.objects.disable_undo()?;
        self.recent_blocks.clear();

        let result = self.with_skip_flags(skip, |db| {
            blocks
                .iter()
                .try_for_each(|block| db.apply_block(block, skip))
        });
        self.objects.enable_undo();
        self.update_gauges();

        match result {
            Ok(()) => {
                let head = self.head_block_num()?;
                info!(blocks = blocks.len(), head, "Replay complete");
                Ok(())
            }
            Err(err) => {
                // nothing can be undone with undo disabled
                self.halt(&err);
                Err(err)
            }
        }
    }
}

fn transaction_ids(blocks: &[SignedBlock]) -> BTreeSet<TransactionId> {
    blocks
        .iter()
        .flat_map(|block| &block.transactions)
        .filter_map(|trx| trx.id().ok())
        .collect()
}
