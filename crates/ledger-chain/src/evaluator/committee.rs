use super::{EvalContext, Evaluator};
use crate::database::Database;
use crate::domain::{GlobalPropertyId, GlobalPropertyObject};
use crate::errors::ChainError;
use shared_types::{
    CommitteeMemberUpdateGlobalParametersOperation, OperationPayload, OperationResult,
};
use tracing::info;

/// Schedules new chain parameters. They take effect at the end of the
/// block the proposal executes in.
#[derive(Debug, Default)]
pub struct CommitteeUpdateEvaluator;

impl Evaluator for CommitteeUpdateEvaluator {
    type Operation = CommitteeMemberUpdateGlobalParametersOperation;

    fn evaluate(
        &mut self,
        ctx: &mut EvalContext<'_>,
        _op: &CommitteeMemberUpdateGlobalParametersOperation,
    ) -> Result<(), ChainError> {
        if !ctx.state.is_proposed_trx {
            return Err(ChainError::ProposalOnly(
                CommitteeMemberUpdateGlobalParametersOperation::NAME,
            ));
        }
        Ok(())
    }

    fn apply(
        &mut self,
        db: &mut Database,
        op: &CommitteeMemberUpdateGlobalParametersOperation,
    ) -> Result<OperationResult, ChainError> {
        db.modify::<GlobalPropertyObject>(GlobalPropertyId(0), |global| {
            global.pending_parameters = Some(op.new_parameters.clone());
        })?;
        info!("Chain parameter change scheduled for end of block");
        Ok(OperationResult::Void)
    }
}
