use tracing::{info, instrument, warn};

use shopledger_accounting::{
    AccountsPayable, AccountsReceivable, PAYABLE_SETTLE_REJECTED, PayableId,
    RECEIVABLE_SETTLE_REJECTED, ReceivableId,
};
use shopledger_core::DomainError;

use crate::engine::{Engine, WorkflowResult};
use crate::store::{LedgerRepository, Store};

impl<S: Store> Engine<S> {
    #[instrument(skip(self))]
    pub fn mark_payable_paid(&self, id: PayableId) -> WorkflowResult<AccountsPayable> {
        let now = self.now();
        let rejected = || DomainError::not_found_or_invalid_state(PAYABLE_SETTLE_REJECTED);

        let (payable, settled) = self
            .in_transaction(|tx| {
                let mut payable = tx.payable(id)?.ok_or_else(rejected)?;
                let settled = payable.settle(now)?;
                if !tx.settle_payable(id, now)? {
                    return Err(rejected().into());
                }
                Ok((payable, settled))
            })
            .inspect_err(|e| warn!(payable_id = %id, error = %e, "payable not settled"))?;

        info!(payable_id = %id, amount = %payable.amount, "payable settled");
        self.audit(&[settled]);
        Ok(payable)
    }

    #[instrument(skip(self))]
    pub fn mark_receivable_paid(&self, id: ReceivableId) -> WorkflowResult<AccountsReceivable> {
        let now = self.now();
        let rejected = || DomainError::not_found_or_invalid_state(RECEIVABLE_SETTLE_REJECTED);

        let (receivable, settled) = self
            .in_transaction(|tx| {
                let mut receivable = tx.receivable(id)?.ok_or_else(rejected)?;
                let settled = receivable.settle(now)?;
                if !tx.settle_receivable(id, now)? {
                    return Err(rejected().into());
                }
                Ok((receivable, settled))
            })
            .inspect_err(|e| warn!(receivable_id = %id, error = %e, "receivable not settled"))?;

        info!(receivable_id = %id, amount = %receivable.amount, "receivable settled");
        self.audit(&[settled]);
        Ok(receivable)
    }

    /// Payables ordered by due date.
    pub fn list_payables(&self) -> WorkflowResult<Vec<AccountsPayable>> {
        self.in_transaction(|tx| Ok(tx.payables()?))
    }

    pub fn list_receivables(&self) -> WorkflowResult<Vec<AccountsReceivable>> {
        self.in_transaction(|tx| Ok(tx.receivables()?))
    }
}
