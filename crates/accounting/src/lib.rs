//! Accounting module (payables and receivables raised by orders).
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns.

pub mod ledger;

pub use ledger::{
    AccountsPayable, AccountsReceivable, LedgerEvent, PAYABLE_SETTLE_REJECTED, PayableId,
    PaymentTerms, RECEIVABLE_SETTLE_REJECTED, ReceivableId, SettlementStatus,
};
