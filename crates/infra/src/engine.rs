//! Workflow engine: one transaction per operation.
//!
//! ```text
//! call
//!   ↓
//! 1. begin a unit of work
//!   ↓
//! 2. load state, run the pure domain rule (handle/apply), persist
//!   ↓
//! 3. commit (any error before this drops the unit of work: rollback)
//!   ↓
//! 4. record audit entries for the committed events
//! ```
//!
//! The operations themselves live in [`crate::workflows`], one module per
//! area, all as methods on [`Engine`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::warn;

use shopledger_accounting::PaymentTerms;
use shopledger_core::{
    Decimal, DocumentKind, DocumentNumber, DomainError, Quantity, out_of_range,
};
use shopledger_events::{AuditEntry, AuditSink, Event, TracingAuditSink};
use shopledger_reconciliation::LedgerError;
use shopledger_sales::TaxRate;

use crate::clock::{Clock, SystemClock};
use crate::numbering::{DailySequence, DocumentNumbers};
use crate::store::{OrderRepository, Store, StoreError, UnitOfWork, constraints};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The external ledger could not be read.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("persistence failure: {0}")]
    PersistenceFailure(StoreError),
}

impl From<StoreError> for WorkflowError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::DuplicateKey { constraint } => {
                WorkflowError::Domain(DomainError::duplicate_key(constraint))
            }
            StoreError::OutOfRange { what } => WorkflowError::Domain(out_of_range(what)),
            other => WorkflowError::PersistenceFailure(other),
        }
    }
}

impl WorkflowError {
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            WorkflowError::Domain(e) => Some(e),
            _ => None,
        }
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Shop-wide business settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessPolicy {
    pub tax_rate: TaxRate,
    pub payment_terms: PaymentTerms,
    pub default_min_stock: Quantity,
    pub number_attempts: u32,
}

impl Default for BusinessPolicy {
    fn default() -> Self {
        Self {
            tax_rate: TaxRate::GST,
            payment_terms: PaymentTerms::net(30),
            default_min_stock: Decimal::from(5),
            number_attempts: 5,
        }
    }
}

pub struct Engine<S> {
    store: S,
    clock: Arc<dyn Clock>,
    numbers: Arc<dyn DocumentNumbers>,
    audit: Arc<dyn AuditSink>,
    policy: BusinessPolicy,
}

impl<S> Engine<S> {
    /// Engine on the system clock, daily document sequence and tracing audit.
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            numbers: Arc::new(DailySequence),
            audit: Arc::new(TracingAuditSink),
            policy: BusinessPolicy::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_numbers(mut self, numbers: Arc<dyn DocumentNumbers>) -> Self {
        self.numbers = numbers;
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_policy(mut self, policy: BusinessPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> &BusinessPolicy {
        &self.policy
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn audit<E: Event>(&self, events: &[E]) {
        for event in events {
            self.audit.record(AuditEntry::from_event(event));
        }
    }

    pub(crate) fn audit_entry(&self, entry: AuditEntry) {
        self.audit.record(entry);
    }
}

impl<S: Store> Engine<S> {
    /// Run `work` in one unit of work: committed when it returns `Ok`,
    /// rolled back otherwise.
    pub(crate) fn in_transaction<'s, T>(
        &'s self,
        work: impl FnOnce(&mut S::Tx<'s>) -> WorkflowResult<T>,
    ) -> WorkflowResult<T> {
        let mut tx = self.store.begin()?;
        let value = work(&mut tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Run `work` with a freshly issued document number.
    ///
    /// A collision on the number's unique constraint aborts the whole unit of
    /// work; it is then retried in a new one, up to `number_attempts` times.
    pub(crate) fn with_document_number<'s, T>(
        &'s self,
        kind: DocumentKind,
        work: impl Fn(&mut S::Tx<'s>, DocumentNumber, DateTime<Utc>) -> WorkflowResult<T>,
    ) -> WorkflowResult<T> {
        let constraint = match kind {
            DocumentKind::PurchaseOrder => constraints::PURCHASE_ORDER_NUMBER,
            DocumentKind::SalesInvoice => constraints::SALES_ORDER_NUMBER,
        };
        let mut attempt = 1;
        loop {
            let now = self.now();
            let result = self.in_transaction(|tx| {
                let issued_today = tx.documents_issued_on(kind, now.date_naive())?;
                let number = self.numbers.next(kind, now, issued_today)?;
                work(tx, number, now)
            });
            match result {
                Err(WorkflowError::Domain(DomainError::DuplicateKey(taken)))
                    if taken == constraint && attempt < self.policy.number_attempts =>
                {
                    warn!(?kind, attempt, "document number already taken, retrying");
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}
