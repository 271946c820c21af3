use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use shopledger_core::{DomainError, DomainResult, Entity, Money};
use shopledger_events::Event;
use shopledger_parties::{CustomerId, SupplierId};
use shopledger_purchasing::PurchaseOrderId;
use shopledger_sales::SalesOrderId;

shopledger_core::uuid_id!(
    /// Accounts payable identifier.
    PayableId, "PayableId"
);

shopledger_core::uuid_id!(
    /// Accounts receivable identifier.
    ReceivableId, "ReceivableId"
);

pub const PAYABLE_SETTLE_REJECTED: &str = "payable not found or already paid";
pub const RECEIVABLE_SETTLE_REJECTED: &str = "receivable not found or already paid";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementStatus {
    Pending,
    Paid,
}

impl SettlementStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SettlementStatus::Pending => "pending",
            SettlementStatus::Paid => "paid",
        }
    }
}

impl core::str::FromStr for SettlementStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SettlementStatus::Pending),
            "paid" => Ok(SettlementStatus::Paid),
            other => Err(DomainError::validation(format!(
                "unknown settlement status: {other}"
            ))),
        }
    }
}

/// Credit period granted on payables and receivables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTerms {
    pub days: u32,
}

impl PaymentTerms {
    pub fn net(days: u32) -> Self {
        Self { days }
    }

    pub fn due_from(self, raised_at: DateTime<Utc>) -> DateTime<Utc> {
        raised_at + Duration::days(i64::from(self.days))
    }
}

/// Amount owed to a supplier for a received purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountsPayable {
    pub id: PayableId,
    pub purchase_order_id: PurchaseOrderId,
    pub supplier_id: SupplierId,
    pub amount: Money,
    pub due_date: DateTime<Utc>,
    pub status: SettlementStatus,
    pub raised_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl AccountsPayable {
    pub fn raise(
        id: PayableId,
        purchase_order_id: PurchaseOrderId,
        supplier_id: SupplierId,
        amount: Money,
        terms: PaymentTerms,
        now: DateTime<Utc>,
    ) -> (Self, LedgerEvent) {
        let payable = Self {
            id,
            purchase_order_id,
            supplier_id,
            amount,
            due_date: terms.due_from(now),
            status: SettlementStatus::Pending,
            raised_at: now,
            paid_at: None,
        };
        let event = LedgerEvent::PayableRaised {
            payable_id: id,
            amount,
            due_date: payable.due_date,
            occurred_at: now,
        };
        (payable, event)
    }

    /// Mark paid; only a pending payable can be settled.
    pub fn settle(&mut self, now: DateTime<Utc>) -> DomainResult<LedgerEvent> {
        if self.status != SettlementStatus::Pending {
            return Err(DomainError::not_found_or_invalid_state(PAYABLE_SETTLE_REJECTED));
        }
        self.status = SettlementStatus::Paid;
        self.paid_at = Some(now);
        Ok(LedgerEvent::PayableSettled {
            payable_id: self.id,
            amount: self.amount,
            occurred_at: now,
        })
    }
}

impl Entity for AccountsPayable {
    type Id = PayableId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Amount a customer owes for a completed sales order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountsReceivable {
    pub id: ReceivableId,
    pub sales_order_id: SalesOrderId,
    pub customer_id: CustomerId,
    pub amount: Money,
    pub due_date: DateTime<Utc>,
    pub status: SettlementStatus,
    pub raised_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl AccountsReceivable {
    pub fn raise(
        id: ReceivableId,
        sales_order_id: SalesOrderId,
        customer_id: CustomerId,
        amount: Money,
        terms: PaymentTerms,
        now: DateTime<Utc>,
    ) -> (Self, LedgerEvent) {
        let receivable = Self {
            id,
            sales_order_id,
            customer_id,
            amount,
            due_date: terms.due_from(now),
            status: SettlementStatus::Pending,
            raised_at: now,
            paid_at: None,
        };
        let event = LedgerEvent::ReceivableRaised {
            receivable_id: id,
            amount,
            due_date: receivable.due_date,
            occurred_at: now,
        };
        (receivable, event)
    }

    pub fn settle(&mut self, now: DateTime<Utc>) -> DomainResult<LedgerEvent> {
        if self.status != SettlementStatus::Pending {
            return Err(DomainError::not_found_or_invalid_state(
                RECEIVABLE_SETTLE_REJECTED,
            ));
        }
        self.status = SettlementStatus::Paid;
        self.paid_at = Some(now);
        Ok(LedgerEvent::ReceivableSettled {
            receivable_id: self.id,
            amount: self.amount,
            occurred_at: now,
        })
    }
}

impl Entity for AccountsReceivable {
    type Id = ReceivableId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    PayableRaised {
        payable_id: PayableId,
        amount: Money,
        due_date: DateTime<Utc>,
        occurred_at: DateTime<Utc>,
    },
    PayableSettled {
        payable_id: PayableId,
        amount: Money,
        occurred_at: DateTime<Utc>,
    },
    ReceivableRaised {
        receivable_id: ReceivableId,
        amount: Money,
        due_date: DateTime<Utc>,
        occurred_at: DateTime<Utc>,
    },
    ReceivableSettled {
        receivable_id: ReceivableId,
        amount: Money,
        occurred_at: DateTime<Utc>,
    },
}

impl Event for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::PayableRaised { .. } => "accounting.payable.raised",
            LedgerEvent::PayableSettled { .. } => "accounting.payable.settled",
            LedgerEvent::ReceivableRaised { .. } => "accounting.receivable.raised",
            LedgerEvent::ReceivableSettled { .. } => "accounting.receivable.settled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LedgerEvent::PayableRaised { occurred_at, .. }
            | LedgerEvent::PayableSettled { occurred_at, .. }
            | LedgerEvent::ReceivableRaised { occurred_at, .. }
            | LedgerEvent::ReceivableSettled { occurred_at, .. } => *occurred_at,
        }
    }

    fn describe(&self) -> String {
        match self {
            LedgerEvent::PayableRaised {
                amount, due_date, ..
            } => format!("Raised payable of {amount} due {}", due_date.date_naive()),
            LedgerEvent::PayableSettled { amount, .. } => {
                format!("Marked payable of {amount} as paid")
            }
            LedgerEvent::ReceivableRaised {
                amount, due_date, ..
            } => format!("Raised receivable of {amount} due {}", due_date.date_naive()),
            LedgerEvent::ReceivableSettled { amount, .. } => {
                format!("Marked receivable of {amount} as paid")
            }
        }
    }
}
