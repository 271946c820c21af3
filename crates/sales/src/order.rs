use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopledger_catalog::ItemId;
use shopledger_core::{
    Aggregate, AggregateRoot, DocumentNumber, DomainError, DomainResult, Money, Quantity,
    checked_product, checked_sum,
};
use shopledger_events::Event;
use shopledger_parties::{CustomerId, EmployeeId};

use crate::pricing::{SalesTotals, TaxRate};

shopledger_core::uuid_id!(
    /// Sales order identifier.
    SalesOrderId, "SalesOrderId"
);

/// Rejection for a completion against a missing or already-completed order.
pub const COMPLETE_REJECTED: &str = "sales order not found or already completed";

/// Sales order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SalesOrderStatus {
    Pending,
    Completed,
}

impl SalesOrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SalesOrderStatus::Pending => "pending",
            SalesOrderStatus::Completed => "completed",
        }
    }
}

impl core::str::FromStr for SalesOrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SalesOrderStatus::Pending),
            "completed" => Ok(SalesOrderStatus::Completed),
            other => Err(DomainError::validation(format!(
                "unknown sales order status: {other}"
            ))),
        }
    }
}

/// Sales order line, priced at the item's selling price when placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    pub line_no: u32,
    pub item_id: ItemId,
    pub assigned_employee_id: EmployeeId,
    pub quantity: Quantity,
    pub unit_price: Money,
    pub line_total: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLineInput {
    pub item_id: Option<ItemId>,
    pub quantity: Option<Quantity>,
    pub assigned_employee_id: Option<EmployeeId>,
}

/// Turn submitted lines into priced order lines.
///
/// `selling_price` returns `None` for unknown items; such lines and lines
/// missing any field are skipped. A line whose total does not fit is refused.
pub fn accept_lines(
    inputs: &[SaleLineInput],
    selling_price: impl Fn(&ItemId) -> Option<Money>,
) -> DomainResult<Vec<SaleLine>> {
    let mut lines = Vec::new();
    for input in inputs {
        let (Some(item_id), Some(quantity), Some(assigned_employee_id)) =
            (input.item_id, input.quantity, input.assigned_employee_id)
        else {
            continue;
        };
        let Some(unit_price) = selling_price(&item_id) else {
            continue;
        };
        let line_no = lines.len() as u32 + 1;
        lines.push(SaleLine {
            line_no,
            item_id,
            assigned_employee_id,
            quantity,
            unit_price,
            line_total: checked_product(quantity, unit_price, format!("line {line_no} total"))?,
        });
    }
    Ok(lines)
}

/// Aggregate root: SalesOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrder {
    pub id: SalesOrderId,
    pub number: DocumentNumber,
    pub customer_id: CustomerId,
    pub employee_id: EmployeeId,
    pub status: SalesOrderStatus,
    pub lines: Vec<SaleLine>,
    pub totals: SalesTotals,
    pub ordered_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub synced: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceSalesOrder {
    pub order_id: SalesOrderId,
    pub number: DocumentNumber,
    pub customer_id: CustomerId,
    pub employee_id: EmployeeId,
    pub lines: Vec<SaleLine>,
    pub discount: Money,
    pub tax_rate: TaxRate,
    pub occurred_at: DateTime<Utc>,
}

impl SalesOrder {
    pub fn place(cmd: PlaceSalesOrder) -> DomainResult<(Self, SalesOrderEvent)> {
        let subtotal = checked_sum(cmd.lines.iter().map(|l| l.line_total), "subtotal")?;
        let totals = SalesTotals::compute(subtotal, cmd.discount, cmd.tax_rate)?;
        let order = Self {
            id: cmd.order_id,
            number: cmd.number,
            customer_id: cmd.customer_id,
            employee_id: cmd.employee_id,
            status: SalesOrderStatus::Pending,
            lines: cmd.lines,
            totals,
            ordered_at: cmd.occurred_at,
            completed_at: None,
            synced: false,
        };
        let event = SalesOrderEvent::Placed {
            order_id: order.id,
            number: order.number.clone(),
            customer_id: order.customer_id,
            total: totals.total,
            occurred_at: cmd.occurred_at,
        };
        Ok((order, event))
    }

    pub fn is_pending(&self) -> bool {
        self.status == SalesOrderStatus::Pending
    }
}

impl AggregateRoot for SalesOrder {
    type Id = SalesOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalesOrderCommand {
    Complete { occurred_at: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalesOrderEvent {
    Placed {
        order_id: SalesOrderId,
        number: DocumentNumber,
        customer_id: CustomerId,
        total: Money,
        occurred_at: DateTime<Utc>,
    },
    /// Sale fulfilled: carries the lines whose quantities leave stock.
    Completed {
        order_id: SalesOrderId,
        number: DocumentNumber,
        customer_id: CustomerId,
        lines: Vec<SaleLine>,
        total: Money,
        occurred_at: DateTime<Utc>,
    },
}

impl Event for SalesOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SalesOrderEvent::Placed { .. } => "sales.order.placed",
            SalesOrderEvent::Completed { .. } => "sales.order.completed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SalesOrderEvent::Placed { occurred_at, .. }
            | SalesOrderEvent::Completed { occurred_at, .. } => *occurred_at,
        }
    }

    fn describe(&self) -> String {
        match self {
            SalesOrderEvent::Placed { number, total, .. } => {
                format!("Created sales order: {number} (total {total})")
            }
            SalesOrderEvent::Completed { number, .. } => {
                format!("Completed sales order: {number}")
            }
        }
    }
}

impl Aggregate for SalesOrder {
    type Command = SalesOrderCommand;
    type Event = SalesOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SalesOrderEvent::Placed { .. } => {}
            SalesOrderEvent::Completed { occurred_at, .. } => {
                self.status = SalesOrderStatus::Completed;
                self.completed_at = Some(*occurred_at);
            }
        }
    }

    fn handle(&self, command: &Self::Command) -> DomainResult<Vec<Self::Event>> {
        match command {
            SalesOrderCommand::Complete { occurred_at } => {
                if !self.is_pending() {
                    return Err(DomainError::not_found_or_invalid_state(COMPLETE_REJECTED));
                }
                Ok(vec![SalesOrderEvent::Completed {
                    order_id: self.id,
                    number: self.number.clone(),
                    customer_id: self.customer_id,
                    lines: self.lines.clone(),
                    total: self.totals.total,
                    occurred_at: *occurred_at,
                }])
            }
        }
    }
}
