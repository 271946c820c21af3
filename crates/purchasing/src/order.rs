use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopledger_catalog::ItemId;
use shopledger_core::{
    Aggregate, AggregateRoot, DocumentNumber, DomainError, DomainResult, Money, Quantity,
    checked_product, checked_sum,
};
use shopledger_events::Event;
use shopledger_parties::SupplierId;

shopledger_core::uuid_id!(
    /// Purchase order identifier.
    PurchaseOrderId, "PurchaseOrderId"
);

/// Rejection for a receive against a missing or already-received order.
pub const RECEIVE_REJECTED: &str = "purchase order not found or already received";

/// Purchase order status lifecycle: `pending` until goods are received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseOrderStatus {
    Pending,
    Received,
}

impl PurchaseOrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PurchaseOrderStatus::Pending => "pending",
            PurchaseOrderStatus::Received => "received",
        }
    }
}

impl core::str::FromStr for PurchaseOrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PurchaseOrderStatus::Pending),
            "received" => Ok(PurchaseOrderStatus::Received),
            other => Err(DomainError::validation(format!(
                "unknown purchase order status: {other}"
            ))),
        }
    }
}

/// Purchase order line with its frozen total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLine {
    pub line_no: u32,
    pub item_id: ItemId,
    pub quantity: Quantity,
    pub unit_cost: Money,
    pub line_total: Money,
}

/// Raw line as submitted; any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLineInput {
    pub item_id: Option<ItemId>,
    pub quantity: Option<Quantity>,
    pub unit_cost: Option<Money>,
}

/// Turn submitted lines into order lines.
///
/// Lines missing any field, or naming an item for which `item_exists` is
/// false, are skipped without error. Quantities and costs are taken as given,
/// but a line whose total does not fit a decimal is refused.
pub fn accept_lines(
    inputs: &[PurchaseLineInput],
    item_exists: impl Fn(&ItemId) -> bool,
) -> DomainResult<Vec<PurchaseLine>> {
    let mut lines = Vec::new();
    for input in inputs {
        let (Some(item_id), Some(quantity), Some(unit_cost)) =
            (input.item_id, input.quantity, input.unit_cost)
        else {
            continue;
        };
        if !item_exists(&item_id) {
            continue;
        }
        let line_no = lines.len() as u32 + 1;
        lines.push(PurchaseLine {
            line_no,
            item_id,
            quantity,
            unit_cost,
            line_total: checked_product(quantity, unit_cost, format!("line {line_no} total"))?,
        });
    }
    Ok(lines)
}

/// Aggregate root: PurchaseOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: PurchaseOrderId,
    pub number: DocumentNumber,
    pub supplier_id: SupplierId,
    pub status: PurchaseOrderStatus,
    pub lines: Vec<PurchaseLine>,
    pub total_amount: Money,
    pub ordered_at: DateTime<Utc>,
    pub received_at: Option<DateTime<Utc>>,
    pub synced: bool,
}

/// Input for placing a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacePurchaseOrder {
    pub order_id: PurchaseOrderId,
    pub number: DocumentNumber,
    pub supplier_id: SupplierId,
    pub lines: Vec<PurchaseLine>,
    pub occurred_at: DateTime<Utc>,
}

impl PurchaseOrder {
    /// Place a pending order; the total is fixed from the accepted lines.
    pub fn place(cmd: PlacePurchaseOrder) -> DomainResult<(Self, PurchaseOrderEvent)> {
        let total_amount = checked_sum(cmd.lines.iter().map(|l| l.line_total), "order total")?;
        let order = Self {
            id: cmd.order_id,
            number: cmd.number,
            supplier_id: cmd.supplier_id,
            status: PurchaseOrderStatus::Pending,
            lines: cmd.lines,
            total_amount,
            ordered_at: cmd.occurred_at,
            received_at: None,
            synced: false,
        };
        let event = PurchaseOrderEvent::Placed {
            order_id: order.id,
            number: order.number.clone(),
            supplier_id: order.supplier_id,
            total_amount,
            occurred_at: cmd.occurred_at,
        };
        Ok((order, event))
    }

    pub fn is_pending(&self) -> bool {
        self.status == PurchaseOrderStatus::Pending
    }
}

impl AggregateRoot for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderCommand {
    Receive { occurred_at: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderEvent {
    Placed {
        order_id: PurchaseOrderId,
        number: DocumentNumber,
        supplier_id: SupplierId,
        total_amount: Money,
        occurred_at: DateTime<Utc>,
    },
    /// Goods arrived: carries the lines whose quantities go into stock.
    Received {
        order_id: PurchaseOrderId,
        number: DocumentNumber,
        supplier_id: SupplierId,
        lines: Vec<PurchaseLine>,
        total_amount: Money,
        occurred_at: DateTime<Utc>,
    },
}

impl Event for PurchaseOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PurchaseOrderEvent::Placed { .. } => "purchasing.order.placed",
            PurchaseOrderEvent::Received { .. } => "purchasing.order.received",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PurchaseOrderEvent::Placed { occurred_at, .. }
            | PurchaseOrderEvent::Received { occurred_at, .. } => *occurred_at,
        }
    }

    fn describe(&self) -> String {
        match self {
            PurchaseOrderEvent::Placed {
                number,
                total_amount,
                ..
            } => format!("Created purchase order: {number} (total {total_amount})"),
            PurchaseOrderEvent::Received { number, .. } => {
                format!("Received purchase order: {number}")
            }
        }
    }
}

impl Aggregate for PurchaseOrder {
    type Command = PurchaseOrderCommand;
    type Event = PurchaseOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PurchaseOrderEvent::Placed { .. } => {}
            PurchaseOrderEvent::Received { occurred_at, .. } => {
                self.status = PurchaseOrderStatus::Received;
                self.received_at = Some(*occurred_at);
            }
        }
    }

    fn handle(&self, command: &Self::Command) -> DomainResult<Vec<Self::Event>> {
        match command {
            PurchaseOrderCommand::Receive { occurred_at } => {
                if !self.is_pending() {
                    return Err(DomainError::not_found_or_invalid_state(RECEIVE_REJECTED));
                }
                Ok(vec![PurchaseOrderEvent::Received {
                    order_id: self.id,
                    number: self.number.clone(),
                    supplier_id: self.supplier_id,
                    lines: self.lines.clone(),
                    total_amount: self.total_amount,
                    occurred_at: *occurred_at,
                }])
            }
        }
    }
}
