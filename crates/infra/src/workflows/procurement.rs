//! Purchase orders: placing and receiving.

use std::collections::HashSet;

use tracing::{info, instrument, warn};

use shopledger_accounting::{AccountsPayable, PayableId};
use shopledger_core::{DocumentKind, DomainError};
use shopledger_events::execute;
use shopledger_parties::SupplierId;
use shopledger_purchasing::{
    PlacePurchaseOrder, PurchaseLineInput, PurchaseOrder, PurchaseOrderCommand, PurchaseOrderId,
    RECEIVE_REJECTED, accept_lines,
};

use super::alerting::refresh_alert;
use crate::engine::{Engine, WorkflowResult};
use crate::store::{CatalogRepository, LedgerRepository, OrderRepository, PartyRepository, Store};

/// Purchase order as submitted.
#[derive(Debug, Clone, Default)]
pub struct PurchaseOrderRequest {
    pub supplier_id: Option<SupplierId>,
    pub lines: Vec<PurchaseLineInput>,
}

fn rejected() -> DomainError {
    DomainError::not_found_or_invalid_state(RECEIVE_REJECTED)
}

impl<S: Store> Engine<S> {
    /// Place a pending purchase order.
    ///
    /// Incomplete lines and lines for unknown items are dropped; the total is
    /// fixed from what remains.
    #[instrument(skip(self, request), fields(lines = request.lines.len()))]
    pub fn create_purchase_order(
        &self,
        request: PurchaseOrderRequest,
    ) -> WorkflowResult<PurchaseOrder> {
        let supplier_id = request
            .supplier_id
            .ok_or_else(|| DomainError::validation("supplier is required"))?;

        let (order, placed) =
            self.with_document_number(DocumentKind::PurchaseOrder, |tx, number, now| {
                if tx.supplier(supplier_id)?.is_none() {
                    return Err(DomainError::validation(format!(
                        "supplier {supplier_id} does not exist"
                    ))
                    .into());
                }
                let mut known = HashSet::new();
                for item_id in request.lines.iter().filter_map(|l| l.item_id) {
                    if tx.item(item_id)?.is_some() {
                        known.insert(item_id);
                    }
                }
                let lines = accept_lines(&request.lines, |id| known.contains(id))?;

                let (order, placed) = PurchaseOrder::place(PlacePurchaseOrder {
                    order_id: PurchaseOrderId::new(),
                    number,
                    supplier_id,
                    lines,
                    occurred_at: now,
                })?;
                tx.insert_purchase_order(&order)?;
                Ok((order, placed))
            })?;

        info!(order_id = %order.id, number = %order.number, total = %order.total_amount, "purchase order placed");
        self.audit(&[placed]);
        Ok(order)
    }

    /// Receive goods: stock goes up per line and one payable is raised.
    ///
    /// Rejected with no change when the order is missing or no longer pending.
    #[instrument(skip(self))]
    pub fn receive_purchase_order(&self, id: PurchaseOrderId) -> WorkflowResult<AccountsPayable> {
        let now = self.now();
        let terms = self.policy().payment_terms;

        let result = self.in_transaction(|tx| {
            let mut order = tx.purchase_order(id)?.ok_or_else(rejected)?;
            let events = execute(&mut order, &PurchaseOrderCommand::Receive { occurred_at: now })?;
            if !tx.transition_purchase_order(&order)? {
                return Err(rejected().into());
            }

            for line in &order.lines {
                tx.adjust_stock(line.item_id, line.quantity)?.ok_or_else(|| {
                    DomainError::invariant(format!(
                        "item {} on order {} no longer exists",
                        line.item_id, order.number
                    ))
                })?;
                refresh_alert(tx, line.item_id, now)?;
            }

            let (payable, raised) = AccountsPayable::raise(
                PayableId::new(),
                order.id,
                order.supplier_id,
                order.total_amount,
                terms,
                now,
            );
            tx.insert_payable(&payable)?;
            Ok((payable, events, raised))
        });

        let (payable, events, raised) = result.inspect_err(|e| {
            warn!(order_id = %id, error = %e, "purchase order not received");
        })?;

        info!(order_id = %id, payable_id = %payable.id, amount = %payable.amount, "purchase order received");
        self.audit(&events);
        self.audit(&[raised]);
        Ok(payable)
    }

    pub fn purchase_order(&self, id: PurchaseOrderId) -> WorkflowResult<Option<PurchaseOrder>> {
        self.in_transaction(|tx| Ok(tx.purchase_order(id)?))
    }

    pub fn list_purchase_orders(&self) -> WorkflowResult<Vec<PurchaseOrder>> {
        self.in_transaction(|tx| Ok(tx.purchase_orders()?))
    }
}
