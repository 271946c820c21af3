//! Sales orders: placing and completing.

use std::collections::{HashMap, HashSet};

use tracing::{info, instrument, warn};

use shopledger_accounting::{AccountsReceivable, ReceivableId};
use shopledger_core::{DocumentKind, DomainError, Money};
use shopledger_events::execute;
use shopledger_parties::{CustomerId, EmployeeId};
use shopledger_sales::{
    COMPLETE_REJECTED, PlaceSalesOrder, SaleLineInput, SalesOrder, SalesOrderCommand,
    SalesOrderId, accept_lines,
};

use super::alerting::refresh_alert;
use crate::engine::{Engine, WorkflowResult};
use crate::store::{
    CatalogRepository, LedgerRepository, OrderRepository, PartyRepository, StockDecrement, Store,
};

/// Sales order as submitted.
#[derive(Debug, Clone, Default)]
pub struct SalesOrderRequest {
    pub customer_id: Option<CustomerId>,
    /// Employee taking the order.
    pub employee_id: Option<EmployeeId>,
    pub lines: Vec<SaleLineInput>,
    /// Flat amount taken off the subtotal before tax.
    pub discount: Money,
}

fn rejected() -> DomainError {
    DomainError::not_found_or_invalid_state(COMPLETE_REJECTED)
}

impl<S: Store> Engine<S> {
    /// Place a pending sales order priced at current selling prices.
    ///
    /// Fails with `InsufficientStock` before writing anything when a line asks
    /// for more of a known item than is on hand. Each line is checked on its
    /// own; completion re-checks the stock line by line.
    #[instrument(skip(self, request), fields(lines = request.lines.len()))]
    pub fn create_sales_order(&self, request: SalesOrderRequest) -> WorkflowResult<SalesOrder> {
        let customer_id = request
            .customer_id
            .ok_or_else(|| DomainError::validation("customer is required"))?;
        let employee_id = request
            .employee_id
            .ok_or_else(|| DomainError::validation("employee is required"))?;
        let tax_rate = self.policy().tax_rate;

        let result = self.with_document_number(DocumentKind::SalesInvoice, |tx, number, now| {
            if tx.customer(customer_id)?.is_none() {
                return Err(DomainError::validation(format!(
                    "customer {customer_id} does not exist"
                ))
                .into());
            }
            if tx.employee(employee_id)?.is_none() {
                return Err(DomainError::validation(format!(
                    "employee {employee_id} does not exist"
                ))
                .into());
            }

            let mut prices = HashMap::new();
            for input in &request.lines {
                let (Some(item_id), Some(requested)) = (input.item_id, input.quantity) else {
                    continue;
                };
                let Some(item) = tx.item(item_id)? else {
                    continue;
                };
                if !item.has_available(requested) {
                    return Err(DomainError::insufficient_stock(item.name, item.stock).into());
                }
                prices.insert(item_id, item.selling_price);
            }

            // A line assigned to an unknown employee counts as incomplete.
            let mut staff = HashSet::from([employee_id]);
            let mut lines = Vec::with_capacity(request.lines.len());
            for input in &request.lines {
                let mut input = input.clone();
                if let Some(assigned) = input.assigned_employee_id {
                    if !staff.contains(&assigned) {
                        if tx.employee(assigned)?.is_some() {
                            staff.insert(assigned);
                        } else {
                            input.assigned_employee_id = None;
                        }
                    }
                }
                lines.push(input);
            }
            let lines = accept_lines(&lines, |id| prices.get(id).copied())?;

            let (order, placed) = SalesOrder::place(PlaceSalesOrder {
                order_id: SalesOrderId::new(),
                number,
                customer_id,
                employee_id,
                lines,
                discount: request.discount,
                tax_rate,
                occurred_at: now,
            })?;
            tx.insert_sales_order(&order)?;
            Ok((order, placed))
        });

        let (order, placed) = result.inspect_err(|e| {
            warn!(error = %e, "sales order rejected");
        })?;

        info!(order_id = %order.id, number = %order.number, total = %order.totals.total, "sales order placed");
        self.audit(&[placed]);
        Ok(order)
    }

    /// Complete a sale: stock goes down per line and one receivable is raised.
    ///
    /// Each decrement only applies while enough stock is on hand; if any line
    /// no longer fits, nothing is written and the order stays pending.
    #[instrument(skip(self))]
    pub fn complete_sales_order(&self, id: SalesOrderId) -> WorkflowResult<AccountsReceivable> {
        let now = self.now();
        let terms = self.policy().payment_terms;

        let result = self.in_transaction(|tx| {
            let mut order = tx.sales_order(id)?.ok_or_else(rejected)?;
            let events = execute(&mut order, &SalesOrderCommand::Complete { occurred_at: now })?;
            if !tx.transition_sales_order(&order)? {
                return Err(rejected().into());
            }

            for line in &order.lines {
                match tx.decrement_stock_if_available(line.item_id, line.quantity)? {
                    StockDecrement::Applied(_) => refresh_alert(tx, line.item_id, now).map(drop)?,
                    StockDecrement::Insufficient(available) => {
                        let name = tx
                            .item(line.item_id)?
                            .map(|item| item.name)
                            .unwrap_or_else(|| line.item_id.to_string());
                        return Err(DomainError::insufficient_stock(name, available).into());
                    }
                    StockDecrement::Missing => {
                        return Err(DomainError::invariant(format!(
                            "item {} on order {} no longer exists",
                            line.item_id, order.number
                        ))
                        .into());
                    }
                }
            }

            let (receivable, raised) = AccountsReceivable::raise(
                ReceivableId::new(),
                order.id,
                order.customer_id,
                order.totals.total,
                terms,
                now,
            );
            tx.insert_receivable(&receivable)?;
            Ok((receivable, events, raised))
        });

        let (receivable, events, raised) = result.inspect_err(|e| {
            warn!(order_id = %id, error = %e, "sales order not completed");
        })?;

        info!(order_id = %id, receivable_id = %receivable.id, amount = %receivable.amount, "sales order completed");
        self.audit(&events);
        self.audit(&[raised]);
        Ok(receivable)
    }

    pub fn sales_order(&self, id: SalesOrderId) -> WorkflowResult<Option<SalesOrder>> {
        self.in_transaction(|tx| Ok(tx.sales_order(id)?))
    }

    pub fn list_sales_orders(&self) -> WorkflowResult<Vec<SalesOrder>> {
        self.in_transaction(|tx| Ok(tx.sales_orders()?))
    }
}
