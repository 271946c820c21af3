use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};

use shopledger_accounting::{
    AccountsPayable, AccountsReceivable, PayableId, ReceivableId, SettlementStatus,
};
use shopledger_catalog::{AlertAssessment, AlertId, Item, ItemId, Sku, StockAlert};
use shopledger_core::{DocumentKind, DocumentNumber, ExternalId, Quantity};
use shopledger_parties::{
    Customer, CustomerId, Employee, EmployeeId, EmployeeTask, Supplier, SupplierId, TaskId,
    TaskStatus,
};
use shopledger_purchasing::{PurchaseOrder, PurchaseOrderId};
use shopledger_reconciliation::{SyncCounts, SyncLogEntry};
use shopledger_sales::{SalesOrder, SalesOrderId};

use super::{
    AlertRepository, CatalogRepository, LedgerRepository, OrderRepository, OrderReference,
    PartyRepository, StockDecrement, Store, StoreError, StoreResult, SyncLogRepository,
    SyncedRecord, UnitOfWork, constraints,
};

#[derive(Debug, Clone, Default)]
struct State {
    items: BTreeMap<ItemId, Item>,
    alerts: BTreeMap<AlertId, StockAlert>,
    suppliers: BTreeMap<SupplierId, Supplier>,
    customers: BTreeMap<CustomerId, Customer>,
    employees: BTreeMap<EmployeeId, Employee>,
    tasks: BTreeMap<TaskId, EmployeeTask>,
    purchase_orders: BTreeMap<PurchaseOrderId, PurchaseOrder>,
    sales_orders: BTreeMap<SalesOrderId, SalesOrder>,
    payables: BTreeMap<PayableId, AccountsPayable>,
    receivables: BTreeMap<ReceivableId, AccountsReceivable>,
    sync_log: Vec<SyncLogEntry>,
}

/// In-memory store.
///
/// Intended for tests/dev. A transaction holds the store lock for its whole
/// lifetime and works on a private copy of the state, so transactions are
/// serialised and a rollback simply discards the copy.
///
/// Committed state is only ever replaced whole, so a transaction that
/// panicked cannot have left it half-written and a poisoned lock is reused.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for InMemoryStore {
    type Tx<'a> = InMemoryTx<'a>;

    fn begin(&self) -> StoreResult<InMemoryTx<'_>> {
        let guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let work = guard.clone();
        Ok(InMemoryTx { guard, work })
    }
}

pub struct InMemoryTx<'a> {
    guard: MutexGuard<'a, State>,
    work: State,
}

impl UnitOfWork for InMemoryTx<'_> {
    fn commit(mut self) -> StoreResult<()> {
        *self.guard = std::mem::take(&mut self.work);
        Ok(())
    }
}

fn sorted_by<T, K: Ord>(values: impl Iterator<Item = T>, key: impl Fn(&T) -> K) -> Vec<T> {
    let mut out: Vec<T> = values.collect();
    out.sort_by_key(|v| key(v));
    out
}

/// Overwrite an existing record; false when there is none.
fn replace<K: Ord, V: Clone>(records: &mut BTreeMap<K, V>, id: K, value: &V) -> bool {
    match records.get_mut(&id) {
        Some(stored) => {
            *stored = value.clone();
            true
        }
        None => false,
    }
}

fn issued_on(number: &DocumentNumber, kind: DocumentKind, day: NaiveDate) -> bool {
    let prefix = format!("{}{}", kind.prefix(), day.format("%Y%m%d"));
    number.as_str().starts_with(&prefix)
}

impl CatalogRepository for InMemoryTx<'_> {
    fn item(&mut self, id: ItemId) -> StoreResult<Option<Item>> {
        Ok(self.work.items.get(&id).cloned())
    }

    fn item_by_sku(&mut self, sku: &Sku) -> StoreResult<Option<Item>> {
        Ok(self.work.items.values().find(|i| &i.sku == sku).cloned())
    }

    fn item_by_external_id(&mut self, external_id: &ExternalId) -> StoreResult<Option<Item>> {
        Ok(self
            .work
            .items
            .values()
            .find(|i| i.sync.external_id.as_ref() == Some(external_id))
            .cloned())
    }

    fn items(&mut self) -> StoreResult<Vec<Item>> {
        Ok(sorted_by(self.work.items.values().cloned(), |i| {
            i.sku.as_str().to_string()
        }))
    }

    fn insert_item(&mut self, item: &Item) -> StoreResult<()> {
        if self.work.items.values().any(|i| i.sku == item.sku) {
            return Err(StoreError::duplicate(constraints::ITEM_SKU));
        }
        self.work.items.insert(item.id, item.clone());
        Ok(())
    }

    fn update_item(&mut self, item: &Item) -> StoreResult<bool> {
        if self
            .work
            .items
            .values()
            .any(|i| i.sku == item.sku && i.id != item.id)
        {
            return Err(StoreError::duplicate(constraints::ITEM_SKU));
        }
        Ok(replace(&mut self.work.items, item.id, item))
    }

    fn delete_item(&mut self, id: ItemId) -> StoreResult<bool> {
        self.work.alerts.retain(|_, a| a.item_id != id);
        Ok(self.work.items.remove(&id).is_some())
    }

    fn adjust_stock(&mut self, id: ItemId, delta: Quantity) -> StoreResult<Option<Quantity>> {
        let Some(item) = self.work.items.get_mut(&id) else {
            return Ok(None);
        };
        item.stock = item
            .stock
            .checked_add(delta)
            .ok_or_else(|| StoreError::out_of_range(format!("stock of {}", item.sku)))?;
        Ok(Some(item.stock))
    }

    fn decrement_stock_if_available(
        &mut self,
        id: ItemId,
        quantity: Quantity,
    ) -> StoreResult<StockDecrement> {
        let Some(item) = self.work.items.get_mut(&id) else {
            return Ok(StockDecrement::Missing);
        };
        if item.stock < quantity {
            return Ok(StockDecrement::Insufficient(item.stock));
        }
        item.stock = item
            .stock
            .checked_sub(quantity)
            .ok_or_else(|| StoreError::out_of_range(format!("stock of {}", item.sku)))?;
        Ok(StockDecrement::Applied(item.stock))
    }

    fn unsynced_items(&mut self) -> StoreResult<Vec<Item>> {
        Ok(sorted_by(
            self.work.items.values().filter(|i| !i.sync.synced).cloned(),
            |i| i.sku.as_str().to_string(),
        ))
    }

    fn mark_item_synced(&mut self, id: ItemId) -> StoreResult<bool> {
        Ok(match self.work.items.get_mut(&id) {
            Some(item) => {
                item.sync.synced = true;
                true
            }
            None => false,
        })
    }
}

impl AlertRepository for InMemoryTx<'_> {
    fn set_unresolved_alert(
        &mut self,
        item_id: ItemId,
        assessment: Option<&AlertAssessment>,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut kept = false;
        self.work.alerts.retain(|_, alert| {
            if alert.item_id != item_id || alert.resolved {
                return true;
            }
            match assessment {
                Some(a) if a.kind == alert.kind && !kept => {
                    alert.message = a.message.clone();
                    kept = true;
                    true
                }
                _ => false,
            }
        });
        if let (Some(a), false) = (assessment, kept) {
            let alert = StockAlert {
                id: AlertId::new(),
                item_id,
                kind: a.kind,
                message: a.message.clone(),
                created_at: now,
                resolved: false,
            };
            self.work.alerts.insert(alert.id, alert);
        }
        Ok(())
    }

    fn unresolved_alerts(&mut self) -> StoreResult<Vec<StockAlert>> {
        Ok(sorted_by(
            self.work.alerts.values().filter(|a| !a.resolved).cloned(),
            |a| a.created_at,
        ))
    }

    fn resolve_alert(&mut self, id: AlertId) -> StoreResult<bool> {
        Ok(match self.work.alerts.get_mut(&id) {
            Some(alert) if !alert.resolved => {
                alert.resolved = true;
                true
            }
            _ => false,
        })
    }

    fn purge_resolved_alerts(&mut self) -> StoreResult<u64> {
        let before = self.work.alerts.len();
        self.work.alerts.retain(|_, a| !a.resolved);
        Ok((before - self.work.alerts.len()) as u64)
    }
}

impl PartyRepository for InMemoryTx<'_> {
    fn supplier(&mut self, id: SupplierId) -> StoreResult<Option<Supplier>> {
        Ok(self.work.suppliers.get(&id).cloned())
    }

    fn supplier_by_name(&mut self, name: &str) -> StoreResult<Option<Supplier>> {
        Ok(self.work.suppliers.values().find(|s| s.name == name).cloned())
    }

    fn supplier_by_external_id(
        &mut self,
        external_id: &ExternalId,
    ) -> StoreResult<Option<Supplier>> {
        Ok(self
            .work
            .suppliers
            .values()
            .find(|s| s.sync.external_id.as_ref() == Some(external_id))
            .cloned())
    }

    fn suppliers(&mut self) -> StoreResult<Vec<Supplier>> {
        Ok(sorted_by(self.work.suppliers.values().cloned(), |s| s.name.clone()))
    }

    fn insert_supplier(&mut self, supplier: &Supplier) -> StoreResult<()> {
        self.work.suppliers.insert(supplier.id, supplier.clone());
        Ok(())
    }

    fn update_supplier(&mut self, supplier: &Supplier) -> StoreResult<bool> {
        Ok(replace(&mut self.work.suppliers, supplier.id, supplier))
    }

    fn delete_supplier(&mut self, id: SupplierId) -> StoreResult<bool> {
        Ok(self.work.suppliers.remove(&id).is_some())
    }

    fn unsynced_suppliers(&mut self) -> StoreResult<Vec<Supplier>> {
        Ok(sorted_by(
            self.work.suppliers.values().filter(|s| !s.sync.synced).cloned(),
            |s| s.name.clone(),
        ))
    }

    fn mark_supplier_synced(&mut self, id: SupplierId) -> StoreResult<bool> {
        Ok(match self.work.suppliers.get_mut(&id) {
            Some(supplier) => {
                supplier.sync.synced = true;
                true
            }
            None => false,
        })
    }

    fn customer(&mut self, id: CustomerId) -> StoreResult<Option<Customer>> {
        Ok(self.work.customers.get(&id).cloned())
    }

    fn customer_by_name(&mut self, name: &str) -> StoreResult<Option<Customer>> {
        Ok(self.work.customers.values().find(|c| c.name == name).cloned())
    }

    fn customer_by_external_id(
        &mut self,
        external_id: &ExternalId,
    ) -> StoreResult<Option<Customer>> {
        Ok(self
            .work
            .customers
            .values()
            .find(|c| c.sync.external_id.as_ref() == Some(external_id))
            .cloned())
    }

    fn customers(&mut self) -> StoreResult<Vec<Customer>> {
        Ok(sorted_by(self.work.customers.values().cloned(), |c| c.name.clone()))
    }

    fn insert_customer(&mut self, customer: &Customer) -> StoreResult<()> {
        self.work.customers.insert(customer.id, customer.clone());
        Ok(())
    }

    fn update_customer(&mut self, customer: &Customer) -> StoreResult<bool> {
        Ok(replace(&mut self.work.customers, customer.id, customer))
    }

    fn delete_customer(&mut self, id: CustomerId) -> StoreResult<bool> {
        Ok(self.work.customers.remove(&id).is_some())
    }

    fn unsynced_customers(&mut self) -> StoreResult<Vec<Customer>> {
        Ok(sorted_by(
            self.work.customers.values().filter(|c| !c.sync.synced).cloned(),
            |c| c.name.clone(),
        ))
    }

    fn mark_customer_synced(&mut self, id: CustomerId) -> StoreResult<bool> {
        Ok(match self.work.customers.get_mut(&id) {
            Some(customer) => {
                customer.sync.synced = true;
                true
            }
            None => false,
        })
    }

    fn employee(&mut self, id: EmployeeId) -> StoreResult<Option<Employee>> {
        Ok(self.work.employees.get(&id).cloned())
    }

    fn employees(&mut self) -> StoreResult<Vec<Employee>> {
        Ok(sorted_by(self.work.employees.values().cloned(), |e| e.name.clone()))
    }

    fn insert_employee(&mut self, employee: &Employee) -> StoreResult<()> {
        self.work.employees.insert(employee.id, employee.clone());
        Ok(())
    }

    fn update_employee(&mut self, employee: &Employee) -> StoreResult<bool> {
        Ok(replace(&mut self.work.employees, employee.id, employee))
    }

    fn delete_employee(&mut self, id: EmployeeId) -> StoreResult<bool> {
        self.work.tasks.retain(|_, t| t.employee_id != id);
        Ok(self.work.employees.remove(&id).is_some())
    }

    fn insert_task(&mut self, task: &EmployeeTask) -> StoreResult<()> {
        self.work.tasks.insert(task.id, task.clone());
        Ok(())
    }

    fn task(&mut self, id: TaskId) -> StoreResult<Option<EmployeeTask>> {
        Ok(self.work.tasks.get(&id).cloned())
    }

    fn tasks(&mut self) -> StoreResult<Vec<EmployeeTask>> {
        Ok(sorted_by(self.work.tasks.values().cloned(), |t| t.assigned_at))
    }

    fn set_task_status(&mut self, id: TaskId, status: TaskStatus) -> StoreResult<bool> {
        Ok(match self.work.tasks.get_mut(&id) {
            Some(task) => {
                task.status = status;
                true
            }
            None => false,
        })
    }

    fn delete_task(&mut self, id: TaskId) -> StoreResult<bool> {
        Ok(self.work.tasks.remove(&id).is_some())
    }
}

impl OrderRepository for InMemoryTx<'_> {
    fn documents_issued_on(&mut self, kind: DocumentKind, day: NaiveDate) -> StoreResult<u32> {
        let count = match kind {
            DocumentKind::PurchaseOrder => self
                .work
                .purchase_orders
                .values()
                .filter(|o| issued_on(&o.number, kind, day))
                .count(),
            DocumentKind::SalesInvoice => self
                .work
                .sales_orders
                .values()
                .filter(|o| issued_on(&o.number, kind, day))
                .count(),
        };
        Ok(count as u32)
    }

    fn order_references(&mut self, reference: OrderReference) -> StoreResult<u64> {
        let purchases = self.work.purchase_orders.values().filter(|o| match reference {
            OrderReference::Item(id) => o.lines.iter().any(|l| l.item_id == id),
            OrderReference::Supplier(id) => o.supplier_id == id,
            OrderReference::Customer(_) | OrderReference::Employee(_) => false,
        });
        let sales = self.work.sales_orders.values().filter(|o| match reference {
            OrderReference::Item(id) => o.lines.iter().any(|l| l.item_id == id),
            OrderReference::Customer(id) => o.customer_id == id,
            OrderReference::Employee(id) => {
                o.employee_id == id || o.lines.iter().any(|l| l.assigned_employee_id == id)
            }
            OrderReference::Supplier(_) => false,
        });
        Ok((purchases.count() + sales.count()) as u64)
    }

    fn insert_purchase_order(&mut self, order: &PurchaseOrder) -> StoreResult<()> {
        if self
            .work
            .purchase_orders
            .values()
            .any(|o| o.number == order.number)
        {
            return Err(StoreError::duplicate(constraints::PURCHASE_ORDER_NUMBER));
        }
        self.work.purchase_orders.insert(order.id, order.clone());
        Ok(())
    }

    fn purchase_order(&mut self, id: PurchaseOrderId) -> StoreResult<Option<PurchaseOrder>> {
        Ok(self.work.purchase_orders.get(&id).cloned())
    }

    fn purchase_orders(&mut self) -> StoreResult<Vec<PurchaseOrder>> {
        Ok(sorted_by(self.work.purchase_orders.values().cloned(), |o| {
            o.ordered_at
        }))
    }

    fn transition_purchase_order(&mut self, order: &PurchaseOrder) -> StoreResult<bool> {
        Ok(match self.work.purchase_orders.get_mut(&order.id) {
            Some(stored) if stored.is_pending() => {
                stored.status = order.status;
                stored.received_at = order.received_at;
                true
            }
            _ => false,
        })
    }

    fn insert_sales_order(&mut self, order: &SalesOrder) -> StoreResult<()> {
        if self
            .work
            .sales_orders
            .values()
            .any(|o| o.number == order.number)
        {
            return Err(StoreError::duplicate(constraints::SALES_ORDER_NUMBER));
        }
        self.work.sales_orders.insert(order.id, order.clone());
        Ok(())
    }

    fn sales_order(&mut self, id: SalesOrderId) -> StoreResult<Option<SalesOrder>> {
        Ok(self.work.sales_orders.get(&id).cloned())
    }

    fn sales_orders(&mut self) -> StoreResult<Vec<SalesOrder>> {
        Ok(sorted_by(self.work.sales_orders.values().cloned(), |o| {
            o.ordered_at
        }))
    }

    fn transition_sales_order(&mut self, order: &SalesOrder) -> StoreResult<bool> {
        Ok(match self.work.sales_orders.get_mut(&order.id) {
            Some(stored) if stored.is_pending() => {
                stored.status = order.status;
                stored.completed_at = order.completed_at;
                true
            }
            _ => false,
        })
    }
}

impl LedgerRepository for InMemoryTx<'_> {
    fn insert_payable(&mut self, payable: &AccountsPayable) -> StoreResult<()> {
        self.work.payables.insert(payable.id, payable.clone());
        Ok(())
    }

    fn payable(&mut self, id: PayableId) -> StoreResult<Option<AccountsPayable>> {
        Ok(self.work.payables.get(&id).cloned())
    }

    fn payables(&mut self) -> StoreResult<Vec<AccountsPayable>> {
        Ok(sorted_by(self.work.payables.values().cloned(), |p| p.due_date))
    }

    fn settle_payable(&mut self, id: PayableId, paid_at: DateTime<Utc>) -> StoreResult<bool> {
        Ok(match self.work.payables.get_mut(&id) {
            Some(p) if p.status == SettlementStatus::Pending => {
                p.status = SettlementStatus::Paid;
                p.paid_at = Some(paid_at);
                true
            }
            _ => false,
        })
    }

    fn insert_receivable(&mut self, receivable: &AccountsReceivable) -> StoreResult<()> {
        self.work.receivables.insert(receivable.id, receivable.clone());
        Ok(())
    }

    fn receivable(&mut self, id: ReceivableId) -> StoreResult<Option<AccountsReceivable>> {
        Ok(self.work.receivables.get(&id).cloned())
    }

    fn receivables(&mut self) -> StoreResult<Vec<AccountsReceivable>> {
        Ok(sorted_by(self.work.receivables.values().cloned(), |r| {
            r.due_date
        }))
    }

    fn settle_receivable(
        &mut self,
        id: ReceivableId,
        paid_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        Ok(match self.work.receivables.get_mut(&id) {
            Some(r) if r.status == SettlementStatus::Pending => {
                r.status = SettlementStatus::Paid;
                r.paid_at = Some(paid_at);
                true
            }
            _ => false,
        })
    }
}

fn counts<'a, T: 'a>(values: impl Iterator<Item = &'a T>, synced: impl Fn(&T) -> bool) -> SyncCounts {
    let mut counts = SyncCounts::default();
    for v in values {
        counts.total += 1;
        if synced(v) {
            counts.synced += 1;
        }
    }
    counts
}

impl SyncLogRepository for InMemoryTx<'_> {
    fn append_sync_log(&mut self, entry: &SyncLogEntry) -> StoreResult<()> {
        self.work.sync_log.push(entry.clone());
        Ok(())
    }

    fn recent_sync_logs(&mut self, limit: usize) -> StoreResult<Vec<SyncLogEntry>> {
        Ok(self.work.sync_log.iter().rev().take(limit).cloned().collect())
    }

    fn sync_counts(&mut self, record: SyncedRecord) -> StoreResult<SyncCounts> {
        let w = &self.work;
        Ok(match record {
            SyncedRecord::Items => counts(w.items.values(), |i| i.sync.synced),
            SyncedRecord::Suppliers => counts(w.suppliers.values(), |s| s.sync.synced),
            SyncedRecord::Customers => counts(w.customers.values(), |c| c.sync.synced),
            SyncedRecord::PurchaseOrders => counts(w.purchase_orders.values(), |o| o.synced),
            SyncedRecord::SalesOrders => counts(w.sales_orders.values(), |o| o.synced),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopledger_catalog::{AlertKind, NewItem};
    use shopledger_core::Decimal;

    fn item(sku: &str, stock: i64) -> Item {
        Item::create(
            ItemId::new(),
            NewItem {
                sku: sku.to_string(),
                name: sku.to_string(),
                category: None,
                stock: Decimal::from(stock),
                min_stock: None,
                cost_price: Decimal::ONE,
                selling_price: Decimal::ONE,
            },
            Decimal::from(5),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn dropping_a_transaction_rolls_back() {
        let store = InMemoryStore::new();
        let a = item("A", 1);
        {
            let mut tx = store.begin().unwrap();
            tx.insert_item(&a).unwrap();
        }
        let mut tx = store.begin().unwrap();
        assert!(tx.item(a.id).unwrap().is_none());
    }

    #[test]
    fn committed_writes_are_visible_to_later_transactions() {
        let store = InMemoryStore::new();
        let a = item("A", 1);
        let mut tx = store.begin().unwrap();
        tx.insert_item(&a).unwrap();
        tx.commit().unwrap();

        let mut tx = store.begin().unwrap();
        assert_eq!(tx.item(a.id).unwrap(), Some(a));
    }

    #[test]
    fn sku_is_unique() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().unwrap();
        tx.insert_item(&item("A", 1)).unwrap();
        let err = tx.insert_item(&item("A", 2)).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { ref constraint } if constraint == constraints::ITEM_SKU));
    }

    #[test]
    fn conditional_decrement_never_goes_negative() {
        let store = InMemoryStore::new();
        let a = item("A", 3);
        let mut tx = store.begin().unwrap();
        tx.insert_item(&a).unwrap();

        assert_eq!(
            tx.decrement_stock_if_available(a.id, Decimal::from(4)).unwrap(),
            StockDecrement::Insufficient(Decimal::from(3))
        );
        assert_eq!(
            tx.decrement_stock_if_available(a.id, Decimal::from(3)).unwrap(),
            StockDecrement::Applied(Decimal::ZERO)
        );
        assert_eq!(
            tx.decrement_stock_if_available(ItemId::new(), Decimal::ONE).unwrap(),
            StockDecrement::Missing
        );
    }

    #[test]
    fn alert_upsert_keeps_a_single_unresolved_alert() {
        let store = InMemoryStore::new();
        let a = item("A", 0);
        let mut tx = store.begin().unwrap();
        let now = Utc::now();
        let low = AlertAssessment {
            kind: AlertKind::LowStock,
            message: "low".to_string(),
        };
        let out = AlertAssessment {
            kind: AlertKind::OutOfStock,
            message: "out".to_string(),
        };

        tx.set_unresolved_alert(a.id, Some(&low), now).unwrap();
        tx.set_unresolved_alert(a.id, Some(&low), now).unwrap();
        assert_eq!(tx.unresolved_alerts().unwrap().len(), 1);

        tx.set_unresolved_alert(a.id, Some(&out), now).unwrap();
        let unresolved = tx.unresolved_alerts().unwrap();
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].kind, AlertKind::OutOfStock);

        tx.set_unresolved_alert(a.id, None, now).unwrap();
        assert!(tx.unresolved_alerts().unwrap().is_empty());
        assert_eq!(tx.purge_resolved_alerts().unwrap(), 0);
    }

    #[test]
    fn only_explicitly_resolved_alerts_wait_for_a_purge() {
        let store = InMemoryStore::new();
        let (a, b) = (item("A", 0), item("B", 0));
        let mut tx = store.begin().unwrap();
        let now = Utc::now();
        let low = AlertAssessment {
            kind: AlertKind::LowStock,
            message: "low".to_string(),
        };
        tx.set_unresolved_alert(a.id, Some(&low), now).unwrap();
        tx.set_unresolved_alert(b.id, Some(&low), now).unwrap();

        let resolved = tx.unresolved_alerts().unwrap()[0].id;
        assert!(tx.resolve_alert(resolved).unwrap());
        tx.set_unresolved_alert(a.id, None, now).unwrap();
        tx.set_unresolved_alert(b.id, None, now).unwrap();

        assert_eq!(tx.purge_resolved_alerts().unwrap(), 1);
        assert_eq!(tx.purge_resolved_alerts().unwrap(), 0);
    }

    #[test]
    fn updates_of_missing_records_report_false() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().unwrap();
        let ghost = item("GHOST", 1);

        assert!(!tx.update_item(&ghost).unwrap());
        assert!(tx.item(ghost.id).unwrap().is_none());

        tx.insert_item(&ghost).unwrap();
        let mut renamed = ghost.clone();
        renamed.name = "Visible".to_string();
        assert!(tx.update_item(&renamed).unwrap());
        assert_eq!(tx.item(ghost.id).unwrap().unwrap().name, "Visible");
    }

    #[test]
    fn stock_arithmetic_past_the_decimal_range_is_refused() {
        let store = InMemoryStore::new();
        let full = item("FULL", 0);
        let mut tx = store.begin().unwrap();
        tx.insert_item(&full).unwrap();
        tx.adjust_stock(full.id, Decimal::MAX).unwrap();

        let err = tx.adjust_stock(full.id, Decimal::ONE).unwrap_err();
        assert!(matches!(err, StoreError::OutOfRange { .. }));
        assert_eq!(tx.item(full.id).unwrap().unwrap().stock, Decimal::MAX);
    }

    #[test]
    fn a_panicking_transaction_leaves_the_store_usable() {
        let store = InMemoryStore::new();
        let a = item("A", 2);
        let mut tx = store.begin().unwrap();
        tx.insert_item(&a).unwrap();
        tx.commit().unwrap();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut tx = store.begin().unwrap();
            tx.adjust_stock(a.id, Decimal::from(40)).unwrap();
            panic!("work failed mid-transaction");
        }));
        assert!(result.is_err());

        let mut tx = store.begin().unwrap();
        assert_eq!(tx.item(a.id).unwrap().unwrap().stock, Decimal::from(2));
    }
}
