//! Persistence boundary.
//!
//! Every workflow step runs against one [`UnitOfWork`]: a transaction that is
//! either committed as a whole or, when dropped without `commit`, rolled back.
//! Repositories are split by concern but always reached through the same unit
//! of work, so a workflow's writes share one atomic scope.

pub mod in_memory;
pub mod postgres;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use shopledger_accounting::{AccountsPayable, AccountsReceivable, PayableId, ReceivableId};
use shopledger_catalog::{AlertAssessment, AlertId, Item, ItemId, Sku, StockAlert};
use shopledger_core::{DocumentKind, ExternalId, Quantity};
use shopledger_parties::{
    Customer, CustomerId, Employee, EmployeeId, EmployeeTask, Supplier, SupplierId, TaskId,
    TaskStatus,
};
use shopledger_purchasing::{PurchaseOrder, PurchaseOrderId};
use shopledger_reconciliation::{SyncCounts, SyncLogEntry};
use shopledger_sales::{SalesOrder, SalesOrderId};

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Storage operation error.
///
/// These are infrastructure failures, as opposed to domain errors, except
/// `DuplicateKey` (a natural key is taken) and `OutOfRange` (a stored amount
/// would leave the decimal range).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate key violates {constraint}")]
    DuplicateKey { constraint: String },

    #[error("{what} is out of range")]
    OutOfRange { what: String },

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn duplicate(constraint: impl Into<String>) -> Self {
        Self::DuplicateKey {
            constraint: constraint.into(),
        }
    }

    pub fn out_of_range(what: impl Into<String>) -> Self {
        Self::OutOfRange { what: what.into() }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Unique constraint names shared by both backends.
pub mod constraints {
    pub const ITEM_SKU: &str = "items_sku_key";
    pub const PURCHASE_ORDER_NUMBER: &str = "purchase_orders_number_key";
    pub const SALES_ORDER_NUMBER: &str = "sales_orders_number_key";
}

/// Result of an atomic decrement-if-sufficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDecrement {
    /// Stock was decremented; carries the new level.
    Applied(Quantity),
    /// Stock is short; nothing changed. Carries the level on hand.
    Insufficient(Quantity),
    Missing,
}

/// A catalog or party record that orders may point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderReference {
    Item(ItemId),
    Supplier(SupplierId),
    Customer(CustomerId),
    /// Order taker or assignee of a sale line.
    Employee(EmployeeId),
}

/// Record kinds that carry a sync flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncedRecord {
    Items,
    Suppliers,
    Customers,
    PurchaseOrders,
    SalesOrders,
}

pub trait CatalogRepository {
    fn item(&mut self, id: ItemId) -> StoreResult<Option<Item>>;
    fn item_by_sku(&mut self, sku: &Sku) -> StoreResult<Option<Item>>;
    fn item_by_external_id(&mut self, external_id: &ExternalId) -> StoreResult<Option<Item>>;
    /// All items ordered by SKU.
    fn items(&mut self) -> StoreResult<Vec<Item>>;
    fn insert_item(&mut self, item: &Item) -> StoreResult<()>;
    /// Replace every stored field of an existing item. Returns false when no
    /// item has that id; nothing is inserted.
    fn update_item(&mut self, item: &Item) -> StoreResult<bool>;
    /// Remove the item together with its alerts. Returns false when missing.
    fn delete_item(&mut self, id: ItemId) -> StoreResult<bool>;
    /// Add `delta` (possibly negative) to stock; `None` when the item is missing.
    ///
    /// Fails with `OutOfRange` when the new level does not fit.
    fn adjust_stock(&mut self, id: ItemId, delta: Quantity) -> StoreResult<Option<Quantity>>;
    /// Subtract `quantity` only if at least that much is on hand, in one step.
    fn decrement_stock_if_available(
        &mut self,
        id: ItemId,
        quantity: Quantity,
    ) -> StoreResult<StockDecrement>;
    fn unsynced_items(&mut self) -> StoreResult<Vec<Item>>;
    /// Returns false when the item is missing.
    fn mark_item_synced(&mut self, id: ItemId) -> StoreResult<bool>;
}

pub trait AlertRepository {
    /// Make `assessment` the item's only unresolved alert, or delete every
    /// unresolved alert of the item when `None`. Alerts that no longer apply
    /// are deleted, not marked resolved.
    fn set_unresolved_alert(
        &mut self,
        item_id: ItemId,
        assessment: Option<&AlertAssessment>,
        now: DateTime<Utc>,
    ) -> StoreResult<()>;
    fn unresolved_alerts(&mut self) -> StoreResult<Vec<StockAlert>>;
    /// Returns false when the alert is missing or already resolved.
    fn resolve_alert(&mut self, id: AlertId) -> StoreResult<bool>;
    /// Delete resolved alerts; returns how many were removed.
    fn purge_resolved_alerts(&mut self) -> StoreResult<u64>;
}

pub trait PartyRepository {
    fn supplier(&mut self, id: SupplierId) -> StoreResult<Option<Supplier>>;
    fn supplier_by_name(&mut self, name: &str) -> StoreResult<Option<Supplier>>;
    fn supplier_by_external_id(
        &mut self,
        external_id: &ExternalId,
    ) -> StoreResult<Option<Supplier>>;
    fn suppliers(&mut self) -> StoreResult<Vec<Supplier>>;
    fn insert_supplier(&mut self, supplier: &Supplier) -> StoreResult<()>;
    /// Returns false when no supplier has that id.
    fn update_supplier(&mut self, supplier: &Supplier) -> StoreResult<bool>;
    fn delete_supplier(&mut self, id: SupplierId) -> StoreResult<bool>;
    fn unsynced_suppliers(&mut self) -> StoreResult<Vec<Supplier>>;
    fn mark_supplier_synced(&mut self, id: SupplierId) -> StoreResult<bool>;

    fn customer(&mut self, id: CustomerId) -> StoreResult<Option<Customer>>;
    fn customer_by_name(&mut self, name: &str) -> StoreResult<Option<Customer>>;
    fn customer_by_external_id(
        &mut self,
        external_id: &ExternalId,
    ) -> StoreResult<Option<Customer>>;
    fn customers(&mut self) -> StoreResult<Vec<Customer>>;
    fn insert_customer(&mut self, customer: &Customer) -> StoreResult<()>;
    /// Returns false when no customer has that id.
    fn update_customer(&mut self, customer: &Customer) -> StoreResult<bool>;
    fn delete_customer(&mut self, id: CustomerId) -> StoreResult<bool>;
    fn unsynced_customers(&mut self) -> StoreResult<Vec<Customer>>;
    fn mark_customer_synced(&mut self, id: CustomerId) -> StoreResult<bool>;

    fn employee(&mut self, id: EmployeeId) -> StoreResult<Option<Employee>>;
    /// All employees ordered by name.
    fn employees(&mut self) -> StoreResult<Vec<Employee>>;
    fn insert_employee(&mut self, employee: &Employee) -> StoreResult<()>;
    /// Returns false when no employee has that id.
    fn update_employee(&mut self, employee: &Employee) -> StoreResult<bool>;
    /// Remove the employee together with their tasks. Returns false when missing.
    fn delete_employee(&mut self, id: EmployeeId) -> StoreResult<bool>;

    fn insert_task(&mut self, task: &EmployeeTask) -> StoreResult<()>;
    fn task(&mut self, id: TaskId) -> StoreResult<Option<EmployeeTask>>;
    /// All tasks, oldest assignment first.
    fn tasks(&mut self) -> StoreResult<Vec<EmployeeTask>>;
    /// Returns false when the task is missing.
    fn set_task_status(&mut self, id: TaskId, status: TaskStatus) -> StoreResult<bool>;
    fn delete_task(&mut self, id: TaskId) -> StoreResult<bool>;
}

pub trait OrderRepository {
    /// Documents of `kind` already issued on `day`; seeds the daily sequence.
    fn documents_issued_on(&mut self, kind: DocumentKind, day: NaiveDate) -> StoreResult<u32>;

    /// Purchase and sales orders that point at `reference`.
    fn order_references(&mut self, reference: OrderReference) -> StoreResult<u64>;

    /// Insert the order with its lines.
    fn insert_purchase_order(&mut self, order: &PurchaseOrder) -> StoreResult<()>;
    fn purchase_order(&mut self, id: PurchaseOrderId) -> StoreResult<Option<PurchaseOrder>>;
    fn purchase_orders(&mut self) -> StoreResult<Vec<PurchaseOrder>>;
    /// Persist a status transition, applied only while the stored order is
    /// still pending. Returns whether it was applied.
    fn transition_purchase_order(&mut self, order: &PurchaseOrder) -> StoreResult<bool>;

    fn insert_sales_order(&mut self, order: &SalesOrder) -> StoreResult<()>;
    fn sales_order(&mut self, id: SalesOrderId) -> StoreResult<Option<SalesOrder>>;
    fn sales_orders(&mut self) -> StoreResult<Vec<SalesOrder>>;
    fn transition_sales_order(&mut self, order: &SalesOrder) -> StoreResult<bool>;
}

pub trait LedgerRepository {
    fn insert_payable(&mut self, payable: &AccountsPayable) -> StoreResult<()>;
    fn payable(&mut self, id: PayableId) -> StoreResult<Option<AccountsPayable>>;
    fn payables(&mut self) -> StoreResult<Vec<AccountsPayable>>;
    /// Mark paid only while pending. Returns whether it was applied.
    fn settle_payable(&mut self, id: PayableId, paid_at: DateTime<Utc>) -> StoreResult<bool>;

    fn insert_receivable(&mut self, receivable: &AccountsReceivable) -> StoreResult<()>;
    fn receivable(&mut self, id: ReceivableId) -> StoreResult<Option<AccountsReceivable>>;
    fn receivables(&mut self) -> StoreResult<Vec<AccountsReceivable>>;
    fn settle_receivable(&mut self, id: ReceivableId, paid_at: DateTime<Utc>)
    -> StoreResult<bool>;
}

pub trait SyncLogRepository {
    fn append_sync_log(&mut self, entry: &SyncLogEntry) -> StoreResult<()>;
    /// Newest first.
    fn recent_sync_logs(&mut self, limit: usize) -> StoreResult<Vec<SyncLogEntry>>;
    fn sync_counts(&mut self, record: SyncedRecord) -> StoreResult<SyncCounts>;
}

/// One transaction over every repository.
pub trait UnitOfWork:
    CatalogRepository
    + AlertRepository
    + PartyRepository
    + OrderRepository
    + LedgerRepository
    + SyncLogRepository
{
    fn commit(self) -> StoreResult<()>;
}

/// Transaction factory.
pub trait Store: Send + Sync {
    type Tx<'a>: UnitOfWork
    where
        Self: 'a;

    fn begin(&self) -> StoreResult<Self::Tx<'_>>;
}
