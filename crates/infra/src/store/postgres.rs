//! Postgres-backed store.
//!
//! The store API is synchronous; each `PostgresStore` owns a small tokio
//! runtime and drives `sqlx` futures on it with `block_on`. It must therefore
//! not be called from inside another async runtime.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `DuplicateKey { constraint }` |
//! | Database (other) | any other | `Backend` |
//! | PoolClosed / Io / other | N/A | `Backend` |
//!
//! ## Concurrency
//!
//! Stock changes lock the item row (`SELECT ... FOR UPDATE`) before the new
//! level is computed, so the sufficiency check and the write see the same
//! stock. Order/ledger transitions are single conditional `UPDATE`
//! statements (`WHERE status = 'pending'`). Two transactions racing on the
//! same row cannot both apply.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgConnection, PgPool, Postgres, Row, Transaction};
use tokio::runtime::Runtime;
use tracing::instrument;

use shopledger_accounting::{
    AccountsPayable, AccountsReceivable, PayableId, ReceivableId, SettlementStatus,
};
use shopledger_catalog::{AlertAssessment, AlertId, Item, ItemId, Sku, StockAlert};
use shopledger_core::id::Uuid;
use shopledger_core::{DocumentKind, DocumentNumber, ExternalId, ExternalSync, Quantity};
use shopledger_parties::{
    ContactInfo, Customer, CustomerId, Employee, EmployeeId, EmployeeTask, Supplier, SupplierId,
    TaskId, TaskStatus,
};
use shopledger_purchasing::{PurchaseLine, PurchaseOrder, PurchaseOrderId};
use shopledger_reconciliation::{SyncCounts, SyncLogEntry, SyncLogId};
use shopledger_sales::{SaleLine, SalesOrder, SalesOrderId, SalesTotals};

use super::{
    AlertRepository, CatalogRepository, LedgerRepository, OrderRepository, OrderReference,
    PartyRepository, StockDecrement, Store, StoreError, StoreResult, SyncLogRepository,
    SyncedRecord, UnitOfWork,
};

/// Postgres store: a connection pool plus the runtime that drives it.
pub struct PostgresStore {
    pool: PgPool,
    runtime: Runtime,
}

impl PostgresStore {
    /// Connect a pool of at most `max_connections` connections.
    pub fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .map_err(|e| StoreError::Backend(format!("failed to start runtime: {e}")))?;
        let pool = runtime
            .block_on(
                PgPoolOptions::new()
                    .max_connections(max_connections)
                    .connect(url),
            )
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self { pool, runtime })
    }

    /// Apply pending schema migrations.
    #[instrument(skip(self), err)]
    pub fn migrate(&self) -> StoreResult<()> {
        self.runtime
            .block_on(sqlx::migrate!("./migrations").run(&self.pool))
            .map_err(|e| StoreError::Backend(format!("migration failed: {e}")))
    }
}

impl Store for PostgresStore {
    type Tx<'a> = PostgresTx<'a>;

    fn begin(&self) -> StoreResult<PostgresTx<'_>> {
        let tx = self
            .runtime
            .block_on(self.pool.begin())
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(PostgresTx {
            runtime: &self.runtime,
            tx: Some(tx),
        })
    }
}

/// Open database transaction. Rolled back on drop unless committed.
pub struct PostgresTx<'a> {
    runtime: &'a Runtime,
    tx: Option<Transaction<'static, Postgres>>,
}

impl<'a> PostgresTx<'a> {
    fn parts(&mut self) -> StoreResult<(&'a Runtime, &mut PgConnection)> {
        let tx = self
            .tx
            .as_mut()
            .ok_or_else(|| StoreError::Backend("transaction already finished".to_string()))?;
        Ok((self.runtime, &mut **tx))
    }

    fn fetch_optional(
        &mut self,
        operation: &'static str,
        query: sqlx::query::Query<'_, Postgres, sqlx::postgres::PgArguments>,
    ) -> StoreResult<Option<PgRow>> {
        let (rt, conn) = self.parts()?;
        rt.block_on(query.fetch_optional(conn))
            .map_err(|e| map_sqlx_error(operation, e))
    }

    fn fetch_all(
        &mut self,
        operation: &'static str,
        query: sqlx::query::Query<'_, Postgres, sqlx::postgres::PgArguments>,
    ) -> StoreResult<Vec<PgRow>> {
        let (rt, conn) = self.parts()?;
        rt.block_on(query.fetch_all(conn))
            .map_err(|e| map_sqlx_error(operation, e))
    }

    /// Execute and return the number of affected rows.
    fn execute(
        &mut self,
        operation: &'static str,
        query: sqlx::query::Query<'_, Postgres, sqlx::postgres::PgArguments>,
    ) -> StoreResult<u64> {
        let (rt, conn) = self.parts()?;
        rt.block_on(query.execute(conn))
            .map(|done| done.rows_affected())
            .map_err(|e| map_sqlx_error(operation, e))
    }
}

impl UnitOfWork for PostgresTx<'_> {
    fn commit(mut self) -> StoreResult<()> {
        match self.tx.take() {
            Some(tx) => self
                .runtime
                .block_on(tx.commit())
                .map_err(|e| map_sqlx_error("commit", e)),
            None => Err(StoreError::Backend(
                "transaction already finished".to_string(),
            )),
        }
    }
}

impl Drop for PostgresTx<'_> {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            if let Err(e) = self.runtime.block_on(tx.rollback()) {
                tracing::warn!(error = %e, "rollback failed");
            }
        }
    }
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                return StoreError::DuplicateKey {
                    constraint: db_err.constraint().unwrap_or("unknown").to_string(),
                };
            }
            StoreError::Backend(format!(
                "database error in {}: {}",
                operation,
                db_err.message()
            ))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> StoreResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column)
        .map_err(|e| StoreError::Backend(format!("failed to decode column {column}: {e}")))
}

fn corrupt(what: &str, err: impl core::fmt::Display) -> StoreError {
    StoreError::Backend(format!("corrupt {what} row: {err}"))
}

fn sync_from_row(row: &PgRow) -> StoreResult<ExternalSync> {
    let external_id: Option<String> = get(row, "external_id")?;
    Ok(ExternalSync {
        synced: get(row, "synced")?,
        external_id: external_id
            .map(ExternalId::new)
            .transpose()
            .map_err(|e| corrupt("external id", e))?,
    })
}

fn external_id_text(sync: &ExternalSync) -> Option<String> {
    sync.external_id.as_ref().map(|e| e.as_str().to_string())
}

fn contact_from_row(row: &PgRow) -> StoreResult<ContactInfo> {
    Ok(ContactInfo {
        contact_person: get(row, "contact_person")?,
        phone: get(row, "phone")?,
        email: get(row, "email")?,
        address: get(row, "address")?,
        gst_number: get(row, "gst_number")?,
    })
}

const ITEM_COLUMNS: &str = "id, sku, name, category, stock, min_stock, cost_price, \
                            selling_price, synced, external_id, created_at";

fn item_from_row(row: &PgRow) -> StoreResult<Item> {
    let sku: String = get(row, "sku")?;
    Ok(Item {
        id: ItemId::from_uuid(get(row, "id")?),
        sku: Sku::new(sku).map_err(|e| corrupt("item", e))?,
        name: get(row, "name")?,
        category: get(row, "category")?,
        stock: get(row, "stock")?,
        min_stock: get(row, "min_stock")?,
        cost_price: get(row, "cost_price")?,
        selling_price: get(row, "selling_price")?,
        sync: sync_from_row(row)?,
        created_at: get(row, "created_at")?,
    })
}

fn items_from_rows(rows: Vec<PgRow>) -> StoreResult<Vec<Item>> {
    rows.iter().map(item_from_row).collect()
}

impl PostgresTx<'_> {
    /// SKU and stock of the item, row-locked until the transaction ends.
    fn lock_stock(
        &mut self,
        operation: &'static str,
        id: ItemId,
    ) -> StoreResult<Option<(String, Quantity)>> {
        let row = self.fetch_optional(
            operation,
            sqlx::query("SELECT sku, stock FROM items WHERE id = $1 FOR UPDATE")
                .bind(*id.as_uuid()),
        )?;
        row.as_ref()
            .map(|r| Ok((get(r, "sku")?, get(r, "stock")?)))
            .transpose()
    }

    fn write_stock(
        &mut self,
        operation: &'static str,
        id: ItemId,
        stock: Quantity,
    ) -> StoreResult<()> {
        self.execute(
            operation,
            sqlx::query("UPDATE items SET stock = $2 WHERE id = $1")
                .bind(*id.as_uuid())
                .bind(stock),
        )?;
        Ok(())
    }
}

impl CatalogRepository for PostgresTx<'_> {
    fn item(&mut self, id: ItemId) -> StoreResult<Option<Item>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = $1");
        let row = self.fetch_optional("item", sqlx::query(&sql).bind(*id.as_uuid()))?;
        row.as_ref().map(item_from_row).transpose()
    }

    fn item_by_sku(&mut self, sku: &Sku) -> StoreResult<Option<Item>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE sku = $1");
        let row = self.fetch_optional("item_by_sku", sqlx::query(&sql).bind(sku.as_str()))?;
        row.as_ref().map(item_from_row).transpose()
    }

    fn item_by_external_id(&mut self, external_id: &ExternalId) -> StoreResult<Option<Item>> {
        let sql =
            format!("SELECT {ITEM_COLUMNS} FROM items WHERE external_id = $1 ORDER BY sku LIMIT 1");
        let row = self.fetch_optional(
            "item_by_external_id",
            sqlx::query(&sql).bind(external_id.as_str()),
        )?;
        row.as_ref().map(item_from_row).transpose()
    }

    fn items(&mut self) -> StoreResult<Vec<Item>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items ORDER BY sku");
        items_from_rows(self.fetch_all("items", sqlx::query(&sql))?)
    }

    fn insert_item(&mut self, item: &Item) -> StoreResult<()> {
        self.execute(
            "insert_item",
            sqlx::query(
                r#"
                INSERT INTO items (id, sku, name, category, stock, min_stock, cost_price,
                                   selling_price, synced, external_id, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(*item.id.as_uuid())
            .bind(item.sku.as_str())
            .bind(&item.name)
            .bind(&item.category)
            .bind(item.stock)
            .bind(item.min_stock)
            .bind(item.cost_price)
            .bind(item.selling_price)
            .bind(item.sync.synced)
            .bind(external_id_text(&item.sync))
            .bind(item.created_at),
        )?;
        Ok(())
    }

    fn update_item(&mut self, item: &Item) -> StoreResult<bool> {
        let n = self.execute(
            "update_item",
            sqlx::query(
                r#"
                UPDATE items
                SET sku = $2, name = $3, category = $4, stock = $5, min_stock = $6,
                    cost_price = $7, selling_price = $8, synced = $9, external_id = $10
                WHERE id = $1
                "#,
            )
            .bind(*item.id.as_uuid())
            .bind(item.sku.as_str())
            .bind(&item.name)
            .bind(&item.category)
            .bind(item.stock)
            .bind(item.min_stock)
            .bind(item.cost_price)
            .bind(item.selling_price)
            .bind(item.sync.synced)
            .bind(external_id_text(&item.sync)),
        )?;
        Ok(n == 1)
    }

    fn delete_item(&mut self, id: ItemId) -> StoreResult<bool> {
        self.execute(
            "delete_item_alerts",
            sqlx::query("DELETE FROM stock_alerts WHERE item_id = $1").bind(*id.as_uuid()),
        )?;
        let n = self.execute(
            "delete_item",
            sqlx::query("DELETE FROM items WHERE id = $1").bind(*id.as_uuid()),
        )?;
        Ok(n == 1)
    }

    fn adjust_stock(&mut self, id: ItemId, delta: Quantity) -> StoreResult<Option<Quantity>> {
        let Some((sku, stock)) = self.lock_stock("adjust_stock", id)? else {
            return Ok(None);
        };
        let stock = stock
            .checked_add(delta)
            .ok_or_else(|| StoreError::out_of_range(format!("stock of {sku}")))?;
        self.write_stock("adjust_stock", id, stock)?;
        Ok(Some(stock))
    }

    fn decrement_stock_if_available(
        &mut self,
        id: ItemId,
        quantity: Quantity,
    ) -> StoreResult<StockDecrement> {
        let Some((sku, stock)) = self.lock_stock("decrement_stock_if_available", id)? else {
            return Ok(StockDecrement::Missing);
        };
        if stock < quantity {
            return Ok(StockDecrement::Insufficient(stock));
        }
        let stock = stock
            .checked_sub(quantity)
            .ok_or_else(|| StoreError::out_of_range(format!("stock of {sku}")))?;
        self.write_stock("decrement_stock_if_available", id, stock)?;
        Ok(StockDecrement::Applied(stock))
    }

    fn unsynced_items(&mut self) -> StoreResult<Vec<Item>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE NOT synced ORDER BY sku");
        items_from_rows(self.fetch_all("unsynced_items", sqlx::query(&sql))?)
    }

    fn mark_item_synced(&mut self, id: ItemId) -> StoreResult<bool> {
        let n = self.execute(
            "mark_item_synced",
            sqlx::query("UPDATE items SET synced = TRUE WHERE id = $1").bind(*id.as_uuid()),
        )?;
        Ok(n == 1)
    }
}

fn alert_from_row(row: &PgRow) -> StoreResult<StockAlert> {
    let kind: String = get(row, "kind")?;
    Ok(StockAlert {
        id: AlertId::from_uuid(get(row, "id")?),
        item_id: ItemId::from_uuid(get(row, "item_id")?),
        kind: kind.parse().map_err(|e| corrupt("stock alert", e))?,
        message: get(row, "message")?,
        created_at: get(row, "created_at")?,
        resolved: get(row, "resolved")?,
    })
}

impl AlertRepository for PostgresTx<'_> {
    fn set_unresolved_alert(
        &mut self,
        item_id: ItemId,
        assessment: Option<&AlertAssessment>,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let keep_kind = assessment.map(|a| a.kind.as_str());
        self.execute(
            "set_unresolved_alert",
            sqlx::query(
                r#"
                DELETE FROM stock_alerts
                WHERE item_id = $1 AND NOT resolved AND ($2::TEXT IS NULL OR kind <> $2)
                "#,
            )
            .bind(*item_id.as_uuid())
            .bind(keep_kind),
        )?;

        if let Some(a) = assessment {
            self.execute(
                "set_unresolved_alert",
                sqlx::query(
                    r#"
                    INSERT INTO stock_alerts (id, item_id, kind, message, created_at, resolved)
                    VALUES ($1, $2, $3, $4, $5, FALSE)
                    ON CONFLICT (item_id) WHERE NOT resolved
                    DO UPDATE SET message = EXCLUDED.message
                    "#,
                )
                .bind(*AlertId::new().as_uuid())
                .bind(*item_id.as_uuid())
                .bind(a.kind.as_str())
                .bind(&a.message)
                .bind(now),
            )?;
        }
        Ok(())
    }

    fn unresolved_alerts(&mut self) -> StoreResult<Vec<StockAlert>> {
        let rows = self.fetch_all(
            "unresolved_alerts",
            sqlx::query(
                "SELECT id, item_id, kind, message, created_at, resolved FROM stock_alerts \
                 WHERE NOT resolved ORDER BY created_at",
            ),
        )?;
        rows.iter().map(alert_from_row).collect()
    }

    fn resolve_alert(&mut self, id: AlertId) -> StoreResult<bool> {
        let n = self.execute(
            "resolve_alert",
            sqlx::query("UPDATE stock_alerts SET resolved = TRUE WHERE id = $1 AND NOT resolved")
                .bind(*id.as_uuid()),
        )?;
        Ok(n == 1)
    }

    fn purge_resolved_alerts(&mut self) -> StoreResult<u64> {
        self.execute(
            "purge_resolved_alerts",
            sqlx::query("DELETE FROM stock_alerts WHERE resolved"),
        )
    }
}

const SUPPLIER_COLUMNS: &str = "id, name, contact_person, phone, email, address, gst_number, \
                                synced, external_id";
const CUSTOMER_COLUMNS: &str = "id, name, contact_person, phone, email, address, gst_number, \
                                credit_limit, synced, external_id";

fn supplier_from_row(row: &PgRow) -> StoreResult<Supplier> {
    Ok(Supplier {
        id: SupplierId::from_uuid(get(row, "id")?),
        name: get(row, "name")?,
        contact: contact_from_row(row)?,
        sync: sync_from_row(row)?,
    })
}

fn customer_from_row(row: &PgRow) -> StoreResult<Customer> {
    Ok(Customer {
        id: CustomerId::from_uuid(get(row, "id")?),
        name: get(row, "name")?,
        contact: contact_from_row(row)?,
        credit_limit: get(row, "credit_limit")?,
        sync: sync_from_row(row)?,
    })
}

const EMPLOYEE_COLUMNS: &str = "id, name, role, department, hourly_rate, phone, email, joined_at";
const TASK_COLUMNS: &str =
    "id, employee_id, task_type, description, assigned_at, due_date, status, priority";

fn employee_from_row(row: &PgRow) -> StoreResult<Employee> {
    Ok(Employee {
        id: EmployeeId::from_uuid(get(row, "id")?),
        name: get(row, "name")?,
        role: get(row, "role")?,
        department: get(row, "department")?,
        hourly_rate: get(row, "hourly_rate")?,
        phone: get(row, "phone")?,
        email: get(row, "email")?,
        joined_at: get(row, "joined_at")?,
    })
}

fn task_from_row(row: &PgRow) -> StoreResult<EmployeeTask> {
    let status: String = get(row, "status")?;
    let priority: String = get(row, "priority")?;
    Ok(EmployeeTask {
        id: TaskId::from_uuid(get(row, "id")?),
        employee_id: EmployeeId::from_uuid(get(row, "employee_id")?),
        task_type: get(row, "task_type")?,
        description: get(row, "description")?,
        assigned_at: get(row, "assigned_at")?,
        due_date: get(row, "due_date")?,
        status: status.parse().map_err(|e| corrupt("employee task", e))?,
        priority: priority.parse().map_err(|e| corrupt("employee task", e))?,
    })
}

impl PartyRepository for PostgresTx<'_> {
    fn supplier(&mut self, id: SupplierId) -> StoreResult<Option<Supplier>> {
        let sql = format!("SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = $1");
        let row = self.fetch_optional("supplier", sqlx::query(&sql).bind(*id.as_uuid()))?;
        row.as_ref().map(supplier_from_row).transpose()
    }

    fn supplier_by_name(&mut self, name: &str) -> StoreResult<Option<Supplier>> {
        let sql =
            format!("SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE name = $1 ORDER BY id LIMIT 1");
        let row = self.fetch_optional("supplier_by_name", sqlx::query(&sql).bind(name))?;
        row.as_ref().map(supplier_from_row).transpose()
    }

    fn supplier_by_external_id(
        &mut self,
        external_id: &ExternalId,
    ) -> StoreResult<Option<Supplier>> {
        let sql = format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE external_id = $1 ORDER BY id LIMIT 1"
        );
        let row = self.fetch_optional(
            "supplier_by_external_id",
            sqlx::query(&sql).bind(external_id.as_str()),
        )?;
        row.as_ref().map(supplier_from_row).transpose()
    }

    fn suppliers(&mut self) -> StoreResult<Vec<Supplier>> {
        let sql = format!("SELECT {SUPPLIER_COLUMNS} FROM suppliers ORDER BY name");
        let rows = self.fetch_all("suppliers", sqlx::query(&sql))?;
        rows.iter().map(supplier_from_row).collect()
    }

    fn insert_supplier(&mut self, supplier: &Supplier) -> StoreResult<()> {
        let c = &supplier.contact;
        self.execute(
            "insert_supplier",
            sqlx::query(
                r#"
                INSERT INTO suppliers (id, name, contact_person, phone, email, address,
                                       gst_number, synced, external_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(*supplier.id.as_uuid())
            .bind(&supplier.name)
            .bind(&c.contact_person)
            .bind(&c.phone)
            .bind(&c.email)
            .bind(&c.address)
            .bind(&c.gst_number)
            .bind(supplier.sync.synced)
            .bind(external_id_text(&supplier.sync)),
        )?;
        Ok(())
    }

    fn update_supplier(&mut self, supplier: &Supplier) -> StoreResult<bool> {
        let c = &supplier.contact;
        let n = self.execute(
            "update_supplier",
            sqlx::query(
                r#"
                UPDATE suppliers
                SET name = $2, contact_person = $3, phone = $4, email = $5, address = $6,
                    gst_number = $7, synced = $8, external_id = $9
                WHERE id = $1
                "#,
            )
            .bind(*supplier.id.as_uuid())
            .bind(&supplier.name)
            .bind(&c.contact_person)
            .bind(&c.phone)
            .bind(&c.email)
            .bind(&c.address)
            .bind(&c.gst_number)
            .bind(supplier.sync.synced)
            .bind(external_id_text(&supplier.sync)),
        )?;
        Ok(n == 1)
    }

    fn delete_supplier(&mut self, id: SupplierId) -> StoreResult<bool> {
        let n = self.execute(
            "delete_supplier",
            sqlx::query("DELETE FROM suppliers WHERE id = $1").bind(*id.as_uuid()),
        )?;
        Ok(n == 1)
    }

    fn unsynced_suppliers(&mut self) -> StoreResult<Vec<Supplier>> {
        let sql = format!("SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE NOT synced ORDER BY name");
        let rows = self.fetch_all("unsynced_suppliers", sqlx::query(&sql))?;
        rows.iter().map(supplier_from_row).collect()
    }

    fn mark_supplier_synced(&mut self, id: SupplierId) -> StoreResult<bool> {
        let n = self.execute(
            "mark_supplier_synced",
            sqlx::query("UPDATE suppliers SET synced = TRUE WHERE id = $1").bind(*id.as_uuid()),
        )?;
        Ok(n == 1)
    }

    fn customer(&mut self, id: CustomerId) -> StoreResult<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1");
        let row = self.fetch_optional("customer", sqlx::query(&sql).bind(*id.as_uuid()))?;
        row.as_ref().map(customer_from_row).transpose()
    }

    fn customer_by_name(&mut self, name: &str) -> StoreResult<Option<Customer>> {
        let sql =
            format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE name = $1 ORDER BY id LIMIT 1");
        let row = self.fetch_optional("customer_by_name", sqlx::query(&sql).bind(name))?;
        row.as_ref().map(customer_from_row).transpose()
    }

    fn customer_by_external_id(
        &mut self,
        external_id: &ExternalId,
    ) -> StoreResult<Option<Customer>> {
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE external_id = $1 ORDER BY id LIMIT 1"
        );
        let row = self.fetch_optional(
            "customer_by_external_id",
            sqlx::query(&sql).bind(external_id.as_str()),
        )?;
        row.as_ref().map(customer_from_row).transpose()
    }

    fn customers(&mut self) -> StoreResult<Vec<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY name");
        let rows = self.fetch_all("customers", sqlx::query(&sql))?;
        rows.iter().map(customer_from_row).collect()
    }

    fn insert_customer(&mut self, customer: &Customer) -> StoreResult<()> {
        let c = &customer.contact;
        self.execute(
            "insert_customer",
            sqlx::query(
                r#"
                INSERT INTO customers (id, name, contact_person, phone, email, address,
                                       gst_number, credit_limit, synced, external_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(*customer.id.as_uuid())
            .bind(&customer.name)
            .bind(&c.contact_person)
            .bind(&c.phone)
            .bind(&c.email)
            .bind(&c.address)
            .bind(&c.gst_number)
            .bind(customer.credit_limit)
            .bind(customer.sync.synced)
            .bind(external_id_text(&customer.sync)),
        )?;
        Ok(())
    }

    fn update_customer(&mut self, customer: &Customer) -> StoreResult<bool> {
        let c = &customer.contact;
        let n = self.execute(
            "update_customer",
            sqlx::query(
                r#"
                UPDATE customers
                SET name = $2, contact_person = $3, phone = $4, email = $5, address = $6,
                    gst_number = $7, credit_limit = $8, synced = $9, external_id = $10
                WHERE id = $1
                "#,
            )
            .bind(*customer.id.as_uuid())
            .bind(&customer.name)
            .bind(&c.contact_person)
            .bind(&c.phone)
            .bind(&c.email)
            .bind(&c.address)
            .bind(&c.gst_number)
            .bind(customer.credit_limit)
            .bind(customer.sync.synced)
            .bind(external_id_text(&customer.sync)),
        )?;
        Ok(n == 1)
    }

    fn delete_customer(&mut self, id: CustomerId) -> StoreResult<bool> {
        let n = self.execute(
            "delete_customer",
            sqlx::query("DELETE FROM customers WHERE id = $1").bind(*id.as_uuid()),
        )?;
        Ok(n == 1)
    }

    fn unsynced_customers(&mut self) -> StoreResult<Vec<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE NOT synced ORDER BY name");
        let rows = self.fetch_all("unsynced_customers", sqlx::query(&sql))?;
        rows.iter().map(customer_from_row).collect()
    }

    fn mark_customer_synced(&mut self, id: CustomerId) -> StoreResult<bool> {
        let n = self.execute(
            "mark_customer_synced",
            sqlx::query("UPDATE customers SET synced = TRUE WHERE id = $1").bind(*id.as_uuid()),
        )?;
        Ok(n == 1)
    }

    fn employee(&mut self, id: EmployeeId) -> StoreResult<Option<Employee>> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = $1");
        let row = self.fetch_optional("employee", sqlx::query(&sql).bind(*id.as_uuid()))?;
        row.as_ref().map(employee_from_row).transpose()
    }

    fn employees(&mut self) -> StoreResult<Vec<Employee>> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY name");
        let rows = self.fetch_all("employees", sqlx::query(&sql))?;
        rows.iter().map(employee_from_row).collect()
    }

    fn insert_employee(&mut self, employee: &Employee) -> StoreResult<()> {
        self.execute(
            "insert_employee",
            sqlx::query(
                r#"
                INSERT INTO employees (id, name, role, department, hourly_rate, phone, email,
                                       joined_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(*employee.id.as_uuid())
            .bind(&employee.name)
            .bind(&employee.role)
            .bind(&employee.department)
            .bind(employee.hourly_rate)
            .bind(&employee.phone)
            .bind(&employee.email)
            .bind(employee.joined_at),
        )?;
        Ok(())
    }

    fn update_employee(&mut self, employee: &Employee) -> StoreResult<bool> {
        let n = self.execute(
            "update_employee",
            sqlx::query(
                r#"
                UPDATE employees
                SET name = $2, role = $3, department = $4, hourly_rate = $5, phone = $6,
                    email = $7
                WHERE id = $1
                "#,
            )
            .bind(*employee.id.as_uuid())
            .bind(&employee.name)
            .bind(&employee.role)
            .bind(&employee.department)
            .bind(employee.hourly_rate)
            .bind(&employee.phone)
            .bind(&employee.email),
        )?;
        Ok(n == 1)
    }

    fn delete_employee(&mut self, id: EmployeeId) -> StoreResult<bool> {
        self.execute(
            "delete_employee_tasks",
            sqlx::query("DELETE FROM employee_tasks WHERE employee_id = $1").bind(*id.as_uuid()),
        )?;
        let n = self.execute(
            "delete_employee",
            sqlx::query("DELETE FROM employees WHERE id = $1").bind(*id.as_uuid()),
        )?;
        Ok(n == 1)
    }

    fn insert_task(&mut self, task: &EmployeeTask) -> StoreResult<()> {
        self.execute(
            "insert_task",
            sqlx::query(
                r#"
                INSERT INTO employee_tasks (id, employee_id, task_type, description,
                                            assigned_at, due_date, status, priority)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(*task.id.as_uuid())
            .bind(*task.employee_id.as_uuid())
            .bind(&task.task_type)
            .bind(&task.description)
            .bind(task.assigned_at)
            .bind(task.due_date)
            .bind(task.status.as_str())
            .bind(task.priority.as_str()),
        )?;
        Ok(())
    }

    fn task(&mut self, id: TaskId) -> StoreResult<Option<EmployeeTask>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM employee_tasks WHERE id = $1");
        let row = self.fetch_optional("task", sqlx::query(&sql).bind(*id.as_uuid()))?;
        row.as_ref().map(task_from_row).transpose()
    }

    fn tasks(&mut self) -> StoreResult<Vec<EmployeeTask>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM employee_tasks ORDER BY assigned_at, id");
        let rows = self.fetch_all("tasks", sqlx::query(&sql))?;
        rows.iter().map(task_from_row).collect()
    }

    fn set_task_status(&mut self, id: TaskId, status: TaskStatus) -> StoreResult<bool> {
        let n = self.execute(
            "set_task_status",
            sqlx::query("UPDATE employee_tasks SET status = $2 WHERE id = $1")
                .bind(*id.as_uuid())
                .bind(status.as_str()),
        )?;
        Ok(n == 1)
    }

    fn delete_task(&mut self, id: TaskId) -> StoreResult<bool> {
        let n = self.execute(
            "delete_task",
            sqlx::query("DELETE FROM employee_tasks WHERE id = $1").bind(*id.as_uuid()),
        )?;
        Ok(n == 1)
    }
}

const PURCHASE_ORDER_COLUMNS: &str =
    "id, number, supplier_id, status, total_amount, ordered_at, received_at, synced";
const SALES_ORDER_COLUMNS: &str = "id, number, customer_id, employee_id, status, subtotal, \
                                   discount, taxable_amount, tax_amount, total, ordered_at, \
                                   completed_at, synced";

fn purchase_line_from_row(row: &PgRow) -> StoreResult<(Uuid, PurchaseLine)> {
    let line_no: i32 = get(row, "line_no")?;
    Ok((
        get(row, "purchase_order_id")?,
        PurchaseLine {
            line_no: u32::try_from(line_no).map_err(|e| corrupt("purchase line", e))?,
            item_id: ItemId::from_uuid(get(row, "item_id")?),
            quantity: get(row, "quantity")?,
            unit_cost: get(row, "unit_cost")?,
            line_total: get(row, "line_total")?,
        },
    ))
}

fn purchase_order_from_row(row: &PgRow, lines: Vec<PurchaseLine>) -> StoreResult<PurchaseOrder> {
    let number: String = get(row, "number")?;
    let status: String = get(row, "status")?;
    Ok(PurchaseOrder {
        id: PurchaseOrderId::from_uuid(get(row, "id")?),
        number: DocumentNumber::parse(number).map_err(|e| corrupt("purchase order", e))?,
        supplier_id: SupplierId::from_uuid(get(row, "supplier_id")?),
        status: status.parse().map_err(|e| corrupt("purchase order", e))?,
        lines,
        total_amount: get(row, "total_amount")?,
        ordered_at: get(row, "ordered_at")?,
        received_at: get(row, "received_at")?,
        synced: get(row, "synced")?,
    })
}

fn sale_line_from_row(row: &PgRow) -> StoreResult<(Uuid, SaleLine)> {
    let line_no: i32 = get(row, "line_no")?;
    Ok((
        get(row, "sales_order_id")?,
        SaleLine {
            line_no: u32::try_from(line_no).map_err(|e| corrupt("sale line", e))?,
            item_id: ItemId::from_uuid(get(row, "item_id")?),
            assigned_employee_id: EmployeeId::from_uuid(get(row, "assigned_employee_id")?),
            quantity: get(row, "quantity")?,
            unit_price: get(row, "unit_price")?,
            line_total: get(row, "line_total")?,
        },
    ))
}

fn sales_order_from_row(row: &PgRow, lines: Vec<SaleLine>) -> StoreResult<SalesOrder> {
    let number: String = get(row, "number")?;
    let status: String = get(row, "status")?;
    Ok(SalesOrder {
        id: SalesOrderId::from_uuid(get(row, "id")?),
        number: DocumentNumber::parse(number).map_err(|e| corrupt("sales order", e))?,
        customer_id: CustomerId::from_uuid(get(row, "customer_id")?),
        employee_id: EmployeeId::from_uuid(get(row, "employee_id")?),
        status: status.parse().map_err(|e| corrupt("sales order", e))?,
        lines,
        totals: SalesTotals {
            subtotal: get(row, "subtotal")?,
            discount: get(row, "discount")?,
            taxable_amount: get(row, "taxable_amount")?,
            tax_amount: get(row, "tax_amount")?,
            total: get(row, "total")?,
        },
        ordered_at: get(row, "ordered_at")?,
        completed_at: get(row, "completed_at")?,
        synced: get(row, "synced")?,
    })
}

fn group_lines<L>(rows: Vec<(Uuid, L)>) -> HashMap<Uuid, Vec<L>> {
    let mut grouped: HashMap<Uuid, Vec<L>> = HashMap::new();
    for (order_id, line) in rows {
        grouped.entry(order_id).or_default().push(line);
    }
    grouped
}

impl OrderRepository for PostgresTx<'_> {
    fn documents_issued_on(&mut self, kind: DocumentKind, day: NaiveDate) -> StoreResult<u32> {
        let table = match kind {
            DocumentKind::PurchaseOrder => "purchase_orders",
            DocumentKind::SalesInvoice => "sales_orders",
        };
        let pattern = format!("{}{}%", kind.prefix(), day.format("%Y%m%d"));
        let sql = format!("SELECT COUNT(*) AS issued FROM {table} WHERE number LIKE $1");
        let row = self.fetch_optional("documents_issued_on", sqlx::query(&sql).bind(pattern))?;
        let issued: i64 = match row {
            Some(r) => get(&r, "issued")?,
            None => 0,
        };
        u32::try_from(issued).map_err(|e| corrupt("document count", e))
    }

    fn order_references(&mut self, reference: OrderReference) -> StoreResult<u64> {
        let (sql, id) = match reference {
            OrderReference::Item(id) => (
                "SELECT (SELECT COUNT(DISTINCT purchase_order_id) FROM purchase_lines \
                         WHERE item_id = $1) \
                      + (SELECT COUNT(DISTINCT sales_order_id) FROM sale_lines \
                         WHERE item_id = $1) AS refs",
                *id.as_uuid(),
            ),
            OrderReference::Supplier(id) => (
                "SELECT COUNT(*) AS refs FROM purchase_orders WHERE supplier_id = $1",
                *id.as_uuid(),
            ),
            OrderReference::Customer(id) => (
                "SELECT COUNT(*) AS refs FROM sales_orders WHERE customer_id = $1",
                *id.as_uuid(),
            ),
            OrderReference::Employee(id) => (
                "SELECT COUNT(*) AS refs FROM sales_orders o WHERE o.employee_id = $1 \
                 OR EXISTS (SELECT 1 FROM sale_lines l \
                            WHERE l.sales_order_id = o.id AND l.assigned_employee_id = $1)",
                *id.as_uuid(),
            ),
        };
        let row = self.fetch_optional("order_references", sqlx::query(sql).bind(id))?;
        let refs: i64 = match row {
            Some(r) => get(&r, "refs")?,
            None => 0,
        };
        Ok(refs.max(0) as u64)
    }

    fn insert_purchase_order(&mut self, order: &PurchaseOrder) -> StoreResult<()> {
        self.execute(
            "insert_purchase_order",
            sqlx::query(
                r#"
                INSERT INTO purchase_orders (id, number, supplier_id, status, total_amount,
                                             ordered_at, received_at, synced)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(*order.id.as_uuid())
            .bind(order.number.as_str())
            .bind(*order.supplier_id.as_uuid())
            .bind(order.status.as_str())
            .bind(order.total_amount)
            .bind(order.ordered_at)
            .bind(order.received_at)
            .bind(order.synced),
        )?;
        for line in &order.lines {
            self.execute(
                "insert_purchase_line",
                sqlx::query(
                    r#"
                    INSERT INTO purchase_lines (purchase_order_id, line_no, item_id, quantity,
                                                unit_cost, line_total)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(*order.id.as_uuid())
                .bind(line.line_no as i32)
                .bind(*line.item_id.as_uuid())
                .bind(line.quantity)
                .bind(line.unit_cost)
                .bind(line.line_total),
            )?;
        }
        Ok(())
    }

    fn purchase_order(&mut self, id: PurchaseOrderId) -> StoreResult<Option<PurchaseOrder>> {
        let sql = format!("SELECT {PURCHASE_ORDER_COLUMNS} FROM purchase_orders WHERE id = $1");
        let Some(row) = self.fetch_optional("purchase_order", sqlx::query(&sql).bind(*id.as_uuid()))?
        else {
            return Ok(None);
        };
        let line_rows = self.fetch_all(
            "purchase_lines",
            sqlx::query("SELECT * FROM purchase_lines WHERE purchase_order_id = $1 ORDER BY line_no")
                .bind(*id.as_uuid()),
        )?;
        let lines = line_rows
            .iter()
            .map(|r| purchase_line_from_row(r).map(|(_, line)| line))
            .collect::<StoreResult<Vec<_>>>()?;
        purchase_order_from_row(&row, lines).map(Some)
    }

    fn purchase_orders(&mut self) -> StoreResult<Vec<PurchaseOrder>> {
        let sql = format!("SELECT {PURCHASE_ORDER_COLUMNS} FROM purchase_orders ORDER BY ordered_at");
        let rows = self.fetch_all("purchase_orders", sqlx::query(&sql))?;
        let line_rows = self.fetch_all(
            "purchase_lines",
            sqlx::query("SELECT * FROM purchase_lines ORDER BY purchase_order_id, line_no"),
        )?;
        let mut lines = group_lines(
            line_rows
                .iter()
                .map(purchase_line_from_row)
                .collect::<StoreResult<Vec<_>>>()?,
        );
        rows.iter()
            .map(|row| {
                let id: Uuid = get(row, "id")?;
                purchase_order_from_row(row, lines.remove(&id).unwrap_or_default())
            })
            .collect()
    }

    fn transition_purchase_order(&mut self, order: &PurchaseOrder) -> StoreResult<bool> {
        let n = self.execute(
            "transition_purchase_order",
            sqlx::query(
                "UPDATE purchase_orders SET status = $2, received_at = $3 \
                 WHERE id = $1 AND status = 'pending'",
            )
            .bind(*order.id.as_uuid())
            .bind(order.status.as_str())
            .bind(order.received_at),
        )?;
        Ok(n == 1)
    }

    fn insert_sales_order(&mut self, order: &SalesOrder) -> StoreResult<()> {
        let t = &order.totals;
        self.execute(
            "insert_sales_order",
            sqlx::query(
                r#"
                INSERT INTO sales_orders (id, number, customer_id, employee_id, status,
                                          subtotal, discount, taxable_amount, tax_amount, total,
                                          ordered_at, completed_at, synced)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                "#,
            )
            .bind(*order.id.as_uuid())
            .bind(order.number.as_str())
            .bind(*order.customer_id.as_uuid())
            .bind(*order.employee_id.as_uuid())
            .bind(order.status.as_str())
            .bind(t.subtotal)
            .bind(t.discount)
            .bind(t.taxable_amount)
            .bind(t.tax_amount)
            .bind(t.total)
            .bind(order.ordered_at)
            .bind(order.completed_at)
            .bind(order.synced),
        )?;
        for line in &order.lines {
            self.execute(
                "insert_sale_line",
                sqlx::query(
                    r#"
                    INSERT INTO sale_lines (sales_order_id, line_no, item_id,
                                            assigned_employee_id, quantity, unit_price,
                                            line_total)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    "#,
                )
                .bind(*order.id.as_uuid())
                .bind(line.line_no as i32)
                .bind(*line.item_id.as_uuid())
                .bind(*line.assigned_employee_id.as_uuid())
                .bind(line.quantity)
                .bind(line.unit_price)
                .bind(line.line_total),
            )?;
        }
        Ok(())
    }

    fn sales_order(&mut self, id: SalesOrderId) -> StoreResult<Option<SalesOrder>> {
        let sql = format!("SELECT {SALES_ORDER_COLUMNS} FROM sales_orders WHERE id = $1");
        let Some(row) = self.fetch_optional("sales_order", sqlx::query(&sql).bind(*id.as_uuid()))?
        else {
            return Ok(None);
        };
        let line_rows = self.fetch_all(
            "sale_lines",
            sqlx::query("SELECT * FROM sale_lines WHERE sales_order_id = $1 ORDER BY line_no")
                .bind(*id.as_uuid()),
        )?;
        let lines = line_rows
            .iter()
            .map(|r| sale_line_from_row(r).map(|(_, line)| line))
            .collect::<StoreResult<Vec<_>>>()?;
        sales_order_from_row(&row, lines).map(Some)
    }

    fn sales_orders(&mut self) -> StoreResult<Vec<SalesOrder>> {
        let sql = format!("SELECT {SALES_ORDER_COLUMNS} FROM sales_orders ORDER BY ordered_at");
        let rows = self.fetch_all("sales_orders", sqlx::query(&sql))?;
        let line_rows = self.fetch_all(
            "sale_lines",
            sqlx::query("SELECT * FROM sale_lines ORDER BY sales_order_id, line_no"),
        )?;
        let mut lines = group_lines(
            line_rows
                .iter()
                .map(sale_line_from_row)
                .collect::<StoreResult<Vec<_>>>()?,
        );
        rows.iter()
            .map(|row| {
                let id: Uuid = get(row, "id")?;
                sales_order_from_row(row, lines.remove(&id).unwrap_or_default())
            })
            .collect()
    }

    fn transition_sales_order(&mut self, order: &SalesOrder) -> StoreResult<bool> {
        let n = self.execute(
            "transition_sales_order",
            sqlx::query(
                "UPDATE sales_orders SET status = $2, completed_at = $3 \
                 WHERE id = $1 AND status = 'pending'",
            )
            .bind(*order.id.as_uuid())
            .bind(order.status.as_str())
            .bind(order.completed_at),
        )?;
        Ok(n == 1)
    }
}

const PAYABLE_COLUMNS: &str =
    "id, purchase_order_id, supplier_id, amount, due_date, status, raised_at, paid_at";
const RECEIVABLE_COLUMNS: &str =
    "id, sales_order_id, customer_id, amount, due_date, status, raised_at, paid_at";

fn settlement_status(row: &PgRow) -> StoreResult<SettlementStatus> {
    let status: String = get(row, "status")?;
    status.parse().map_err(|e| corrupt("ledger", e))
}

fn payable_from_row(row: &PgRow) -> StoreResult<AccountsPayable> {
    Ok(AccountsPayable {
        id: PayableId::from_uuid(get(row, "id")?),
        purchase_order_id: PurchaseOrderId::from_uuid(get(row, "purchase_order_id")?),
        supplier_id: SupplierId::from_uuid(get(row, "supplier_id")?),
        amount: get(row, "amount")?,
        due_date: get(row, "due_date")?,
        status: settlement_status(row)?,
        raised_at: get(row, "raised_at")?,
        paid_at: get(row, "paid_at")?,
    })
}

fn receivable_from_row(row: &PgRow) -> StoreResult<AccountsReceivable> {
    Ok(AccountsReceivable {
        id: ReceivableId::from_uuid(get(row, "id")?),
        sales_order_id: SalesOrderId::from_uuid(get(row, "sales_order_id")?),
        customer_id: CustomerId::from_uuid(get(row, "customer_id")?),
        amount: get(row, "amount")?,
        due_date: get(row, "due_date")?,
        status: settlement_status(row)?,
        raised_at: get(row, "raised_at")?,
        paid_at: get(row, "paid_at")?,
    })
}

impl LedgerRepository for PostgresTx<'_> {
    fn insert_payable(&mut self, payable: &AccountsPayable) -> StoreResult<()> {
        self.execute(
            "insert_payable",
            sqlx::query(
                r#"
                INSERT INTO accounts_payable (id, purchase_order_id, supplier_id, amount,
                                              due_date, status, raised_at, paid_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(*payable.id.as_uuid())
            .bind(*payable.purchase_order_id.as_uuid())
            .bind(*payable.supplier_id.as_uuid())
            .bind(payable.amount)
            .bind(payable.due_date)
            .bind(payable.status.as_str())
            .bind(payable.raised_at)
            .bind(payable.paid_at),
        )?;
        Ok(())
    }

    fn payable(&mut self, id: PayableId) -> StoreResult<Option<AccountsPayable>> {
        let sql = format!("SELECT {PAYABLE_COLUMNS} FROM accounts_payable WHERE id = $1");
        let row = self.fetch_optional("payable", sqlx::query(&sql).bind(*id.as_uuid()))?;
        row.as_ref().map(payable_from_row).transpose()
    }

    fn payables(&mut self) -> StoreResult<Vec<AccountsPayable>> {
        let sql = format!("SELECT {PAYABLE_COLUMNS} FROM accounts_payable ORDER BY due_date");
        let rows = self.fetch_all("payables", sqlx::query(&sql))?;
        rows.iter().map(payable_from_row).collect()
    }

    fn settle_payable(&mut self, id: PayableId, paid_at: DateTime<Utc>) -> StoreResult<bool> {
        let n = self.execute(
            "settle_payable",
            sqlx::query(
                "UPDATE accounts_payable SET status = 'paid', paid_at = $2 \
                 WHERE id = $1 AND status = 'pending'",
            )
            .bind(*id.as_uuid())
            .bind(paid_at),
        )?;
        Ok(n == 1)
    }

    fn insert_receivable(&mut self, receivable: &AccountsReceivable) -> StoreResult<()> {
        self.execute(
            "insert_receivable",
            sqlx::query(
                r#"
                INSERT INTO accounts_receivable (id, sales_order_id, customer_id, amount,
                                                 due_date, status, raised_at, paid_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(*receivable.id.as_uuid())
            .bind(*receivable.sales_order_id.as_uuid())
            .bind(*receivable.customer_id.as_uuid())
            .bind(receivable.amount)
            .bind(receivable.due_date)
            .bind(receivable.status.as_str())
            .bind(receivable.raised_at)
            .bind(receivable.paid_at),
        )?;
        Ok(())
    }

    fn receivable(&mut self, id: ReceivableId) -> StoreResult<Option<AccountsReceivable>> {
        let sql = format!("SELECT {RECEIVABLE_COLUMNS} FROM accounts_receivable WHERE id = $1");
        let row = self.fetch_optional("receivable", sqlx::query(&sql).bind(*id.as_uuid()))?;
        row.as_ref().map(receivable_from_row).transpose()
    }

    fn receivables(&mut self) -> StoreResult<Vec<AccountsReceivable>> {
        let sql = format!("SELECT {RECEIVABLE_COLUMNS} FROM accounts_receivable ORDER BY due_date");
        let rows = self.fetch_all("receivables", sqlx::query(&sql))?;
        rows.iter().map(receivable_from_row).collect()
    }

    fn settle_receivable(
        &mut self,
        id: ReceivableId,
        paid_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let n = self.execute(
            "settle_receivable",
            sqlx::query(
                "UPDATE accounts_receivable SET status = 'paid', paid_at = $2 \
                 WHERE id = $1 AND status = 'pending'",
            )
            .bind(*id.as_uuid())
            .bind(paid_at),
        )?;
        Ok(n == 1)
    }
}

fn sync_log_from_row(row: &PgRow) -> StoreResult<SyncLogEntry> {
    let kind: String = get(row, "kind")?;
    let outcome: String = get(row, "outcome")?;
    Ok(SyncLogEntry {
        id: SyncLogId::from_uuid(get(row, "id")?),
        kind: kind.parse().map_err(|e| corrupt("sync log", e))?,
        record_type: get(row, "record_type")?,
        record_id: get(row, "record_id")?,
        outcome: outcome.parse().map_err(|e| corrupt("sync log", e))?,
        message: get(row, "message")?,
        created_at: get(row, "created_at")?,
        synced_at: get(row, "synced_at")?,
    })
}

impl SyncLogRepository for PostgresTx<'_> {
    fn append_sync_log(&mut self, entry: &SyncLogEntry) -> StoreResult<()> {
        self.execute(
            "append_sync_log",
            sqlx::query(
                r#"
                INSERT INTO sync_log (id, kind, record_type, record_id, outcome, message,
                                      created_at, synced_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(*entry.id.as_uuid())
            .bind(entry.kind.as_str())
            .bind(&entry.record_type)
            .bind(entry.record_id)
            .bind(entry.outcome.as_str())
            .bind(&entry.message)
            .bind(entry.created_at)
            .bind(entry.synced_at),
        )?;
        Ok(())
    }

    fn recent_sync_logs(&mut self, limit: usize) -> StoreResult<Vec<SyncLogEntry>> {
        let rows = self.fetch_all(
            "recent_sync_logs",
            sqlx::query(
                "SELECT id, kind, record_type, record_id, outcome, message, created_at, synced_at \
                 FROM sync_log ORDER BY created_at DESC, id DESC LIMIT $1",
            )
            .bind(i64::try_from(limit).unwrap_or(i64::MAX)),
        )?;
        rows.iter().map(sync_log_from_row).collect()
    }

    fn sync_counts(&mut self, record: SyncedRecord) -> StoreResult<SyncCounts> {
        let table = match record {
            SyncedRecord::Items => "items",
            SyncedRecord::Suppliers => "suppliers",
            SyncedRecord::Customers => "customers",
            SyncedRecord::PurchaseOrders => "purchase_orders",
            SyncedRecord::SalesOrders => "sales_orders",
        };
        let sql = format!(
            "SELECT COUNT(*) AS total, COUNT(*) FILTER (WHERE synced) AS synced FROM {table}"
        );
        let row = self.fetch_optional("sync_counts", sqlx::query(&sql))?;
        let Some(row) = row else {
            return Ok(SyncCounts::default());
        };
        let total: i64 = get(&row, "total")?;
        let synced: i64 = get(&row, "synced")?;
        Ok(SyncCounts {
            total: total.max(0) as u64,
            synced: synced.max(0) as u64,
        })
    }
}
