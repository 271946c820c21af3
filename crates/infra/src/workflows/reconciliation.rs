//! Batch reconciliation with the external accounting ledger.
//!
//! Exports push local records through a [`LedgerTarget`] and log every
//! attempt. Imports pull whole batches from a [`LedgerSource`] and land them
//! in one unit of work; a batch that fails rolls back completely and its
//! failure is logged in a unit of work of its own.

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use shopledger_catalog::{ItemId, Sku};
use shopledger_core::DomainError;
use shopledger_core::id::Uuid;
use shopledger_events::AuditEntry;
use shopledger_parties::{CustomerId, PartyKind, SupplierId};
use shopledger_reconciliation::{
    Batch, BulkImportSummary, ExportKind, ExportRecord, ExternalItem, ExternalParty,
    ImportSummary, LedgerSource, LedgerTarget, MatchOutcome, SyncKind, SyncLogEntry, SyncStatus,
    match_record,
};

use super::alerting::refresh_alert;
use crate::engine::{Engine, WorkflowError, WorkflowResult};
use crate::store::{
    AlertRepository, CatalogRepository, PartyRepository, Store, SyncLogRepository, SyncedRecord,
};

/// Sync log entries shown by [`Engine::sync_status`].
pub const RECENT_SYNC_LOGS: usize = 50;

const BATCH_RECORD_TYPE: &str = "Bulk";

/// Push one record and log the attempt. A rejected push is logged, not raised.
fn push_and_log<T: SyncLogRepository>(
    tx: &mut T,
    target: &dyn LedgerTarget,
    kind: SyncKind,
    record_type: &str,
    record: &ExportRecord,
    now: DateTime<Utc>,
) -> WorkflowResult<SyncLogEntry> {
    let local_id = Some(record.local_id());
    let entry = match target.push(record) {
        Ok(message) => SyncLogEntry::success(kind, record_type, local_id, message, now),
        Err(e) => {
            warn!(%record_type, local_id = %record.local_id(), error = %e, "ledger push failed");
            SyncLogEntry::failed(kind, record_type, local_id, e.to_string(), now)
        }
    };
    tx.append_sync_log(&entry)?;
    Ok(entry)
}

fn mark_synced<T: CatalogRepository + PartyRepository>(
    tx: &mut T,
    kind: ExportKind,
    local_id: Uuid,
) -> WorkflowResult<bool> {
    Ok(match kind {
        ExportKind::Items => tx.mark_item_synced(ItemId::from_uuid(local_id))?,
        ExportKind::Suppliers => tx.mark_supplier_synced(SupplierId::from_uuid(local_id))?,
        ExportKind::Customers => tx.mark_customer_synced(CustomerId::from_uuid(local_id))?,
    })
}

fn not_found(what: &str, id: impl core::fmt::Display) -> DomainError {
    DomainError::not_found_or_invalid_state(format!("{what} {id} not found"))
}

fn import_items_into<T>(
    tx: &mut T,
    batch: &Batch<ExternalItem>,
    now: DateTime<Utc>,
) -> WorkflowResult<ImportSummary>
where
    T: CatalogRepository + AlertRepository,
{
    let mut summary = ImportSummary {
        note: batch.note.clone(),
        ..ImportSummary::default()
    };
    for record in &batch.records {
        let by_external_id = tx.item_by_external_id(&record.external_id)?;
        let outcome = match_record(by_external_id, || -> WorkflowResult<_> {
            let sku = Sku::new(record.sku.clone())?;
            Ok(tx.item_by_sku(&sku)?)
        })?;
        debug!(sku = %record.sku, matched = outcome.kind(), "ledger item matched");

        let item_id = match outcome {
            MatchOutcome::ByExternalId(mut item) | MatchOutcome::ByNaturalKey(mut item) => {
                record.merge_into(&mut item);
                tx.update_item(&item)?;
                summary.updated += 1;
                item.id
            }
            MatchOutcome::Unmatched => {
                let item = record.to_item(ItemId::new(), now)?;
                tx.insert_item(&item)?;
                summary.imported += 1;
                item.id
            }
        };
        refresh_alert(tx, item_id, now)?;
    }
    Ok(summary)
}

fn import_suppliers_into<T: PartyRepository>(
    tx: &mut T,
    batch: &Batch<ExternalParty>,
) -> WorkflowResult<ImportSummary> {
    let mut summary = ImportSummary {
        note: batch.note.clone(),
        ..ImportSummary::default()
    };
    for record in &batch.records {
        let by_external_id = tx.supplier_by_external_id(&record.external_id)?;
        let outcome = match_record(by_external_id, || tx.supplier_by_name(&record.name))?;
        debug!(name = %record.name, matched = outcome.kind(), "ledger supplier matched");

        match outcome {
            MatchOutcome::ByExternalId(mut supplier) | MatchOutcome::ByNaturalKey(mut supplier) => {
                record.merge_into_supplier(&mut supplier);
                tx.update_supplier(&supplier)?;
                summary.updated += 1;
            }
            MatchOutcome::Unmatched => {
                tx.insert_supplier(&record.to_supplier(SupplierId::new()))?;
                summary.imported += 1;
            }
        }
    }
    Ok(summary)
}

fn import_customers_into<T: PartyRepository>(
    tx: &mut T,
    batch: &Batch<ExternalParty>,
) -> WorkflowResult<ImportSummary> {
    let mut summary = ImportSummary {
        note: batch.note.clone(),
        ..ImportSummary::default()
    };
    for record in &batch.records {
        let by_external_id = tx.customer_by_external_id(&record.external_id)?;
        let outcome = match_record(by_external_id, || tx.customer_by_name(&record.name))?;
        debug!(name = %record.name, matched = outcome.kind(), "ledger customer matched");

        match outcome {
            MatchOutcome::ByExternalId(mut customer) | MatchOutcome::ByNaturalKey(mut customer) => {
                record.merge_into_customer(&mut customer);
                tx.update_customer(&customer)?;
                summary.updated += 1;
            }
            MatchOutcome::Unmatched => {
                tx.insert_customer(&record.to_customer(CustomerId::new()))?;
                summary.imported += 1;
            }
        }
    }
    Ok(summary)
}

impl<S: Store> Engine<S> {
    /// Push one item to the ledger; marks it synced when accepted.
    #[instrument(skip(self, target))]
    pub fn sync_item(&self, id: ItemId, target: &dyn LedgerTarget) -> WorkflowResult<SyncLogEntry> {
        let now = self.now();
        let (entry, name) = self.in_transaction(|tx| {
            let item = tx.item(id)?.ok_or_else(|| not_found("item", id))?;
            let record = ExportRecord::from(&item);
            let entry = push_and_log(tx, target, SyncKind::Item, "Item", &record, now)?;
            if entry.is_success() {
                tx.mark_item_synced(id)?;
            }
            Ok((entry, item.name))
        })?;
        self.record_export(&entry, &name);
        Ok(entry)
    }

    #[instrument(skip(self, target))]
    pub fn sync_supplier(
        &self,
        id: SupplierId,
        target: &dyn LedgerTarget,
    ) -> WorkflowResult<SyncLogEntry> {
        let now = self.now();
        let (entry, name) = self.in_transaction(|tx| {
            let supplier = tx.supplier(id)?.ok_or_else(|| not_found("supplier", id))?;
            let record = ExportRecord::from(&supplier);
            let entry = push_and_log(tx, target, SyncKind::Supplier, "Supplier", &record, now)?;
            if entry.is_success() {
                tx.mark_supplier_synced(id)?;
            }
            Ok((entry, supplier.name))
        })?;
        self.record_export(&entry, &name);
        Ok(entry)
    }

    #[instrument(skip(self, target))]
    pub fn sync_customer(
        &self,
        id: CustomerId,
        target: &dyn LedgerTarget,
    ) -> WorkflowResult<SyncLogEntry> {
        let now = self.now();
        let (entry, name) = self.in_transaction(|tx| {
            let customer = tx.customer(id)?.ok_or_else(|| not_found("customer", id))?;
            let record = ExportRecord::from(&customer);
            let entry = push_and_log(tx, target, SyncKind::Customer, "Customer", &record, now)?;
            if entry.is_success() {
                tx.mark_customer_synced(id)?;
            }
            Ok((entry, customer.name))
        })?;
        self.record_export(&entry, &name);
        Ok(entry)
    }

    fn record_export(&self, entry: &SyncLogEntry, name: &str) {
        if entry.is_success() {
            info!(record_type = %entry.record_type, %name, "record synced to ledger");
            self.audit_entry(AuditEntry::new(
                "reconciliation.record.synced",
                format!("Synced {} to ledger: {name}", entry.record_type),
                entry.created_at,
            ));
        }
    }

    /// Push every unsynced record of `kind` and log one summary entry.
    ///
    /// Returns how many records were newly marked synced. Records the target
    /// rejects stay unsynced for the next run.
    #[instrument(skip(self, target))]
    pub fn bulk_sync(&self, kind: ExportKind, target: &dyn LedgerTarget) -> WorkflowResult<usize> {
        let now = self.now();
        let result = self.in_transaction(|tx| {
            let records: Vec<ExportRecord> = match kind {
                ExportKind::Items => tx.unsynced_items()?.iter().map(ExportRecord::from).collect(),
                ExportKind::Suppliers => tx
                    .unsynced_suppliers()?
                    .iter()
                    .map(ExportRecord::from)
                    .collect(),
                ExportKind::Customers => tx
                    .unsynced_customers()?
                    .iter()
                    .map(ExportRecord::from)
                    .collect(),
            };

            let (mut synced, mut failed) = (0usize, 0usize);
            for record in &records {
                match target.push(record) {
                    Ok(_) => {
                        if mark_synced(tx, kind, record.local_id())? {
                            synced += 1;
                        }
                    }
                    Err(e) => {
                        warn!(local_id = %record.local_id(), error = %e, "ledger push failed");
                        failed += 1;
                    }
                }
            }

            let noun = kind.noun();
            let entry = if failed == 0 {
                SyncLogEntry::success(
                    SyncKind::Bulk,
                    kind.record_type(),
                    None,
                    format!("Bulk sync completed: {synced} {noun} synced"),
                    now,
                )
            } else {
                SyncLogEntry::failed(
                    SyncKind::Bulk,
                    kind.record_type(),
                    None,
                    format!("Bulk sync completed: {synced} {noun} synced, {failed} failed"),
                    now,
                )
            };
            tx.append_sync_log(&entry)?;
            Ok((entry, synced))
        });

        let (entry, synced) = result?;
        info!(%synced, message = %entry.message, "bulk sync finished");
        self.audit_entry(AuditEntry::new("reconciliation.bulk_sync", entry.message, now));
        Ok(synced)
    }

    /// Import the ledger's stock items.
    ///
    /// Each record matches a local item by external id first, then by SKU.
    /// Imported stock levels overwrite local ones, so alerts are recomputed.
    #[instrument(skip(self, source))]
    pub fn import_items(&self, source: &dyn LedgerSource) -> WorkflowResult<ImportSummary> {
        let now = self.now();
        let result = source
            .fetch_items()
            .map_err(WorkflowError::from)
            .and_then(|batch| {
                self.in_transaction(|tx| {
                    let summary = import_items_into(tx, &batch, now)?;
                    tx.append_sync_log(&SyncLogEntry::success(
                        SyncKind::ImportItems,
                        BATCH_RECORD_TYPE,
                        None,
                        summary.message("items"),
                        now,
                    ))?;
                    Ok(summary)
                })
            });
        self.finish_import(SyncKind::ImportItems, "items", result, now)
    }

    /// Import the ledger's suppliers or customers, matched by external id,
    /// then by name.
    #[instrument(skip(self, source))]
    pub fn import_parties(
        &self,
        kind: PartyKind,
        source: &dyn LedgerSource,
    ) -> WorkflowResult<ImportSummary> {
        let now = self.now();
        let (sync_kind, noun) = match kind {
            PartyKind::Supplier => (SyncKind::ImportSuppliers, "suppliers"),
            PartyKind::Customer => (SyncKind::ImportCustomers, "customers"),
        };
        let result = source
            .fetch_parties(kind)
            .map_err(WorkflowError::from)
            .and_then(|batch| {
                self.in_transaction(|tx| {
                    let summary = match kind {
                        PartyKind::Supplier => import_suppliers_into(tx, &batch)?,
                        PartyKind::Customer => import_customers_into(tx, &batch)?,
                    };
                    tx.append_sync_log(&SyncLogEntry::success(
                        sync_kind,
                        BATCH_RECORD_TYPE,
                        None,
                        summary.message(noun),
                        now,
                    ))?;
                    Ok(summary)
                })
            });
        self.finish_import(sync_kind, noun, result, now)
    }

    /// Items, then suppliers, then customers, each as its own batch.
    ///
    /// Stops at the first batch that fails; batches before it stay committed.
    #[instrument(skip(self, source))]
    pub fn bulk_import(&self, source: &dyn LedgerSource) -> WorkflowResult<BulkImportSummary> {
        Ok(BulkImportSummary {
            items: self.import_items(source)?,
            suppliers: self.import_parties(PartyKind::Supplier, source)?,
            customers: self.import_parties(PartyKind::Customer, source)?,
        })
    }

    fn finish_import(
        &self,
        kind: SyncKind,
        noun: &str,
        result: WorkflowResult<ImportSummary>,
        now: DateTime<Utc>,
    ) -> WorkflowResult<ImportSummary> {
        match result {
            Ok(summary) => {
                info!(
                    imported = summary.imported,
                    updated = summary.updated,
                    "{noun} imported from ledger"
                );
                self.audit_entry(AuditEntry::new(
                    format!("reconciliation.import.{noun}"),
                    summary.message(noun),
                    now,
                ));
                Ok(summary)
            }
            Err(e) => {
                warn!(error = %e, "{noun} import failed");
                let entry = SyncLogEntry::failed(
                    kind,
                    BATCH_RECORD_TYPE,
                    None,
                    format!("Import failed: {e}"),
                    now,
                );
                if let Err(log_err) = self.in_transaction(|tx| Ok(tx.append_sync_log(&entry)?)) {
                    warn!(error = %log_err, "could not log failed import");
                }
                Err(e)
            }
        }
    }

    /// Sync coverage per record kind plus the latest sync log entries.
    pub fn sync_status(&self) -> WorkflowResult<SyncStatus> {
        self.in_transaction(|tx| {
            Ok(SyncStatus {
                items: tx.sync_counts(SyncedRecord::Items)?,
                suppliers: tx.sync_counts(SyncedRecord::Suppliers)?,
                customers: tx.sync_counts(SyncedRecord::Customers)?,
                purchase_orders: tx.sync_counts(SyncedRecord::PurchaseOrders)?,
                sales_orders: tx.sync_counts(SyncedRecord::SalesOrders)?,
                recent: tx.recent_sync_logs(RECENT_SYNC_LOGS)?,
            })
        })
    }
}
