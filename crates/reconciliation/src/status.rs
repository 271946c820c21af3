//! Batch results and the sync dashboard.

use serde::{Deserialize, Serialize};

use crate::log::SyncLogEntry;

/// Outcome of one import batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Records inserted locally.
    pub imported: usize,
    /// Local records overwritten from the ledger.
    pub updated: usize,
    pub note: String,
}

impl ImportSummary {
    /// Sync-log message for the batch, e.g. "Imported 2 new items, updated 3 items ...".
    pub fn message(&self, noun: &str) -> String {
        format!(
            "Imported {} new {noun}, updated {} {noun} from the ledger. {}",
            self.imported, self.updated, self.note
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkImportSummary {
    pub items: ImportSummary,
    pub suppliers: ImportSummary,
    pub customers: ImportSummary,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCounts {
    pub total: u64,
    pub synced: u64,
}

impl SyncCounts {
    pub fn pending(&self) -> u64 {
        self.total.saturating_sub(self.synced)
    }
}

/// Per-kind sync coverage plus the latest sync log entries, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub items: SyncCounts,
    pub suppliers: SyncCounts,
    pub customers: SyncCounts,
    pub purchase_orders: SyncCounts,
    pub sales_orders: SyncCounts,
    pub recent: Vec<SyncLogEntry>,
}
