//! Reconciliation with the external accounting ledger.
//!
//! Pure rules only: external record shapes, the source/target seams, identity
//! matching and the sync log model. Running a batch against storage is done by
//! the infra workflows.

pub mod ledger;
pub mod log;
pub mod matching;
pub mod record;
pub mod status;

pub use ledger::{
    Batch, ExportKind, ExportRecord, LedgerError, LedgerSource, LedgerTarget,
    SampleLedgerSource, SimulatedLedgerTarget,
};
pub use log::{SyncKind, SyncLogEntry, SyncLogId, SyncOutcome};
pub use matching::{MatchOutcome, match_record};
pub use record::{ExternalItem, ExternalParty};
pub use status::{BulkImportSummary, ImportSummary, SyncCounts, SyncStatus};
