//! Append-only log of sync attempts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopledger_core::DomainError;
use shopledger_core::id::Uuid;

shopledger_core::uuid_id!(
    /// Sync log entry identifier.
    SyncLogId, "SyncLogId"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncKind {
    Item,
    Supplier,
    Customer,
    Bulk,
    ImportItems,
    ImportSuppliers,
    ImportCustomers,
}

impl SyncKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncKind::Item => "ITEM",
            SyncKind::Supplier => "SUPPLIER",
            SyncKind::Customer => "CUSTOMER",
            SyncKind::Bulk => "BULK",
            SyncKind::ImportItems => "IMPORT_ITEMS",
            SyncKind::ImportSuppliers => "IMPORT_SUPPLIERS",
            SyncKind::ImportCustomers => "IMPORT_CUSTOMERS",
        }
    }
}

impl core::str::FromStr for SyncKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "ITEM" => SyncKind::Item,
            "SUPPLIER" => SyncKind::Supplier,
            "CUSTOMER" => SyncKind::Customer,
            "BULK" => SyncKind::Bulk,
            "IMPORT_ITEMS" => SyncKind::ImportItems,
            "IMPORT_SUPPLIERS" => SyncKind::ImportSuppliers,
            "IMPORT_CUSTOMERS" => SyncKind::ImportCustomers,
            other => return Err(DomainError::validation(format!("unknown sync kind: {other}"))),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOutcome {
    Success,
    Failed,
}

impl SyncOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncOutcome::Success => "success",
            SyncOutcome::Failed => "failed",
        }
    }
}

impl core::str::FromStr for SyncOutcome {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(SyncOutcome::Success),
            "failed" => Ok(SyncOutcome::Failed),
            other => Err(DomainError::validation(format!("unknown sync outcome: {other}"))),
        }
    }
}

/// One sync attempt. `record_id` is absent for batch entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncLogEntry {
    pub id: SyncLogId,
    pub kind: SyncKind,
    pub record_type: String,
    pub record_id: Option<Uuid>,
    pub outcome: SyncOutcome,
    pub message: String,
    pub created_at: DateTime<Utc>,
    /// Set only for successful attempts.
    pub synced_at: Option<DateTime<Utc>>,
}

impl SyncLogEntry {
    pub fn success(
        kind: SyncKind,
        record_type: impl Into<String>,
        record_id: Option<Uuid>,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SyncLogId::new(),
            kind,
            record_type: record_type.into(),
            record_id,
            outcome: SyncOutcome::Success,
            message: message.into(),
            created_at: now,
            synced_at: Some(now),
        }
    }

    pub fn failed(
        kind: SyncKind,
        record_type: impl Into<String>,
        record_id: Option<Uuid>,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SyncLogId::new(),
            kind,
            record_type: record_type.into(),
            record_id,
            outcome: SyncOutcome::Failed,
            message: message.into(),
            created_at: now,
            synced_at: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == SyncOutcome::Success
    }
}
