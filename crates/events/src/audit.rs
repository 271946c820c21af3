//! Audit trail: one structured entry per action a workflow completes.
//!
//! The core only needs somewhere to `record` entries; displaying them is a
//! concern of whatever sits in front of the engine.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Event;

/// One audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Stable action name, e.g. "sales.order.completed".
    pub action: String,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        action: impl Into<String>,
        description: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            action: action.into(),
            description: description.into(),
            occurred_at,
        }
    }

    pub fn from_event<E: Event>(event: &E) -> Self {
        Self::new(event.event_type(), event.describe(), event.occurred_at())
    }
}

/// Destination for audit entries.
///
/// Recording must not fail the business operation that produced the entry
/// (it is called after commit), so the contract is infallible.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry);
}

impl<S> AuditSink for Arc<S>
where
    S: AuditSink + ?Sized,
{
    fn record(&self, entry: AuditEntry) {
        (**self).record(entry)
    }
}

/// In-memory audit trail for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far, oldest first.
    pub fn entries(&self) -> Vec<AuditEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn actions(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.action).collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, entry: AuditEntry) {
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}

/// Forwards audit entries to `tracing` under the `audit` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, entry: AuditEntry) {
        tracing::info!(
            target: "audit",
            action = %entry.action,
            occurred_at = %entry.occurred_at,
            "{}",
            entry.description
        );
    }
}
