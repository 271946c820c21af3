//! External-ledger synchronisation state carried by reconcilable records.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Identifier a record carries in the external accounting ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(String);

impl ValueObject for ExternalId {}

impl ExternalId {
    pub fn new(raw: impl Into<String>) -> DomainResult<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("external id cannot be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ExternalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-record sync flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalSync {
    pub synced: bool,
    pub external_id: Option<ExternalId>,
}

impl ExternalSync {
    /// State of a record that arrived from the external ledger.
    pub fn imported(external_id: ExternalId) -> Self {
        Self {
            synced: true,
            external_id: Some(external_id),
        }
    }

    /// Mark synced, adopting `external_id` only when none is recorded yet.
    pub fn reconcile(&mut self, external_id: &ExternalId) {
        self.synced = true;
        if self.external_id.is_none() {
            self.external_id = Some(external_id.clone());
        }
    }
}
