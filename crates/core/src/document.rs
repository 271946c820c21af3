//! Business document numbers (purchase orders, sales invoices).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Which kind of document a number belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    PurchaseOrder,
    SalesInvoice,
}

impl DocumentKind {
    pub fn prefix(self) -> &'static str {
        match self {
            DocumentKind::PurchaseOrder => "PO",
            DocumentKind::SalesInvoice => "INV",
        }
    }
}

/// Highest daily sequence that fits the four-digit suffix.
pub const MAX_DAILY_SEQUENCE: u32 = 9999;

/// Human-facing document number: `<prefix><YYYYMMDD><4-digit sequence>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentNumber(String);

impl ValueObject for DocumentNumber {}

impl DocumentNumber {
    /// Compose a number for `kind` issued at `at` with the given daily sequence.
    ///
    /// Sequences run from 1 to [`MAX_DAILY_SEQUENCE`]; anything else would not
    /// fit the four-digit suffix and is refused.
    pub fn compose(kind: DocumentKind, at: DateTime<Utc>, sequence: u32) -> DomainResult<Self> {
        if !(1..=MAX_DAILY_SEQUENCE).contains(&sequence) {
            return Err(DomainError::invariant(format!(
                "{} sequence {sequence} for {} is outside 1..={MAX_DAILY_SEQUENCE}",
                kind.prefix(),
                at.format("%Y-%m-%d")
            )));
        }
        Ok(Self(format!(
            "{}{}{:04}",
            kind.prefix(),
            at.format("%Y%m%d"),
            sequence
        )))
    }

    /// Wrap an already-issued number (e.g. loaded from storage).
    pub fn parse(raw: impl Into<String>) -> DomainResult<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(DomainError::validation("document number cannot be empty"));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for DocumentNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
