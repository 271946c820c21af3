//! Document number issuance.
//!
//! Numbers are `<prefix><YYYYMMDD><4-digit sequence>`. The sequence is seeded
//! from the documents already stored for the day, so it survives restarts;
//! uniqueness is still enforced by the store, and the engine retries in a
//! fresh transaction when a number turns out to be taken.

use chrono::{DateTime, Utc};

use shopledger_core::{DocumentKind, DocumentNumber, DomainResult};

pub trait DocumentNumbers: Send + Sync {
    /// Number for the next document of `kind` issued at `at`, given how many
    /// of that kind are already stored for the same day.
    ///
    /// Fails once the day's four-digit sequence is used up.
    fn next(
        &self,
        kind: DocumentKind,
        at: DateTime<Utc>,
        issued_today: u32,
    ) -> DomainResult<DocumentNumber>;
}

/// Per-day counter: the next free sequence after what is stored.
#[derive(Debug, Default, Clone, Copy)]
pub struct DailySequence;

impl DocumentNumbers for DailySequence {
    fn next(
        &self,
        kind: DocumentKind,
        at: DateTime<Utc>,
        issued_today: u32,
    ) -> DomainResult<DocumentNumber> {
        DocumentNumber::compose(kind, at, issued_today.saturating_add(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn continues_after_stored_documents() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap();
        let n = DailySequence.next(DocumentKind::PurchaseOrder, at, 0).unwrap();
        assert_eq!(n.as_str(), "PO202406010001");
        let n = DailySequence.next(DocumentKind::SalesInvoice, at, 41).unwrap();
        assert_eq!(n.as_str(), "INV202406010042");
    }

    #[test]
    fn refuses_a_ten_thousandth_document_in_one_day() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap();
        assert!(DailySequence.next(DocumentKind::SalesInvoice, at, 9998).is_ok());
        assert!(DailySequence.next(DocumentKind::SalesInvoice, at, 9999).is_err());
    }
}
