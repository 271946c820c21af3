//! Low-stock alerting.

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use shopledger_catalog::{AlertAssessment, AlertId, ItemId, StockAlert, assess};
use shopledger_core::DomainError;

use crate::engine::{Engine, WorkflowResult};
use crate::store::{AlertRepository, CatalogRepository, Store};

/// Bring the item's unresolved alert in line with its current stock.
///
/// Called after every stock mutation, inside the mutating unit of work.
pub(crate) fn refresh_alert<T>(
    tx: &mut T,
    item_id: ItemId,
    now: DateTime<Utc>,
) -> WorkflowResult<Option<AlertAssessment>>
where
    T: CatalogRepository + AlertRepository,
{
    let item = tx.item(item_id)?.ok_or_else(|| {
        DomainError::not_found_or_invalid_state(format!("item {item_id} not found"))
    })?;
    let assessment = assess(&item);
    tx.set_unresolved_alert(item_id, assessment.as_ref(), now)?;
    debug!(%item_id, kind = ?assessment.as_ref().map(|a| a.kind), "alert recomputed");
    Ok(assessment)
}

impl<S: Store> Engine<S> {
    /// Recompute the alert for one item; returns what is now unresolved.
    #[instrument(skip(self))]
    pub fn recompute_alert(&self, item_id: ItemId) -> WorkflowResult<Option<AlertAssessment>> {
        let now = self.now();
        self.in_transaction(|tx| refresh_alert(tx, item_id, now))
    }

    pub fn unresolved_alerts(&self) -> WorkflowResult<Vec<StockAlert>> {
        self.in_transaction(|tx| Ok(tx.unresolved_alerts()?))
    }

    #[instrument(skip(self))]
    pub fn resolve_alert(&self, alert_id: AlertId) -> WorkflowResult<()> {
        self.in_transaction(|tx| {
            if tx.resolve_alert(alert_id)? {
                Ok(())
            } else {
                Err(DomainError::not_found_or_invalid_state(
                    "alert not found or already resolved",
                )
                .into())
            }
        })?;
        info!(%alert_id, "alert resolved");
        Ok(())
    }

    /// Delete resolved alerts; returns how many went.
    #[instrument(skip(self))]
    pub fn purge_resolved_alerts(&self) -> WorkflowResult<u64> {
        let purged = self.in_transaction(|tx| Ok(tx.purge_resolved_alerts()?))?;
        info!(purged, "resolved alerts purged");
        Ok(purged)
    }
}
