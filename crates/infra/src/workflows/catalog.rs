use tracing::{info, instrument, warn};

use shopledger_catalog::{CatalogEvent, Item, ItemId, ItemUpdate, NewItem};
use shopledger_core::{DomainError, Quantity};

use super::alerting::refresh_alert;
use crate::engine::{Engine, WorkflowResult};
use crate::store::{CatalogRepository, OrderRepository, OrderReference, Store};

fn item_not_found(id: ItemId) -> DomainError {
    DomainError::not_found_or_invalid_state(format!("item {id} not found"))
}

fn sku_taken(item: &Item) -> DomainError {
    DomainError::duplicate_key(format!("SKU {} already exists", item.sku))
}

/// Refusal to delete a record that orders still point at.
pub(crate) fn still_referenced(what: impl core::fmt::Display, orders: u64) -> DomainError {
    DomainError::validation(format!("{what} is referenced by {orders} order(s)"))
}

impl<S: Store> Engine<S> {
    pub fn get_item(&self, id: ItemId) -> WorkflowResult<Option<Item>> {
        self.in_transaction(|tx| Ok(tx.item(id)?))
    }

    /// All items, ordered by SKU.
    pub fn list_items(&self) -> WorkflowResult<Vec<Item>> {
        self.in_transaction(|tx| Ok(tx.items()?))
    }

    /// Register an item. Its alert is evaluated straight away.
    #[instrument(skip(self, input), fields(sku = %input.sku))]
    pub fn create_item(&self, input: NewItem) -> WorkflowResult<Item> {
        let now = self.now();
        let item = Item::create(ItemId::new(), input, self.policy().default_min_stock, now)?;

        self.in_transaction(|tx| {
            if tx.item_by_sku(&item.sku)?.is_some() {
                return Err(sku_taken(&item).into());
            }
            tx.insert_item(&item)?;
            refresh_alert(tx, item.id, now)?;
            Ok(())
        })?;

        info!(item_id = %item.id, "item created");
        self.audit(&[CatalogEvent::ItemCreated {
            item_id: item.id,
            sku: item.sku.clone(),
            name: item.name.clone(),
            occurred_at: now,
        }]);
        Ok(item)
    }

    /// Replace an item's editable fields, SKU included.
    #[instrument(skip(self, update))]
    pub fn update_item(&self, id: ItemId, update: ItemUpdate) -> WorkflowResult<Item> {
        let now = self.now();
        let item = self.in_transaction(|tx| {
            let mut item = tx.item(id)?.ok_or_else(|| item_not_found(id))?;
            item.apply_update(update)?;
            if let Some(other) = tx.item_by_sku(&item.sku)? {
                if other.id != id {
                    return Err(sku_taken(&item).into());
                }
            }
            if !tx.update_item(&item)? {
                return Err(item_not_found(id).into());
            }
            refresh_alert(tx, id, now)?;
            Ok(item)
        })?;

        info!(item_id = %id, "item updated");
        self.audit(&[CatalogEvent::ItemUpdated {
            item_id: id,
            sku: item.sku.clone(),
            name: item.name.clone(),
            occurred_at: now,
        }]);
        Ok(item)
    }

    /// Add `delta` to stock; negative deltas may take it below zero.
    #[instrument(skip(self))]
    pub fn adjust_stock(&self, id: ItemId, delta: Quantity) -> WorkflowResult<Quantity> {
        let now = self.now();
        let (item, new_stock) = self.in_transaction(|tx| {
            let new_stock = tx.adjust_stock(id, delta)?.ok_or_else(|| item_not_found(id))?;
            refresh_alert(tx, id, now)?;
            let item = tx.item(id)?.ok_or_else(|| item_not_found(id))?;
            Ok((item, new_stock))
        })?;

        info!(item_id = %id, %delta, %new_stock, "stock adjusted");
        self.audit(&[CatalogEvent::StockAdjusted {
            item_id: id,
            sku: item.sku,
            delta,
            new_stock,
            occurred_at: now,
        }]);
        Ok(new_stock)
    }

    /// Delete an item and its alerts.
    ///
    /// Refused while any purchase or sales order has a line for it.
    #[instrument(skip(self))]
    pub fn delete_item(&self, id: ItemId) -> WorkflowResult<()> {
        let now = self.now();
        let item = self
            .in_transaction(|tx| {
                let item = tx.item(id)?.ok_or_else(|| item_not_found(id))?;
                let orders = tx.order_references(OrderReference::Item(id))?;
                if orders > 0 {
                    return Err(still_referenced(format!("item {}", item.sku), orders).into());
                }
                if !tx.delete_item(id)? {
                    return Err(item_not_found(id).into());
                }
                Ok(item)
            })
            .inspect_err(|e| warn!(item_id = %id, error = %e, "item not deleted"))?;

        info!(item_id = %id, "item deleted");
        self.audit(&[CatalogEvent::ItemRemoved {
            item_id: id,
            sku: item.sku,
            name: item.name,
            occurred_at: now,
        }]);
        Ok(())
    }
}
