use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopledger_core::{
    DomainError, DomainResult, Entity, ExternalSync, Money, Quantity, ValueObject,
};
use shopledger_events::Event;

shopledger_core::uuid_id!(
    /// Catalog item identifier.
    ItemId, "ItemId"
);

/// Stock keeping unit: the item's natural key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sku(String);

impl ValueObject for Sku {}

impl Sku {
    pub fn new(raw: impl Into<String>) -> DomainResult<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("SKU cannot be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Sku {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Catalog item with its current stock level.
///
/// `stock` is expected to equal received purchase quantities minus completed
/// sale quantities; imports from the external ledger overwrite it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub sku: Sku,
    pub name: String,
    pub category: Option<String>,
    pub stock: Quantity,
    /// Threshold at or below which the item is considered low on stock.
    pub min_stock: Quantity,
    pub cost_price: Money,
    pub selling_price: Money,
    pub sync: ExternalSync,
    pub created_at: DateTime<Utc>,
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Input for registering a new item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub stock: Quantity,
    /// Falls back to the configured default threshold when absent.
    pub min_stock: Option<Quantity>,
    pub cost_price: Money,
    pub selling_price: Money,
}

/// Full replacement of an item's editable fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUpdate {
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub stock: Quantity,
    pub min_stock: Quantity,
    pub cost_price: Money,
    pub selling_price: Money,
}

fn required_name(name: &str) -> DomainResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("item name cannot be empty"));
    }
    Ok(trimmed.to_string())
}

impl Item {
    pub fn create(
        id: ItemId,
        input: NewItem,
        default_min_stock: Quantity,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(Self {
            id,
            sku: Sku::new(input.sku)?,
            name: required_name(&input.name)?,
            category: input.category,
            stock: input.stock,
            min_stock: input.min_stock.unwrap_or(default_min_stock),
            cost_price: input.cost_price,
            selling_price: input.selling_price,
            sync: ExternalSync::default(),
            created_at: now,
        })
    }

    pub fn apply_update(&mut self, update: ItemUpdate) -> DomainResult<()> {
        let sku = Sku::new(update.sku)?;
        let name = required_name(&update.name)?;
        self.sku = sku;
        self.name = name;
        self.category = update.category;
        self.stock = update.stock;
        self.min_stock = update.min_stock;
        self.cost_price = update.cost_price;
        self.selling_price = update.selling_price;
        Ok(())
    }

    pub fn has_available(&self, requested: Quantity) -> bool {
        self.stock >= requested
    }

    /// Stock valued at cost, pinned to the decimal bounds if it overflows.
    pub fn stock_value(&self) -> Money {
        self.stock.saturating_mul(self.cost_price)
    }
}

/// Catalog facts recorded in the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatalogEvent {
    ItemCreated {
        item_id: ItemId,
        sku: Sku,
        name: String,
        occurred_at: DateTime<Utc>,
    },
    ItemUpdated {
        item_id: ItemId,
        sku: Sku,
        name: String,
        occurred_at: DateTime<Utc>,
    },
    StockAdjusted {
        item_id: ItemId,
        sku: Sku,
        delta: Quantity,
        new_stock: Quantity,
        occurred_at: DateTime<Utc>,
    },
    ItemRemoved {
        item_id: ItemId,
        sku: Sku,
        name: String,
        occurred_at: DateTime<Utc>,
    },
}

impl Event for CatalogEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CatalogEvent::ItemCreated { .. } => "catalog.item.created",
            CatalogEvent::ItemUpdated { .. } => "catalog.item.updated",
            CatalogEvent::StockAdjusted { .. } => "catalog.item.stock_adjusted",
            CatalogEvent::ItemRemoved { .. } => "catalog.item.removed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CatalogEvent::ItemCreated { occurred_at, .. }
            | CatalogEvent::ItemUpdated { occurred_at, .. }
            | CatalogEvent::StockAdjusted { occurred_at, .. }
            | CatalogEvent::ItemRemoved { occurred_at, .. } => *occurred_at,
        }
    }

    fn describe(&self) -> String {
        match self {
            CatalogEvent::ItemCreated { sku, name, .. } => {
                format!("Added item: {name} (SKU: {sku})")
            }
            CatalogEvent::ItemUpdated { sku, name, .. } => {
                format!("Edited item: {name} (SKU: {sku})")
            }
            CatalogEvent::StockAdjusted {
                sku,
                delta,
                new_stock,
                ..
            } => format!("Adjusted stock of {sku} by {delta}, now {new_stock}"),
            CatalogEvent::ItemRemoved { sku, name, .. } => {
                format!("Deleted item: {name} (SKU: {sku})")
            }
        }
    }
}
