//! Catalog domain module: items, stock levels and stock alerts.
//!
//! This crate contains business rules for the item catalog, implemented purely
//! as deterministic domain logic (no IO, no HTTP, no storage).

pub mod alert;
pub mod item;

pub use alert::{AlertAssessment, AlertId, AlertKind, StockAlert, assess};
pub use item::{CatalogEvent, Item, ItemId, ItemUpdate, NewItem, Sku};
