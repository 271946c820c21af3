//! Purchasing domain module (purchase orders).
//!
//! This crate contains business rules for purchase orders, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod order;

pub use order::{
    PlacePurchaseOrder, PurchaseLine, PurchaseLineInput, PurchaseOrder, PurchaseOrderCommand,
    PurchaseOrderEvent, PurchaseOrderId, PurchaseOrderStatus, RECEIVE_REJECTED, accept_lines,
};
