//! Sales Orders domain module.
//!
//! This crate contains business rules for sales orders and their pricing,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod order;
pub mod pricing;

pub use order::{
    COMPLETE_REJECTED, PlaceSalesOrder, SaleLine, SaleLineInput, SalesOrder, SalesOrderCommand,
    SalesOrderEvent, SalesOrderId, SalesOrderStatus, accept_lines,
};
pub use pricing::{SalesTotals, TaxRate};
