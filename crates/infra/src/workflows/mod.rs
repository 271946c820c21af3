//! Operations of the engine, grouped by area.
//!
//! Each public method runs in exactly one unit of work (imports write their
//! failure log in a second one after the first has rolled back).

pub mod alerting;
pub mod catalog;
pub mod parties;
pub mod procurement;
pub mod reconciliation;
pub mod sales;
pub mod settlement;

pub use procurement::PurchaseOrderRequest;
pub use sales::SalesOrderRequest;
