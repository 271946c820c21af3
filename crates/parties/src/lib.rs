//! Parties domain module (suppliers, customers, employees and their tasks).
//!
//! This crate contains business rules for the counterparties that orders
//! reference, implemented purely as deterministic domain logic (no IO, no
//! storage).

pub mod party;
pub mod task;

pub use party::{
    ContactInfo, Customer, CustomerId, CustomerUpdate, Employee, EmployeeId, NewCustomer,
    NewEmployee, NewSupplier, PartyEvent, PartyKind, Supplier, SupplierId, SupplierUpdate,
};
pub use task::{EmployeeTask, NewTask, TaskEvent, TaskId, TaskPriority, TaskStatus};
