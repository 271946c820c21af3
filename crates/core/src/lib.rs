//! `shopledger-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod document;
pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod sync;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot};
pub use document::{DocumentKind, DocumentNumber, MAX_DAILY_SEQUENCE};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use money::{Decimal, Money, Quantity, checked_product, checked_sum, out_of_range};
pub use sync::{ExternalId, ExternalSync};
pub use value_object::ValueObject;
