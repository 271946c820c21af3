//! Domain error model.

use thiserror::Error;

use crate::money::Quantity;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, state transitions). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A required reference or value is missing or malformed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The target entity is missing, or not in the state the transition needs.
    #[error("{0}")]
    NotFoundOrInvalidState(String),

    /// Requested quantity exceeds what is currently on hand.
    #[error("insufficient stock for {item}: available {available}")]
    InsufficientStock { item: String, available: Quantity },

    /// A natural key (SKU, document number, ...) is already taken.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found_or_invalid_state(msg: impl Into<String>) -> Self {
        Self::NotFoundOrInvalidState(msg.into())
    }

    pub fn insufficient_stock(item: impl Into<String>, available: Quantity) -> Self {
        Self::InsufficientStock {
            item: item.into(),
            available,
        }
    }

    pub fn duplicate_key(msg: impl Into<String>) -> Self {
        Self::DuplicateKey(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
