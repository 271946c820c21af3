//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values
/// (a `Sku`, a `DocumentNumber`, a set of contact details). To "modify" one,
/// build a new value.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
