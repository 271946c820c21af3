//! Identity for stored records that are not order state machines.

/// Anything persisted under a stable id: items, alerts, parties, payables.
///
/// Two values with the same id are the same record, whatever their fields.
pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    fn id(&self) -> &Self::Id;
}
