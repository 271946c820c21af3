//! Strongly-typed identifiers used across the domain.

pub use uuid::Uuid;

/// Declare a UUID-backed identifier newtype.
///
/// Generated identifiers use UUIDv7 (time-ordered). Prefer passing IDs
/// explicitly in tests for determinism.
///
/// ```ignore
/// shopledger_core::uuid_id!(
///     /// Item identifier.
///     ItemId, "ItemId"
/// );
/// ```
#[macro_export]
macro_rules! uuid_id {
    ($(#[$meta:meta])* $t:ident, $name:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $t($crate::id::Uuid);

        impl $t {
            pub fn new() -> Self {
                Self($crate::id::Uuid::now_v7())
            }

            pub fn from_uuid(uuid: $crate::id::Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &$crate::id::Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<$crate::id::Uuid> for $t {
            fn from(value: $crate::id::Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for $crate::id::Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl core::str::FromStr for $t {
            type Err = $crate::DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = <$crate::id::Uuid as core::str::FromStr>::from_str(s)
                    .map_err(|e| $crate::DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use core::str::FromStr;

    crate::uuid_id!(
        /// Identifier used only by these tests.
        ProbeId, "ProbeId"
    );

    #[test]
    fn parses_round_trip_through_display() {
        let id = ProbeId::new();
        let parsed = ProbeId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn rejects_malformed_input_with_type_name() {
        let err = ProbeId::from_str("not-a-uuid").unwrap_err();
        assert!(err.to_string().contains("ProbeId"));
    }
}
