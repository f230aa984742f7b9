//! Newtype IDs for type-safe document references.
//!
//! Every persisted document is keyed by a UUID. The `define_id!` macro wraps
//! the UUID in a distinct type per document kind so a product ID can never be
//! handed to an order lookup.

/// Errors that can occur when parsing an ID from user input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The input string is empty or whitespace.
    #[error("id cannot be empty")]
    Empty,
    /// The input is not a valid UUID.
    #[error("id is not a valid identifier: {0}")]
    Malformed(String),
}

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around [`uuid::Uuid`] with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - `generate()` for fresh random IDs and `parse()` for user input
/// - `Display`, `FromStr`, and `From<Uuid>` implementations
///
/// # Example
///
/// ```rust
/// # use leafline_core::define_id;
/// define_id!(InvoiceId);
/// define_id!(ShipmentId);
///
/// let invoice = InvoiceId::generate();
/// let parsed = InvoiceId::parse(&invoice.to_string()).unwrap();
/// assert_eq!(invoice, parsed);
///
/// // These are different types, so this won't compile:
/// // let _: ShipmentId = invoice;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(::uuid::Uuid);

        impl $name {
            /// Generate a new random ID.
            #[must_use]
            pub fn generate() -> Self {
                Self(::uuid::Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub const fn new(id: ::uuid::Uuid) -> Self {
                Self(id)
            }

            /// Parse an ID from user-supplied text.
            ///
            /// # Errors
            ///
            /// Returns `IdError::Empty` for blank input and `IdError::Malformed`
            /// when the text is not a UUID.
            pub fn parse(s: &str) -> ::core::result::Result<Self, $crate::IdError> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err($crate::IdError::Empty);
                }
                ::uuid::Uuid::parse_str(trimmed)
                    .map(Self)
                    .map_err(|_| $crate::IdError::Malformed(trimmed.to_owned()))
            }

            /// Get the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> ::uuid::Uuid {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::IdError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<::uuid::Uuid> for $name {
            fn from(id: ::uuid::Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for ::uuid::Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(UserId);
define_id!(EntityId);
define_id!(ProductId);
define_id!(OrderId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_unique() {
        assert_ne!(UserId::generate(), UserId::generate());
    }

    #[test]
    fn test_parse_roundtrip_through_display() {
        let id = EntityId::generate();
        let parsed: EntityId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let id = OrderId::generate();
        let padded = format!("  {id}\n");
        assert_eq!(OrderId::parse(&padded).unwrap(), id);
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(ProductId::parse("   "), Err(IdError::Empty));
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            EntityId::parse("V-ACTIVE-101"),
            Err(IdError::Malformed(s)) if s == "V-ACTIVE-101"
        ));
    }

    #[test]
    fn test_serializes_as_bare_string() {
        let id = UserId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }
}
