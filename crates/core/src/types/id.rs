//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types.
//!
//! The backend is not consistent about ID representation: some modules emit
//! numeric IDs, others emit strings. Every ID deserializes from either form
//! and is stored as its string rendering.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error produced when an ID cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// The ID was an empty or whitespace-only string.
    #[error("ID must not be empty")]
    Empty,
}

/// Wire representation accepted for any ID.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
#[doc(hidden)]
pub enum RawId {
    Number(i64),
    Text(String),
}

impl TryFrom<RawId> for String {
    type Error = IdError;

    fn try_from(raw: RawId) -> Result<Self, Self::Error> {
        match raw {
            RawId::Number(n) => Ok(n.to_string()),
            RawId::Text(s) if s.trim().is_empty() => Err(IdError::Empty),
            RawId::Text(s) => Ok(s),
        }
    }
}

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize` as a plain string, `Deserialize` from a string or an integer
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_str()`
/// - `Display` and `From<&str>`/`From<String>`
///
/// # Example
///
/// ```rust
/// # use shopfront_core::define_id;
/// define_id!(WidgetId);
/// define_id!(GadgetId);
///
/// let widget = WidgetId::new("1");
/// let gadget = GadgetId::new("1");
///
/// // These are different types, so this won't compile:
/// // let _: WidgetId = gadget;
/// assert_eq!(widget.as_str(), gadget.as_str());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord
        )]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the ID as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl TryFrom<$crate::types::id::RawId> for $name {
            type Error = $crate::types::id::IdError;

            fn try_from(raw: $crate::types::id::RawId) -> Result<Self, Self::Error> {
                String::try_from(raw).map(Self)
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = <$crate::types::id::RawId as ::serde::Deserialize>::deserialize(deserializer)?;
                Self::try_from(raw).map_err(::serde::de::Error::custom)
            }
        }
    };
}

// Define standard entity IDs
define_id!(CartId);
define_id!(CartItemId);
define_id!(ProductId);
define_id!(AddressId);
define_id!(OrderId);

/// Opaque identifier for an anonymous visitor's cart.
///
/// Unlike entity IDs this is always a string and is never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuestToken(String);

impl GuestToken {
    /// Wrap a guest token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Borrow the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GuestToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_from_number() {
        let id: CartId = serde_json::from_str("42").unwrap();
        assert_eq!(id.as_str(), "42");
    }

    #[test]
    fn test_id_from_string() {
        let id: ProductId = serde_json::from_str("\"64f1c2\"").unwrap();
        assert_eq!(id, ProductId::new("64f1c2"));
    }

    #[test]
    fn test_id_rejects_empty_string() {
        let result = serde_json::from_str::<OrderId>("\"  \"");
        assert!(result.is_err());
    }

    #[test]
    fn test_id_serializes_as_string() {
        let id = AddressId::new("7");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"7\"");
    }

    #[test]
    fn test_guest_token_transparent() {
        let token: GuestToken = serde_json::from_str("\"guest-abc\"").unwrap();
        assert_eq!(token.to_string(), "guest-abc");
    }
}
