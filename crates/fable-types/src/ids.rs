//! Type-safe identifier wrappers around [`String`].
//!
//! Every entity in a world definition has a strongly-typed ID to prevent
//! accidental mixing of identifiers at compile time. IDs are human-readable
//! slugs authored in world files (`"shop"`, `"npc_healer"`), so they wrap
//! `String` rather than a UUID.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around [`String`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create an identifier from any string-like value.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Return the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the inner [`String`].
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a world definition.
    WorldId
}

define_id! {
    /// Unique identifier for a location (node in the world graph).
    LocationId
}

define_id! {
    /// Unique identifier for an NPC in the world roster.
    NpcId
}

define_id! {
    /// Unique identifier for a quest (static spec and journal entry alike).
    QuestId
}

define_id! {
    /// Canonical identifier for an inventory item.
    ItemId
}

/// A validated, filesystem-safe session identifier.
///
/// Downstream storage trusts this value as a directory name, so construction
/// is fallible: only ASCII alphanumerics, `_`, and `-` are accepted, and any
/// input carrying path separators or `..` is rejected outright.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Validate and wrap a raw session id.
    pub fn parse(raw: impl Into<String>) -> Result<Self, InvalidSessionId> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(InvalidSessionId { raw });
        }
        if raw.contains("..") || raw.contains('/') || raw.contains('\\') {
            return Err(InvalidSessionId { raw });
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(InvalidSessionId { raw });
        }
        Ok(Self(raw))
    }

    /// Return the session id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for SessionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(raw).map_err(serde::de::Error::custom)
    }
}

/// Rejection of a session id that is not filesystem-safe.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid session id {raw:?}: must be non-empty [A-Za-z0-9_-] with no path components")]
pub struct InvalidSessionId {
    /// The offending input.
    pub raw: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let loc = LocationId::new("shop");
        let npc = NpcId::new("shop");
        // Same slug, different types -- the compiler enforces no mixing.
        assert_eq!(loc.as_str(), npc.as_str());
    }

    #[test]
    fn id_serde_is_transparent() {
        let id = LocationId::new("bridge");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"bridge\"");
        let back: LocationId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn session_id_accepts_safe_input() {
        assert!(SessionId::parse("20250101_120000_deadbeef").is_ok());
        assert!(SessionId::parse("abc-DEF_123").is_ok());
    }

    #[test]
    fn session_id_rejects_empty() {
        assert!(SessionId::parse("").is_err());
    }

    #[test]
    fn session_id_rejects_traversal() {
        assert!(SessionId::parse("../etc").is_err());
        assert!(SessionId::parse("a/b").is_err());
        assert!(SessionId::parse("a\\b").is_err());
        assert!(SessionId::parse("..").is_err());
    }

    #[test]
    fn session_id_rejects_other_characters() {
        assert!(SessionId::parse("a b").is_err());
        assert!(SessionId::parse("a.b").is_err());
    }
}
