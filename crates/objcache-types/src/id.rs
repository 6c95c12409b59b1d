use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Wrap an existing UUID.
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Build from the raw 16 bytes (big-endian UUID layout).
            pub const fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(Uuid::from_bytes(bytes))
            }

            /// The nil identifier (all zeros).
            pub const fn nil() -> Self {
                Self(Uuid::nil())
            }

            /// A random (v4) identifier for tests and tooling.
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            /// Returns `true` if this is the nil identifier.
            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }

            /// The underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Parse any textual UUID form (hyphenated, simple, braced, urn).
            pub fn parse(s: &str) -> Result<Self, TypeError> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| TypeError::InvalidId {
                        input: s.to_string(),
                        reason: e.to_string(),
                    })
            }

            /// Short form (first 8 hex characters) for log lines.
            pub fn short_id(&self) -> String {
                let mut buf = Uuid::encode_buffer();
                let s = self.0.simple().encode_lower(&mut buf);
                format!("{}:{}", $label, &s[..8])
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.short_id())
            }
        }

        /// Canonical lowercase hyphenated form.
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0.hyphenated(), f)
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id!(
    /// Stable identity of a connected client session.
    AgentId,
    "agent"
);

uuid_id!(
    /// Stable identity of an in-world object, independent of any agent.
    ObjectId,
    "obj"
);

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "550e8400-e29b-41d4-a716-446655440000";

    #[test]
    fn display_is_canonical_hyphenated() {
        let id = ObjectId::parse(SAMPLE).unwrap();
        assert_eq!(id.to_string(), SAMPLE);
    }

    #[test]
    fn parse_accepts_other_forms_and_canonicalizes() {
        let upper = ObjectId::parse("550E8400-E29B-41D4-A716-446655440000").unwrap();
        let simple = ObjectId::parse("550e8400e29b41d4a716446655440000").unwrap();
        let braced = ObjectId::parse("{550e8400-e29b-41d4-a716-446655440000}").unwrap();
        assert_eq!(upper, simple);
        assert_eq!(simple, braced);
        assert_eq!(braced.to_string(), SAMPLE);
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = AgentId::parse("not-a-uuid").unwrap_err();
        assert!(matches!(err, TypeError::InvalidId { .. }));
        assert!("".parse::<AgentId>().is_err());
    }

    #[test]
    fn nil_and_random() {
        assert!(AgentId::nil().is_nil());
        let a = AgentId::random();
        let b = AgentId::random();
        assert!(!a.is_nil());
        assert_ne!(a, b);
    }

    #[test]
    fn short_id_format() {
        let id = AgentId::parse(SAMPLE).unwrap();
        assert_eq!(id.short_id(), "agent:550e8400");
        assert_eq!(format!("{id:?}"), "AgentId(agent:550e8400)");
    }

    #[test]
    fn serde_is_transparent_string() {
        let id = ObjectId::parse(SAMPLE).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{SAMPLE}\""));
        let parsed: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn bytes_roundtrip_through_uuid() {
        let id = ObjectId::from_bytes([7u8; 16]);
        let uuid: Uuid = id.into();
        assert_eq!(ObjectId::from(uuid), id);
        assert_eq!(id.as_uuid().as_bytes(), &[7u8; 16]);
    }
}
