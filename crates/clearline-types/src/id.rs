use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;

macro_rules! ledger_id {
    ($name:ident, $prefix:literal, $doc:literal) => {
        #[doc = $doc]
        ///
        /// Identifiers are 128-bit values generated from UUIDv4, never derived
        /// from wall-clock time. Zero is reserved as the absent identifier on
        /// the wire and is never generated.
        #[derive(
            Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(u128);

        impl $name {
            /// Generate a fresh, collision-resistant identifier.
            pub fn generate() -> Self {
                loop {
                    let raw = Uuid::new_v4().as_u128();
                    if raw != 0 {
                        return Self(raw);
                    }
                }
            }

            /// Wrap a raw 128-bit value. Use [`Self::generate`] in production code.
            pub fn from_raw(raw: u128) -> Self {
                Self(raw)
            }

            /// The raw 128-bit value.
            pub fn as_u128(&self) -> u128 {
                self.0
            }

            /// Full hex-encoded string (32 hex characters).
            pub fn to_hex(&self) -> String {
                hex::encode(self.0.to_be_bytes())
            }

            /// Short identifier for logs: prefix plus the first 8 hex characters.
            pub fn short_id(&self) -> String {
                format!(concat!($prefix, ":{}"), &self.to_hex()[..8])
            }

            /// Parse from a hex string, with or without the display prefix.
            pub fn from_hex(s: &str) -> Result<Self, TypeError> {
                let s = s.strip_prefix(concat!($prefix, ":")).unwrap_or(s);
                let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
                if bytes.len() != 16 {
                    return Err(TypeError::InvalidLength {
                        expected: 16,
                        actual: bytes.len(),
                    });
                }
                let mut arr = [0u8; 16];
                arr.copy_from_slice(&bytes);
                Ok(Self(u128::from_be_bytes(arr)))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.short_id())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.short_id())
            }
        }
    };
}

ledger_id!(AccountId, "ac", "Identifier for a ledger account.");
ledger_id!(TransferId, "tr", "Identifier for a ledger transfer.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_and_nonzero() {
        let a = AccountId::generate();
        let b = AccountId::generate();
        assert_ne!(a, b);
        assert_ne!(a.as_u128(), 0);
    }

    #[test]
    fn hex_roundtrip() {
        let id = TransferId::generate();
        let parsed = TransferId::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn hex_roundtrip_with_prefix() {
        let id = AccountId::from_raw(0xDEAD_BEEF);
        let prefixed = format!("ac:{}", id.to_hex());
        assert_eq!(AccountId::from_hex(&prefixed).unwrap(), id);
    }

    #[test]
    fn rejects_wrong_length() {
        let err = AccountId::from_hex("abcd").unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 16,
                actual: 2
            }
        );
    }

    #[test]
    fn short_id_format() {
        let id = AccountId::from_raw(1);
        let short = id.short_id();
        assert!(short.starts_with("ac:"));
        assert_eq!(short.len(), 11); // "ac:" + 8 hex chars
    }

    #[test]
    fn serde_roundtrip() {
        let id = TransferId::generate();
        let json = serde_json::to_string(&id).unwrap();
        let parsed: TransferId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }
}
