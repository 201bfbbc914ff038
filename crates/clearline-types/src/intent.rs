use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::id::AccountId;

/// Opaque correlation values derived from an application-level key.
///
/// The 128-bit field carries a hash of the idempotency key, the 64-bit field
/// a hash of the originating subsystem tag. Both are lookup keys, never
/// business data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationKey {
    pub key_128: u128,
    pub key_64: u64,
    pub key_32: u32,
}

impl CorrelationKey {
    /// Derive correlation values from an intent id and source tag.
    pub fn from_intent(intent_id: &str, source: &str) -> Self {
        Self {
            key_128: hash_u128(b"clearline-intent-v1:", intent_id.as_bytes()),
            key_64: hash_u128(b"clearline-source-v1:", source.as_bytes()) as u64,
            key_32: 0,
        }
    }

    /// The 128-bit correlation value for a bare intent id.
    pub fn intent_hash(intent_id: &str) -> u128 {
        hash_u128(b"clearline-intent-v1:", intent_id.as_bytes())
    }
}

fn hash_u128(domain: &[u8], data: &[u8]) -> u128 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(domain);
    hasher.update(data);
    let digest = hasher.finalize();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest.as_bytes()[..16]);
    u128::from_be_bytes(bytes)
}

/// An application-level request to move money, identified by a caller-supplied
/// idempotency key.
///
/// Two submissions with the same `intent_id` and the same payload must yield
/// the same outcome; the same `intent_id` with a different payload is a
/// conflict, never a silent overwrite.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearingIntent {
    /// Caller-supplied idempotency key, unique per logical business event.
    pub intent_id: String,
    pub debit_account: AccountId,
    pub credit_account: AccountId,
    pub amount: u128,
    pub description: String,
    /// Origin subsystem tag.
    pub source: String,
    pub metadata: BTreeMap<String, String>,
}

impl ClearingIntent {
    pub fn new(
        intent_id: impl Into<String>,
        debit_account: AccountId,
        credit_account: AccountId,
        amount: u128,
        description: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            intent_id: intent_id.into(),
            debit_account,
            credit_account,
            amount,
            description: description.into(),
            source: source.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Hash of everything except the intent id, used to detect conflicting
    /// re-submissions under the same idempotency key.
    ///
    /// The encoding is canonical: struct fields serialize in declaration
    /// order and the metadata map is ordered.
    pub fn payload_hash(&self) -> [u8; 32] {
        #[derive(Serialize)]
        struct Payload<'a> {
            debit_account: &'a AccountId,
            credit_account: &'a AccountId,
            amount: u128,
            description: &'a str,
            source: &'a str,
            metadata: &'a BTreeMap<String, String>,
        }

        let payload = Payload {
            debit_account: &self.debit_account,
            credit_account: &self.credit_account,
            amount: self.amount,
            description: &self.description,
            source: &self.source,
            metadata: &self.metadata,
        };

        let encoded = serde_json::to_vec(&payload).expect("intent payload serializes");
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"clearline-payload-v1:");
        hasher.update(&encoded);
        *hasher.finalize().as_bytes()
    }

    /// Correlation values used to tag the resulting transfer.
    pub fn correlation(&self) -> CorrelationKey {
        CorrelationKey::from_intent(&self.intent_id, &self.source)
    }
}
