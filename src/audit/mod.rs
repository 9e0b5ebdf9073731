//! Audit pointers and the verifiable rationale store
//!
//! Every trade carries a fixed 32-byte pointer to externally stored
//! reasoning and market context. The storage service itself is external;
//! [`AuditStore`] is the seam, and [`LocalAuditStore`] is a content-addressed
//! file store whose pointers are BLAKE3 digests of the stored payload.

mod local;

pub use local::LocalAuditStore;

use crate::trade::TradeAction;
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Byte length of an audit pointer
pub const AUDIT_POINTER_LEN: usize = 32;

/// Fixed-length reference to a stored rationale
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AuditPointer([u8; AUDIT_POINTER_LEN]);

impl AuditPointer {
    pub const fn new(bytes: [u8; AUDIT_POINTER_LEN]) -> Self {
        Self(bytes)
    }

    /// Exact-length conversion; never pads or truncates.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let array: [u8; AUDIT_POINTER_LEN] = bytes.try_into().map_err(|_| {
            Error::decode(
                "audit pointer",
                format!("expected {} bytes, got {}", AUDIT_POINTER_LEN, bytes.len()),
            )
        })?;
        Ok(Self(array))
    }

    /// Parse hex, with or without a `0x` prefix
    pub fn from_hex(text: &str) -> Result<Self> {
        let digits = text.trim();
        let digits = digits.strip_prefix("0x").unwrap_or(digits);
        let bytes = hex::decode(digits).map_err(|e| Error::decode("audit pointer", e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Content address of `payload`
    pub fn digest(payload: &[u8]) -> Self {
        Self(*blake3::hash(payload).as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; AUDIT_POINTER_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for AuditPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for AuditPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuditPointer({})", self.to_hex())
    }
}

impl Serialize for AuditPointer {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AuditPointer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        AuditPointer::from_hex(&text).map_err(serde::de::Error::custom)
    }
}

/// External verifiable storage for trade rationales
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Persist `payload` and return its pointer
    async fn put(&self, payload: &[u8]) -> Result<AuditPointer>;

    /// Fetch a payload; `None` if the store has never seen the pointer
    async fn get(&self, pointer: &AuditPointer) -> Result<Option<Vec<u8>>>;
}

/// Full reasoning and context behind a trade, stored off-ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRationale {
    pub agent_id: String,
    pub action: TradeAction,
    pub season_number: u64,
    /// Untruncated reasoning
    pub reasoning: String,
    pub confidence: u8,
    /// Free-form market snapshot the agent decided on
    #[serde(default)]
    pub market_context: Value,
    pub created_at: DateTime<Utc>,
}

impl TradeRationale {
    /// Serialize and store, returning the pointer to embed in the trade
    pub async fn store(&self, store: &dyn AuditStore) -> Result<AuditPointer> {
        let payload = serde_json::to_vec(self)?;
        let pointer = store.put(&payload).await?;
        tracing::debug!(
            agent = %self.agent_id,
            pointer = %pointer,
            bytes = payload.len(),
            "Stored trade rationale"
        );
        Ok(pointer)
    }

    pub async fn load(store: &dyn AuditStore, pointer: &AuditPointer) -> Result<Option<Self>> {
        match store.get(pointer).await? {
            Some(payload) => Ok(Some(serde_json::from_slice(&payload)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrong_length_fails() {
        let err = AuditPointer::from_bytes(&[0u8; 31]).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
        assert!(AuditPointer::from_bytes(&[0u8; 33]).is_err());
        assert!(AuditPointer::from_bytes(&[7u8; 32]).is_ok());
    }

    #[test]
    fn test_hex_forms() {
        let pointer = AuditPointer::new([0xab; 32]);
        let hex = pointer.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(AuditPointer::from_hex(&hex).unwrap(), pointer);
        assert_eq!(AuditPointer::from_hex(&format!("0x{}", hex)).unwrap(), pointer);
        assert!(AuditPointer::from_hex("zz").is_err());
    }

    #[test]
    fn test_serde_as_hex_string() {
        let pointer = AuditPointer::digest(b"reasoning");
        let json = serde_json::to_value(pointer).unwrap();
        assert_eq!(json, Value::String(pointer.to_hex()));
        let back: AuditPointer = serde_json::from_value(json).unwrap();
        assert_eq!(back, pointer);
    }
}
