//! Content-addressed rationale store on the local filesystem
//!
//! One file per payload, named by its pointer: `<dir>/<pointer-hex>.json`.
//! Files are written to a `.tmp` sibling and renamed into place; storing the
//! same payload twice leaves the existing file alone.

use super::{AuditPointer, AuditStore};
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::PathBuf;

/// Stores each payload as `<dir>/<pointer-hex>.json`
#[derive(Debug, Clone)]
pub struct LocalAuditStore {
    dir: PathBuf,
}

impl LocalAuditStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, pointer: &AuditPointer) -> PathBuf {
        self.dir.join(format!("{}.json", pointer.to_hex()))
    }
}

#[async_trait]
impl AuditStore for LocalAuditStore {
    async fn put(&self, payload: &[u8]) -> Result<AuditPointer> {
        let pointer = AuditPointer::digest(payload);
        let path = self.path_for(&pointer);
        if tokio::fs::try_exists(&path).await? {
            return Ok(pointer);
        }
        tokio::fs::create_dir_all(&self.dir).await?;
        // Write then rename so readers never observe a partial payload
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, payload).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(pointer)
    }

    async fn get(&self, pointer: &AuditPointer) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(pointer);
        let payload = match tokio::fs::read(&path).await {
            Ok(payload) => payload,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if AuditPointer::digest(&payload) != *pointer {
            tracing::warn!(pointer = %pointer, path = %path.display(), "Stored rationale failed verification");
            return Err(Error::decode(
                format!("rationale {}", pointer),
                "stored payload does not match its pointer",
            ));
        }
        Ok(Some(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::TradeRationale;
    use crate::trade::TradeAction;
    use chrono::Utc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = LocalAuditStore::new(dir.path());

        let pointer = store.put(b"{\"reasoning\":\"breakout\"}").await.unwrap();
        let again = store.put(b"{\"reasoning\":\"breakout\"}").await.unwrap();
        assert_eq!(pointer, again);

        let payload = store.get(&pointer).await.unwrap().unwrap();
        assert_eq!(payload, b"{\"reasoning\":\"breakout\"}");
        assert!(store
            .get(&AuditPointer::new([9; 32]))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_detects_tampering() {
        let dir = TempDir::new().unwrap();
        let store = LocalAuditStore::new(dir.path());
        let pointer = store.put(b"original").await.unwrap();

        std::fs::write(store.path_for(&pointer), b"edited").unwrap();
        let err = store.get(&pointer).await.unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[tokio::test]
    async fn test_one_file_per_payload() {
        let dir = TempDir::new().unwrap();
        let store = LocalAuditStore::new(dir.path().join("rationales"));
        let first = store.put(b"first").await.unwrap();
        let second = store.put(b"second").await.unwrap();
        store.put(b"first").await.unwrap();

        let mut names: Vec<String> = std::fs::read_dir(dir.path().join("rationales"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        let mut expected = vec![format!("{}.json", first.to_hex()), format!("{}.json", second.to_hex())];
        expected.sort();
        assert_eq!(names, expected);
    }

    #[tokio::test]
    async fn test_rationale_store_and_load() {
        let dir = TempDir::new().unwrap();
        let store = LocalAuditStore::new(dir.path());
        let rationale = TradeRationale {
            agent_id: "deepseek".to_string(),
            action: TradeAction::Long,
            season_number: 1,
            reasoning: "RSI oversold on the 4h chart with rising volume".to_string(),
            confidence: 72,
            market_context: serde_json::json!({ "btc_price": "64000.5" }),
            created_at: Utc::now(),
        };
        let pointer = rationale.store(&store).await.unwrap();
        let loaded = TradeRationale::load(&store, &pointer).await.unwrap().unwrap();
        assert_eq!(loaded, rationale);
    }
}
