//! Idempotency records using Moka.
//!
//! A key is claimed atomically on first sight, then either completed with the
//! serialized response or released. Records expire after the configured TTL.

use std::time::Duration;

use async_trait::async_trait;
use moka::sync::Cache;
use sarraf_core::idempotency::{Begin, IdempotencyError, IdempotencyKey, IdempotencyStore};
use sarraf_shared::config::IdempotencyConfig;
use serde_json::Value;

/// State of one key.
#[derive(Debug, Clone)]
enum Record {
    InFlight { fingerprint: String },
    Completed { fingerprint: String, response: Value },
}

impl Record {
    fn fingerprint(&self) -> &str {
        match self {
            Self::InFlight { fingerprint } | Self::Completed { fingerprint, .. } => fingerprint,
        }
    }
}

/// In-memory idempotency store.
#[derive(Clone)]
pub struct MemoryIdempotencyStore {
    records: Cache<IdempotencyKey, Record>,
}

impl MemoryIdempotencyStore {
    /// Creates a store with the configured capacity and TTL.
    #[must_use]
    pub fn new(config: &IdempotencyConfig) -> Self {
        let records = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(Duration::from_secs(config.ttl_secs))
            .build();
        Self { records }
    }

    /// Number of live records.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.records.run_pending_tasks();
        self.records.entry_count()
    }
}

impl Default for MemoryIdempotencyStore {
    fn default() -> Self {
        Self::new(&IdempotencyConfig::default())
    }
}

#[async_trait]
impl IdempotencyStore for MemoryIdempotencyStore {
    async fn begin(&self, key: &IdempotencyKey, fingerprint: &str) -> Result<Begin, IdempotencyError> {
        let entry = self
            .records
            .entry(key.clone())
            .or_insert_with(|| Record::InFlight {
                fingerprint: fingerprint.to_string(),
            });
        if entry.is_fresh() {
            return Ok(Begin::Fresh);
        }

        let record = entry.into_value();
        if record.fingerprint() != fingerprint {
            return Err(IdempotencyError::KeyReused { key: key.key.clone() });
        }
        Ok(match record {
            Record::InFlight { .. } => Begin::InFlight,
            Record::Completed { response, .. } => Begin::Replay(response),
        })
    }

    async fn complete(&self, key: &IdempotencyKey, fingerprint: &str, response: Value) -> Result<(), IdempotencyError> {
        if let Some(existing) = self.records.get(key) {
            if existing.fingerprint() != fingerprint {
                return Err(IdempotencyError::KeyReused { key: key.key.clone() });
            }
        }
        self.records.insert(
            key.clone(),
            Record::Completed {
                fingerprint: fingerprint.to_string(),
                response,
            },
        );
        Ok(())
    }

    async fn release(&self, key: &IdempotencyKey) -> Result<(), IdempotencyError> {
        self.records.invalidate(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sarraf_shared::types::TenantId;
    use serde_json::json;

    fn key() -> IdempotencyKey {
        IdempotencyKey::post(TenantId::new(), "k-1", "/remittances/settle")
    }

    #[tokio::test]
    async fn test_claim_complete_replay() {
        let store = MemoryIdempotencyStore::default();
        let key = key();

        assert_eq!(store.begin(&key, "a:b:1").await.unwrap(), Begin::Fresh);
        assert_eq!(store.begin(&key, "a:b:1").await.unwrap(), Begin::InFlight);

        store.complete(&key, "a:b:1", json!({"id": 7})).await.unwrap();
        assert_eq!(store.begin(&key, "a:b:1").await.unwrap(), Begin::Replay(json!({"id": 7})));
    }

    #[tokio::test]
    async fn test_reuse_with_other_body_is_rejected() {
        let store = MemoryIdempotencyStore::default();
        let key = key();
        store.begin(&key, "a:b:1").await.unwrap();

        let err = store.begin(&key, "a:b:2").await.unwrap_err();
        assert!(matches!(err, IdempotencyError::KeyReused { .. }));
    }

    #[tokio::test]
    async fn test_release_allows_fresh_attempt() {
        let store = MemoryIdempotencyStore::default();
        let key = key();
        store.begin(&key, "x").await.unwrap();
        store.release(&key).await.unwrap();
        assert_eq!(store.begin(&key, "x").await.unwrap(), Begin::Fresh);
    }

    #[tokio::test]
    async fn test_keys_are_tenant_scoped() {
        let store = MemoryIdempotencyStore::default();
        let a = IdempotencyKey::post(TenantId::new(), "same", "/remittances/settle");
        let b = IdempotencyKey::post(TenantId::new(), "same", "/remittances/settle");
        assert_eq!(store.begin(&a, "x").await.unwrap(), Begin::Fresh);
        assert_eq!(store.begin(&b, "y").await.unwrap(), Begin::Fresh);
    }
}
